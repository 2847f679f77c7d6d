//! Scripted [`HttpClient`] for tests that never touch the network.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::{Method, Request, Response};

use super::client::HttpClient;

/// One scripted reply.
pub(crate) enum Step {
    Status(u16, Vec<u8>),
    Transport,
    Hang,
}

impl Step {
    pub(crate) fn ok(body: impl Into<Vec<u8>>) -> Self {
        Step::Status(200, body.into())
    }

    pub(crate) fn status(code: u16) -> Self {
        Step::Status(code, Vec::new())
    }
}

/// A request as seen by the mock: method, URL, body and content type.
pub(crate) type Recorded = (Method, String, Option<Vec<u8>>, Option<String>);

/// Replies from per-URL scripts, falling back to a `*` script. An exhausted
/// script answers with a transport error.
pub(crate) struct MockClient {
    scripts: Mutex<HashMap<String, VecDeque<Step>>>,
    requests: Mutex<Vec<Recorded>>,
}

impl MockClient {
    pub(crate) fn new(steps: Vec<Step>) -> Self {
        Self::by_url(vec![("*", steps)])
    }

    pub(crate) fn by_url(scripts: Vec<(&str, Vec<Step>)>) -> Self {
        let scripts = scripts
            .into_iter()
            .map(|(url, steps)| (url.to_string(), steps.into_iter().collect()))
            .collect();
        Self {
            scripts: Mutex::new(scripts),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub(crate) fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    fn next_step(&self, url: &str) -> Option<Step> {
        let mut scripts = self.scripts.lock().unwrap();
        if let Some(steps) = scripts.get_mut(url) {
            return steps.pop_front();
        }
        scripts.get_mut("*").and_then(|steps| steps.pop_front())
    }
}

/// A genuine `reqwest::Error` built without any I/O.
pub(crate) fn transport_error() -> reqwest::Error {
    let resp = http::Response::builder()
        .status(500)
        .body(Vec::<u8>::new())
        .unwrap();
    Response::from(resp).error_for_status().unwrap_err()
}

#[async_trait]
impl HttpClient for MockClient {
    async fn execute(&self, req: Request) -> reqwest::Result<Response> {
        let url = req.url().to_string();
        let body = req.body().and_then(|b| b.as_bytes()).map(|b| b.to_vec());
        let content_type = req
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        self.requests
            .lock()
            .unwrap()
            .push((req.method().clone(), url.clone(), body, content_type));

        match self.next_step(&url) {
            Some(Step::Status(code, body)) => {
                let resp = http::Response::builder().status(code).body(body).unwrap();
                Ok(Response::from(resp))
            }
            Some(Step::Hang) => futures::future::pending().await,
            Some(Step::Transport) | None => Err(transport_error()),
        }
    }
}
