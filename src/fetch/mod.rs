//! HTTP access for every network source: static feed archives, realtime
//! feeds and the Overpass geometry service.

mod basic;
mod client;
#[cfg(test)]
pub(crate) mod mock;
pub mod retry;

pub use basic::BasicClient;
pub use client::HttpClient;
pub use retry::{FetchRetryError, RetryOptions, fetch_with_retry};

use bytes::Bytes;

/// GETs `url` through [`fetch_with_retry`] and returns the full body.
pub async fn fetch_bytes<C: HttpClient + ?Sized>(
    client: &C,
    url: &str,
    options: &RetryOptions,
) -> Result<Bytes, FetchRetryError> {
    let url = url
        .parse()
        .map_err(|e| FetchRetryError::InvalidRequest(format!("invalid URL {url}: {e}")))?;
    let req = reqwest::Request::new(reqwest::Method::GET, url);

    let resp = fetch_with_retry(client, req, options).await?;
    Ok(resp.bytes().await?)
}
