use async_trait::async_trait;
use reqwest::{Request, Response};

/// Executes a single HTTP request. Retries, timeouts and status handling
/// live above this seam in [`super::fetch_with_retry`].
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}
