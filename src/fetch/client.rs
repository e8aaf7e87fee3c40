use async_trait::async_trait;
use reqwest::{Request, Response};
use std::sync::Arc;

/// Sends one prepared request. Decorators wrap another `HttpClient`.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}

/// Lets several provider clients share one transport and its limits.
#[async_trait]
impl<C: HttpClient + ?Sized> HttpClient for Arc<C> {
    async fn execute(&self, req: Request) -> reqwest::Result<Response> {
        (**self).execute(req).await
    }
}
