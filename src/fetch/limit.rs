use super::client::HttpClient;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// An [`HttpClient`] wrapper that caps how many requests are in flight.
///
/// Callers may fire any number of requests at once; the excess waits for a
/// permit before reaching `inner`.
pub struct ConcurrencyLimit<C> {
    inner: C,
    permits: Arc<Semaphore>,
}

impl<C> ConcurrencyLimit<C> {
    pub fn new(inner: C, max_in_flight: usize) -> Self {
        Self {
            inner,
            permits: Arc::new(Semaphore::new(max_in_flight.max(1))),
        }
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for ConcurrencyLimit<C> {
    async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        // The semaphore is never closed, so acquiring only waits.
        let _permit = self.permits.acquire().await.ok();
        self.inner.execute(req).await
    }
}
