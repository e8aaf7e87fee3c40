//! HTTP transport used by the provider clients.
//!
//! [`HttpClient`] is the seam: [`BasicClient`] talks to the network, and
//! decorators such as [`auth::UrlParam`] and [`ConcurrencyLimit`] wrap any
//! other client.

mod basic;
mod client;
mod limit;
pub mod auth;

#[cfg(test)]
pub(crate) mod stub;

pub use basic::BasicClient;
pub use client::HttpClient;
pub use limit::ConcurrencyLimit;

use anyhow::Result;

/// GETs `url` and returns the body.
///
/// # Errors
///
/// Fails on an invalid URL, a transport error, or a non-success status.
pub async fn fetch_bytes<C: HttpClient + ?Sized>(client: &C, url: &str) -> Result<Vec<u8>> {
    let req = reqwest::Request::new(reqwest::Method::GET, url.parse()?);

    let resp = client.execute(req).await?.error_for_status()?;
    Ok(resp.bytes().await?.to_vec())
}
