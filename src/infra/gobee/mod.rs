//! Gobee free-floating bike API.

mod client;

pub use client::GobeeClient;

/// Provider tag stored on every bike record.
pub const PROVIDER: &str = "gobee";
