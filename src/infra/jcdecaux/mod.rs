//! JCDecaux VLS open-data API (docked station networks such as Vélib').

mod client;

pub use client::JcDecauxClient;

/// Query parameter the API expects the key in.
pub const API_KEY_PARAM: &str = "apiKey";
