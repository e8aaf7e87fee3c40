//! Traits for the external systems a sampling run talks to.
//!
//! Implementations live in [`crate::infra`].

pub mod bike_api;
pub mod snapshot_store;
pub mod station_api;
