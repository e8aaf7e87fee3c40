//! Snapshot reduction and collection.
//!
//! A sampling run reads one provider, reduces the response into records
//! keyed by the run's [`crate::bucket::BucketKey`], and upserts them.

pub mod grid;
pub mod runner;
pub mod stations;
pub mod types;
