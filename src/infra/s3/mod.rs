//! S3-backed [`crate::services::snapshot_store::SnapshotStore`].
//!
//! Every row is one JSON object at `{table}/{key}.json`.

mod store;

pub use store::S3Store;
