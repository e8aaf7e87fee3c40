//! Trait for the key-value store snapshots are written to.

use anyhow::Result;
use serde_json::{Map, Value};

use crate::scan::Page;

/// A stored row: attribute name to value.
pub type Item = Map<String, Value>;

/// Upsert-by-key persistence with paged listing.
///
/// Each key is replaced atomically; there is no transaction across keys.
#[async_trait::async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Inserts or fully replaces the row at `key`, returning it as stored.
    async fn upsert(&self, table: &str, key: &str, item: Item) -> Result<Item>;

    /// Reads one capped page of `table`, starting after `token`.
    async fn scan_page(&self, table: &str, token: Option<String>) -> Result<Page<Item>>;

    async fn get(&self, table: &str, key: &str) -> Result<Option<Item>>;
}
