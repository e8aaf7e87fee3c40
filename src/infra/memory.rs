//! In-process [`SnapshotStore`], used for dry runs and tests.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use tokio::sync::RwLock;

use crate::scan::Page;
use crate::services::snapshot_store::{Item, SnapshotStore};

pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Tables kept in key order. Scans return at most `page_size` rows per
/// page; the continuation token is the last key of the page.
pub struct MemoryStore {
    tables: RwLock<HashMap<String, BTreeMap<String, Item>>>,
    page_size: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            page_size: page_size.max(1),
        }
    }

    pub async fn len(&self, table: &str) -> usize {
        self.tables
            .read()
            .await
            .get(table)
            .map_or(0, BTreeMap::len)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn upsert(&self, table: &str, key: &str, item: Item) -> Result<Item> {
        self.tables
            .write()
            .await
            .entry(table.to_string())
            .or_default()
            .insert(key.to_string(), item.clone());
        Ok(item)
    }

    async fn scan_page(&self, table: &str, token: Option<String>) -> Result<Page<Item>> {
        let tables = self.tables.read().await;
        let Some(rows) = tables.get(table) else {
            return Ok(Page::last(Vec::new()));
        };

        let start = match token.as_deref() {
            Some(after) => Bound::Excluded(after),
            None => Bound::Unbounded,
        };
        let mut page: Vec<(&String, &Item)> = rows
            .range::<str, _>((start, Bound::Unbounded))
            .take(self.page_size + 1)
            .collect();

        let next_token = if page.len() > self.page_size {
            page.truncate(self.page_size);
            page.last().map(|(key, _)| (*key).clone())
        } else {
            None
        };

        Ok(Page {
            items: page.into_iter().map(|(_, item)| item.clone()).collect(),
            next_token,
        })
    }

    async fn get(&self, table: &str, key: &str) -> Result<Option<Item>> {
        Ok(self
            .tables
            .read()
            .await
            .get(table)
            .and_then(|rows| rows.get(key))
            .cloned())
    }
}
