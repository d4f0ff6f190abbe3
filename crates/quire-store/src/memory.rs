//! In-memory implementation of the ObjectStore trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::traits::{Collection, Filter, ObjectStore};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<HashMap<Collection, BTreeMap<String, Value>>>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn upsert(&self, collection: Collection, id: &str, value: &Value) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner
            .entry(collection)
            .or_default()
            .insert(id.to_string(), value.clone());
        Ok(())
    }

    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Value>> {
        let inner = self.inner.read().await;
        Ok(inner.get(&collection).and_then(|docs| docs.get(id)).cloned())
    }

    async fn find(&self, collection: Collection, filter: &Filter) -> Result<Vec<Value>> {
        let inner = self.inner.read().await;
        Ok(inner
            .get(&collection)
            .map(|docs| {
                docs.values()
                    .filter(|doc| filter.matches(doc))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn count(&self, collection: Collection) -> Result<usize> {
        let inner = self.inner.read().await;
        Ok(inner.get(&collection).map_or(0, BTreeMap::len))
    }
}
