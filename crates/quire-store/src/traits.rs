//! ObjectStore trait: the abstract interface for document persistence.
//!
//! This trait allows the node to be storage-agnostic. Implementations
//! include SQLite (primary) and in-memory (for tests).

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// The collections a node keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    /// Identity documents: self plus every resolved remote identity.
    Identities,
    /// Accepted instance payloads.
    Instances,
    /// Node settings (hostname, self id, signing seed).
    Settings,
}

impl Collection {
    pub const ALL: [Collection; 3] = [
        Collection::Identities,
        Collection::Instances,
        Collection::Settings,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Collection::Identities => "identities",
            Collection::Instances => "instances",
            Collection::Settings => "settings",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An all-match equality filter over top-level document fields.
///
/// The empty filter matches every document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<(String, Value)>,
}

impl Filter {
    /// Match every document.
    pub fn all() -> Self {
        Self::default()
    }

    /// Match documents whose `field` equals `value`.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::all().and(field, value)
    }

    /// Add another equality condition.
    pub fn and(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push((field.into(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Check a document against every condition.
    pub fn matches(&self, doc: &Value) -> bool {
        self.conditions
            .iter()
            .all(|(field, expected)| doc.get(field) == Some(expected))
    }
}

/// The ObjectStore trait: async interface for document persistence.
///
/// # Design Notes
///
/// - **Upsert by id**: writing an existing id replaces the document
///   (last write wins, no merge).
/// - **Insertion order**: `find` returns documents in ascending id order.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Insert or replace the document stored under `id`.
    async fn upsert(&self, collection: Collection, id: &str, value: &Value) -> Result<()>;

    /// Get a single document by id.
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Value>>;

    /// Find every document matching the filter.
    async fn find(&self, collection: Collection, filter: &Filter) -> Result<Vec<Value>>;

    /// Count documents in a collection.
    async fn count(&self, collection: Collection) -> Result<usize> {
        Ok(self.find(collection, &Filter::all()).await?.len())
    }
}

#[async_trait]
impl<S: ObjectStore + ?Sized> ObjectStore for Arc<S> {
    async fn upsert(&self, collection: Collection, id: &str, value: &Value) -> Result<()> {
        (**self).upsert(collection, id, value).await
    }

    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Value>> {
        (**self).get(collection, id).await
    }

    async fn find(&self, collection: Collection, filter: &Filter) -> Result<Vec<Value>> {
        (**self).find(collection, filter).await
    }

    async fn count(&self, collection: Collection) -> Result<usize> {
        (**self).count(collection).await
    }
}

/// Extension trait for common store patterns.
#[async_trait]
pub trait StoreExt: ObjectStore {
    /// First document matching the filter, if any.
    async fn find_one(&self, collection: Collection, filter: &Filter) -> Result<Option<Value>> {
        Ok(self.find(collection, filter).await?.into_iter().next())
    }

    /// Read a string setting stored as `{"value": "..."}`.
    async fn get_setting(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .get(Collection::Settings, key)
            .await?
            .and_then(|doc| doc.get("value").and_then(Value::as_str).map(String::from)))
    }

    /// Write a string setting as `{"key": key, "value": value}`.
    async fn put_setting(&self, key: &str, value: &str) -> Result<()> {
        let doc = serde_json::json!({ "key": key, "value": value });
        self.upsert(Collection::Settings, key, &doc).await
    }
}

impl<S: ObjectStore + ?Sized> StoreExt for S {}
