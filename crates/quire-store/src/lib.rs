//! # Quire Store
//!
//! Storage abstraction for Quire. Provides a trait-based interface for
//! document persistence with SQLite and in-memory implementations.
//!
//! ## Overview
//!
//! A node keeps three collections of JSON documents: `identities`,
//! `instances` and `settings`. The [`ObjectStore`] trait exposes exactly what
//! the node needs from them: upsert by id, get by id, and simple equality
//! queries.
//!
//! ## Key Types
//!
//! - [`ObjectStore`] - The async trait for all storage operations
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`Collection`] - Which collection a document lives in
//! - [`Filter`] - All-match equality filter
//!
//! ## Usage
//!
//! ```rust,no_run
//! use quire_store::{Collection, Filter, ObjectStore, SqliteStore};
//!
//! async fn example() {
//!     let store = SqliteStore::open("node.db").unwrap();
//!
//!     let doc = serde_json::json!({"id": "1", "owner": "o"});
//!     store.upsert(Collection::Instances, "1", &doc).await.unwrap();
//!
//!     let owned = store
//!         .find(Collection::Instances, &Filter::eq("owner", "o"))
//!         .await
//!         .unwrap();
//!     assert_eq!(owned.len(), 1);
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Upsert semantics**: the last write for an id wins; documents are
//!   replaced, never merged
//! - **No ordering across ids**: concurrent writers to different ids never
//!   block each other beyond the backend's own locking

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{Collection, Filter, ObjectStore, StoreExt};
