//! # Quire
//!
//! A node in a federation of independent hosts that publish signed
//! content objects ("instances") and accept each other's.
//!
//! ## Overview
//!
//! Every instance names its owner and the owner's host, and carries an
//! Ed25519 signature by the owner over the instance's canonical bytes. A
//! receiving node does not trust the transport: it resolves the owner's
//! identity from the owner's host and checks the signature itself.
//!
//! - **Local submissions** (an authenticated session on this node) are
//!   stamped with the node's own identity and signed with its key.
//! - **Remote submissions** (peer pushes, anonymous callers) are accepted
//!   only if the signature verifies against the resolved owner key, and
//!   never if they claim to be owned by this node.
//! - **Accepted instances** are stored, then broadcast to local subscribers
//!   and pushed to known peers.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use quire::{Network, Node, NodeConfig, Session};
//! use quire::core::Profile;
//! use quire::store::SqliteStore;
//!
//! async fn example() {
//!     let store = Arc::new(SqliteStore::open("node.db").unwrap());
//!     Node::bootstrap(Arc::clone(&store), "a.example", Profile::default())
//!         .await
//!         .unwrap();
//!
//!     let config = NodeConfig::default();
//!     let network = Network::http(&config).unwrap();
//!     let node = Node::open(store, network, config).await.unwrap();
//!
//!     let submission = node
//!         .submit(br#"{"text":"hello"}"#, Session::AuthenticatedLocal)
//!         .await
//!         .unwrap();
//!     println!("stored {}", submission.instance.id);
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `quire::core` - identities, payloads, canonical encoding, signatures
//! - `quire::store` - storage abstraction, SQLite and in-memory backends
//! - `quire::net` - transports and dissemination

pub mod config;
pub mod context;
pub mod directory;
pub mod error;
pub mod gate;
pub mod node;
pub mod resolver;

// Re-export component crates
pub use quire_core as core;
pub use quire_net as net;
pub use quire_store as store;

pub use config::NodeConfig;
pub use context::NodeContext;
pub use directory::IdentityDirectory;
pub use error::{NodeError, Result, TrustDecision};
pub use gate::{Admission, OwnershipGate, Session};
pub use node::{Network, Node, Submission};
pub use resolver::{IdentityResolver, Resolved};

pub use quire_core::{Identity, IdentityId, IdentityUri, Instance, InstanceId, Payload, Profile};
