//! # Quire Testkit
//!
//! Testing utilities for Quire.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: payloads with their exact canonical bytes
//! - **Generators**: Proptest strategies for payloads, identities and JSON
//! - **Fixtures**: in-memory federations of real nodes, and hand signers
//!
//! ## Golden Vectors
//!
//! ```rust
//! use quire_testkit::vectors::verify_all_vectors;
//!
//! for (name, matches, hex) in verify_all_vectors() {
//!     assert!(matches, "{name}: {hex}");
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use quire_testkit::generators::payload;
//!
//! proptest! {
//!     #[test]
//!     fn canonical_is_deterministic(p in payload()) {
//!         prop_assert_eq!(quire_core::canonicalize(&p), quire_core::canonicalize(&p));
//!     }
//! }
//! ```
//!
//! ## Federations
//!
//! ```rust,no_run
//! use quire::Session;
//! use quire_testkit::TestFederation;
//!
//! async fn example() -> anyhow::Result<()> {
//!     let mut federation = TestFederation::new();
//!     let a = federation.add_node("a.example").await?;
//!     federation.add_node("b.example").await?;
//!     federation.connect_all().await?;
//!
//!     a.submit(br#"{"text":"hi"}"#, Session::AuthenticatedLocal).await?;
//!     Ok(())
//! }
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{init_tracing, test_config, MemoryNode, TestFederation, TestSigner};
