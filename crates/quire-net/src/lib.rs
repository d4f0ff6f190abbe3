//! # Quire Net
//!
//! Everything a node needs from other nodes: fetching identity documents,
//! pushing accepted instances, and fanning them out to local subscribers.
//!
//! ## Overview
//!
//! The node never talks to the network directly. It goes through three
//! traits, so tests can swap HTTP for an in-process network:
//!
//! - [`IdentityFetcher`] - GET an identity document by URI
//! - [`PeerTransport`] - POST an instance document to a peer
//! - [`PeerDirectory`] - which peers to push to
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use quire_net::{Disseminator, HttpTransport, StaticPeers};
//!
//! fn example() {
//!     let http = HttpTransport::new("https", Duration::from_secs(10)).unwrap();
//!     let peers = StaticPeers::new(["b.example", "c.example"]);
//!     let disseminator = Disseminator::new(Arc::new(http), Arc::new(peers), "a.example", 256);
//!     let _rx = disseminator.subscribe();
//! }
//! ```
//!
//! ## Delivery Guarantees
//!
//! None beyond best effort. A push that fails is reported and logged; there
//! is no retry queue and no acknowledgement beyond the peer's HTTP status.

pub mod dissemination;
pub mod error;
pub mod http;
pub mod peers;
pub mod transport;

pub use dissemination::{Disseminator, PushReport, DEFAULT_BROADCAST_CAPACITY};
pub use error::{NetError, Result};
pub use http::HttpTransport;
pub use peers::StaticPeers;
pub use transport::{
    memory::{Delivery, MemoryNetwork, MemoryTransport},
    IdentityFetcher, PeerAddr, PeerDirectory, PeerTransport,
};
