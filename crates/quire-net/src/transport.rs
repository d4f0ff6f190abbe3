//! Transport abstraction for talking to other nodes.
//!
//! Two things cross the wire: identity documents (fetched with a GET on an
//! [`IdentityUri`]) and accepted instances (pushed to a peer's instance
//! endpoint). Implementations may use HTTP or anything else.

use std::fmt;

use async_trait::async_trait;
use quire_core::IdentityUri;
use serde_json::Value;

use crate::error::Result;

/// A peer node, addressed by hostname.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerAddr(String);

impl PeerAddr {
    pub fn new(hostname: impl Into<String>) -> Self {
        Self(hostname.into())
    }

    pub fn hostname(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeerAddr {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Fetches raw identity documents.
///
/// Validation of the document is the caller's job; this only moves bytes.
#[async_trait]
pub trait IdentityFetcher: Send + Sync {
    async fn fetch_identity(&self, uri: &IdentityUri) -> Result<Value>;
}

/// Delivers an accepted instance document to one peer.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    async fn deliver(&self, peer: &PeerAddr, document: &Value) -> Result<()>;
}

/// The set of peers to push accepted instances to.
#[async_trait]
pub trait PeerDirectory: Send + Sync {
    async fn peers(&self) -> Result<Vec<PeerAddr>>;
}

/// A simple in-memory network for testing.
///
/// Hosts register an identity document and receive pushed instances on an
/// mpsc channel, which the owner of the receiver drains.
pub mod memory {
    use super::*;
    use crate::error::NetError;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::{mpsc, RwLock};

    /// Inbox capacity per host.
    const INBOX_CAPACITY: usize = 1000;

    /// A document pushed to a host, tagged with the sender.
    #[derive(Debug, Clone)]
    pub struct Delivery {
        pub from: String,
        pub document: Value,
    }

    struct Host {
        /// Identity documents served by this host, keyed by id.
        identities: HashMap<String, Value>,
        /// Id of the host's own identity, served at the bare host URI.
        self_id: Option<String>,
        inbox: mpsc::Sender<Delivery>,
        reachable: bool,
    }

    /// Shared state for the memory network.
    #[derive(Default)]
    pub struct MemoryNetwork {
        hosts: RwLock<HashMap<String, Host>>,
        fetches: AtomicUsize,
        deliveries: AtomicUsize,
    }

    impl MemoryNetwork {
        /// Create a new memory network.
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        /// Register a host and get the receiving end of its inbox.
        ///
        /// Registering an existing hostname replaces it.
        pub async fn register_host(&self, hostname: &str) -> mpsc::Receiver<Delivery> {
            let (tx, rx) = mpsc::channel(INBOX_CAPACITY);
            self.hosts.write().await.insert(
                hostname.to_string(),
                Host {
                    identities: HashMap::new(),
                    self_id: None,
                    inbox: tx,
                    reachable: true,
                },
            );
            rx
        }

        /// Serve an identity document from `hostname`.
        ///
        /// The first document published becomes the host's self document
        /// unless `as_self` is set on a later one.
        pub async fn publish_identity(&self, hostname: &str, document: Value, as_self: bool) {
            let mut hosts = self.hosts.write().await;
            if let Some(host) = hosts.get_mut(hostname) {
                let id = document
                    .get("id")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                if as_self || host.self_id.is_none() {
                    host.self_id = Some(id.clone());
                }
                host.identities.insert(id, document);
            }
        }

        /// Take a host off the network (or bring it back).
        pub async fn set_reachable(&self, hostname: &str, reachable: bool) {
            if let Some(host) = self.hosts.write().await.get_mut(hostname) {
                host.reachable = reachable;
            }
        }

        /// Create a transport that sends as `hostname`.
        pub fn transport(self: &Arc<Self>, hostname: &str) -> MemoryTransport {
            MemoryTransport {
                local: hostname.to_string(),
                network: Arc::clone(self),
            }
        }

        /// Number of identity fetches served so far.
        pub fn fetch_count(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }

        /// Number of successful pushes so far.
        pub fn delivery_count(&self) -> usize {
            self.deliveries.load(Ordering::SeqCst)
        }
    }

    /// In-memory transport implementation.
    #[derive(Clone)]
    pub struct MemoryTransport {
        local: String,
        network: Arc<MemoryNetwork>,
    }

    impl MemoryTransport {
        pub fn local_host(&self) -> &str {
            &self.local
        }
    }

    #[async_trait]
    impl IdentityFetcher for MemoryTransport {
        async fn fetch_identity(&self, uri: &IdentityUri) -> Result<Value> {
            self.network.fetches.fetch_add(1, Ordering::SeqCst);

            let hosts = self.network.hosts.read().await;
            let host = hosts
                .get(&uri.hostname)
                .filter(|h| h.reachable)
                .ok_or_else(|| NetError::Unreachable(uri.hostname.clone()))?;

            let id = match &uri.id {
                Some(id) => Some(id.as_str()),
                None => host.self_id.as_deref(),
            };
            id.and_then(|id| host.identities.get(id))
                .cloned()
                .ok_or_else(|| NetError::Status {
                    status: 404,
                    url: uri.to_string(),
                })
        }
    }

    #[async_trait]
    impl PeerTransport for MemoryTransport {
        async fn deliver(&self, peer: &PeerAddr, document: &Value) -> Result<()> {
            let inbox = {
                let hosts = self.network.hosts.read().await;
                let host = hosts
                    .get(peer.hostname())
                    .filter(|h| h.reachable)
                    .ok_or_else(|| NetError::Unreachable(peer.to_string()))?;
                host.inbox.clone()
            };

            inbox
                .send(Delivery {
                    from: self.local.clone(),
                    document: document.clone(),
                })
                .await
                .map_err(|_| NetError::Transport("peer inbox closed".into()))?;
            self.network.deliveries.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }
}
