//! Peer directory derived from the identities a node knows about.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use quire_net::{NetError, PeerAddr, PeerDirectory};
use quire_store::{Collection, Filter, ObjectStore};
use serde_json::Value;

/// Every distinct hostname in the `identities` collection is a peer.
///
/// Resolving a remote owner stores its identity, so a node starts pushing
/// to a peer once it has accepted something from it or added it by hand.
pub struct IdentityDirectory<S: ObjectStore> {
    store: Arc<S>,
}

impl<S: ObjectStore> IdentityDirectory<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S: ObjectStore> PeerDirectory for IdentityDirectory<S> {
    async fn peers(&self) -> quire_net::Result<Vec<PeerAddr>> {
        let docs = self
            .store
            .find(Collection::Identities, &Filter::all())
            .await
            .map_err(|e| NetError::Directory(e.to_string()))?;

        let hosts: BTreeSet<&str> = docs
            .iter()
            .filter_map(|doc| doc.get("hostname").and_then(Value::as_str))
            .collect();
        Ok(hosts.into_iter().map(PeerAddr::new).collect())
    }
}
