//! Test fixtures and helpers.
//!
//! A [`TestFederation`] is a set of nodes wired together over a
//! [`MemoryNetwork`]. Each node gets a memory store, a bootstrapped self
//! identity published on the network, and a background task that feeds
//! pushed instances back into [`Node::submit_payload`] the way an HTTP
//! handler would.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context};
use quire::{Network, Node, NodeConfig, Session};
use quire_core::{
    canonicalize, signing, Identity, IdentityUri, InstanceId, Keypair, Payload, Profile,
};
use quire_net::MemoryNetwork;
use quire_store::MemoryStore;
use serde_json::Value;
use tokio::task::JoinHandle;

/// A node backed by memory storage.
pub type MemoryNode = Node<MemoryStore>;

/// Install a `fmt` subscriber writing to the test harness. Safe to call
/// from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Config used by federation nodes.
pub fn test_config() -> NodeConfig {
    NodeConfig {
        scheme: "http".to_string(),
        ..NodeConfig::default()
    }
}

/// One member of a federation.
pub struct TestNode {
    pub node: Arc<MemoryNode>,
    pub store: Arc<MemoryStore>,
    server: JoinHandle<()>,
}

impl Drop for TestNode {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// Several nodes on one in-memory network.
pub struct TestFederation {
    pub network: Arc<MemoryNetwork>,
    nodes: BTreeMap<String, TestNode>,
}

impl TestFederation {
    pub fn new() -> Self {
        Self {
            network: MemoryNetwork::new(),
            nodes: BTreeMap::new(),
        }
    }

    /// Bootstrap and open a node at `hostname` with the default test config.
    pub async fn add_node(&mut self, hostname: &str) -> anyhow::Result<Arc<MemoryNode>> {
        self.add_node_with(hostname, test_config()).await
    }

    /// Bootstrap and open a node at `hostname`.
    pub async fn add_node_with(
        &mut self,
        hostname: &str,
        config: NodeConfig,
    ) -> anyhow::Result<Arc<MemoryNode>> {
        let mut inbox = self.network.register_host(hostname).await;

        let store = Arc::new(MemoryStore::new());
        let identity = Node::bootstrap(Arc::clone(&store), hostname, Profile::default())
            .await
            .with_context(|| format!("bootstrapping {hostname}"))?;
        self.network
            .publish_identity(hostname, identity.to_document(), true)
            .await;

        let network = Network::from_transport(self.network.transport(hostname));
        let node = Arc::new(Node::open(Arc::clone(&store), network, config).await?);

        let server_node = Arc::clone(&node);
        let server = tokio::spawn(async move {
            while let Some(delivery) = inbox.recv().await {
                let payload = match Payload::from_value(delivery.document) {
                    Ok(payload) => payload,
                    Err(_) => continue,
                };
                // Rejections are logged by the node itself.
                let _ = server_node
                    .submit_payload(payload, Session::Anonymous)
                    .await;
            }
        });

        self.nodes.insert(
            hostname.to_string(),
            TestNode {
                node: Arc::clone(&node),
                store,
                server,
            },
        );
        Ok(node)
    }

    pub fn node(&self, hostname: &str) -> anyhow::Result<Arc<MemoryNode>> {
        self.nodes
            .get(hostname)
            .map(|n| Arc::clone(&n.node))
            .ok_or_else(|| anyhow!("no node at {hostname}"))
    }

    pub fn store(&self, hostname: &str) -> anyhow::Result<Arc<MemoryStore>> {
        self.nodes
            .get(hostname)
            .map(|n| Arc::clone(&n.store))
            .ok_or_else(|| anyhow!("no node at {hostname}"))
    }

    /// Make `from` know about `to`, so it pushes to it.
    pub async fn introduce(&self, from: &str, to: &str) -> anyhow::Result<Identity> {
        let uri = IdentityUri::new("http", to, None);
        Ok(self.node(from)?.resolve_and_upsert_identity(&uri).await?)
    }

    /// Introduce every pair of nodes to each other.
    pub async fn connect_all(&self) -> anyhow::Result<()> {
        let hosts: Vec<String> = self.nodes.keys().cloned().collect();
        for from in &hosts {
            for to in &hosts {
                if from != to {
                    self.introduce(from, to).await?;
                }
            }
        }
        Ok(())
    }

    /// Wait until `hostname` has stored instance `id`.
    pub async fn wait_for_instance(
        &self,
        hostname: &str,
        id: &InstanceId,
        timeout: Duration,
    ) -> anyhow::Result<()> {
        let node = self.node(hostname)?;
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if node.get_instance(id.as_str()).await?.is_some() {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(anyhow!("{hostname} never stored {id}"));
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

impl Default for TestFederation {
    fn default() -> Self {
        Self::new()
    }
}

/// An identity that is not a node, for signing payloads by hand.
pub struct TestSigner {
    pub identity: Identity,
}

impl TestSigner {
    pub fn new(hostname: &str) -> Self {
        Self {
            identity: Identity::generate(hostname, Profile::default()),
        }
    }

    /// Deterministic key, random id.
    pub fn with_seed(hostname: &str, seed: [u8; 32]) -> Self {
        Self {
            identity: Identity::local(
                quire_core::IdentityId::generate(),
                hostname,
                Profile::default(),
                Keypair::from_seed(&seed),
            ),
        }
    }

    /// Stamp `content` with this identity and sign it.
    pub fn sign(&self, content: Value) -> anyhow::Result<Payload> {
        let mut payload = Payload::from_value(content)?;
        let id = payload.id().unwrap_or_else(InstanceId::generate);
        payload.stamp(&id, &self.identity.id, &self.identity.hostname);
        let signature = signing::sign(&canonicalize(&payload), &self.identity)?;
        payload.set_signature(&signature);
        Ok(payload)
    }

    /// Publish this identity on a network so nodes can resolve it.
    pub async fn publish(&self, network: &MemoryNetwork) {
        let _ = network.register_host(&self.identity.hostname).await;
        network
            .publish_identity(&self.identity.hostname, self.identity.to_document(), true)
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_federation_nodes_are_bootstrapped() {
        let mut federation = TestFederation::new();
        let a = federation.add_node("a.example").await.unwrap();
        let b = federation.add_node("b.example").await.unwrap();

        assert_eq!(a.get_self().hostname, "a.example");
        assert_ne!(a.get_self().id, b.get_self().id);
        assert!(federation.node("c.example").is_err());
    }

    #[tokio::test]
    async fn test_introduce_stores_identity() {
        let mut federation = TestFederation::new();
        federation.add_node("a.example").await.unwrap();
        let b = federation.add_node("b.example").await.unwrap();

        let learned = federation.introduce("a.example", "b.example").await.unwrap();
        assert_eq!(learned, b.get_self());

        let known = federation
            .node("a.example")
            .unwrap()
            .list_identities()
            .await
            .unwrap();
        assert_eq!(known.len(), 2);
    }

    #[test]
    fn test_signer_output_verifies() {
        let signer = TestSigner::with_seed("s.example", [7; 32]);
        let payload = signer.sign(json!({"text": "x"})).unwrap();

        assert_eq!(payload.owner(), Some(signer.identity.id.clone()));
        assert!(signing::verify(
            &canonicalize(&payload),
            payload.signature().unwrap(),
            &signer.identity.to_public(),
        )
        .unwrap());
    }
}
