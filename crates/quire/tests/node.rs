//! Single-node behaviour: bootstrap, persistence, settings, failure paths.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use quire::context::setting;
use quire::{Network, Node, NodeConfig, NodeError, Session};
use quire_core::{IdentityUri, Profile};
use quire_net::{MemoryNetwork, StaticPeers};
use quire_store::{
    Collection, Filter, MemoryStore, ObjectStore, SqliteStore, StoreError, StoreExt,
};
use quire_testkit::{init_tracing, test_config, TestSigner};
use serde_json::{json, Value};
use tokio::sync::broadcast::error::TryRecvError;

/// A memory store whose instance writes can be made to fail.
#[derive(Default)]
struct FlakyStore {
    inner: MemoryStore,
    fail_instances: AtomicBool,
}

#[async_trait]
impl ObjectStore for FlakyStore {
    async fn upsert(
        &self,
        collection: Collection,
        id: &str,
        value: &Value,
    ) -> quire_store::Result<()> {
        if collection == Collection::Instances && self.fail_instances.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("disk on fire".into()));
        }
        self.inner.upsert(collection, id, value).await
    }

    async fn get(&self, collection: Collection, id: &str) -> quire_store::Result<Option<Value>> {
        self.inner.get(collection, id).await
    }

    async fn find(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> quire_store::Result<Vec<Value>> {
        self.inner.find(collection, filter).await
    }
}

async fn open_memory_node(
    network: &Arc<MemoryNetwork>,
    hostname: &str,
) -> anyhow::Result<Node<MemoryStore>> {
    let store = Arc::new(MemoryStore::new());
    let identity = Node::bootstrap(Arc::clone(&store), hostname, Profile::default()).await?;
    let _ = network.register_host(hostname).await;
    network
        .publish_identity(hostname, identity.to_document(), true)
        .await;
    let transport = Network::from_transport(network.transport(hostname));
    Ok(Node::open(store, transport, test_config()).await?)
}

#[tokio::test]
async fn open_requires_bootstrap() {
    let network = MemoryNetwork::new();
    let result = Node::open(
        Arc::new(MemoryStore::new()),
        Network::from_transport(network.transport("a.example")),
        test_config(),
    )
    .await;
    assert!(matches!(result, Err(NodeError::NotBootstrapped)));
}

#[tokio::test]
async fn bootstrap_twice_fails() -> anyhow::Result<()> {
    let store = Arc::new(MemoryStore::new());
    let first = Node::bootstrap(Arc::clone(&store), "a.example", Profile::default()).await?;
    let second = Node::bootstrap(Arc::clone(&store), "a.example", Profile::default()).await;
    assert!(matches!(second, Err(NodeError::AlreadyBootstrapped)));

    let network = MemoryNetwork::new();
    let node = Node::open(
        store,
        Network::from_transport(network.transport("a.example")),
        test_config(),
    )
    .await?;
    assert_eq!(node.get_self(), first);
    Ok(())
}

#[tokio::test]
async fn settings_never_expose_signing_key() -> anyhow::Result<()> {
    let network = MemoryNetwork::new();
    let node = open_memory_node(&network, "a.example").await?;

    let seed = node
        .store()
        .get_setting(setting::SIGNING_KEY)
        .await?
        .expect("seed stored");
    let settings = node.list_settings().await?;

    let keys: Vec<_> = settings.iter().filter_map(|s| s["key"].as_str()).collect();
    assert!(keys.contains(&setting::HOSTNAME));
    assert!(keys.contains(&setting::SELF_ID));
    assert!(!keys.contains(&setting::SIGNING_KEY));
    assert!(!serde_json::to_string(&settings)?.contains(&seed));

    let me = serde_json::to_string(&node.get_self())?;
    assert!(!me.contains(&seed));
    Ok(())
}

#[tokio::test]
async fn state_survives_reopen() -> anyhow::Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("node.db");
    let network = MemoryNetwork::new();

    let (me, id) = {
        let store = Arc::new(SqliteStore::open(&path)?);
        Node::bootstrap(Arc::clone(&store), "a.example", Profile::default()).await?;
        let node = Node::open(
            store,
            Network::from_transport(network.transport("a.example")),
            test_config(),
        )
        .await?;
        let submission = node
            .submit(br#"{"text":"persisted"}"#, Session::AuthenticatedLocal)
            .await?;
        (node.get_self(), submission.instance.id)
    };

    let store = Arc::new(SqliteStore::open(&path)?);
    let node = Node::open(
        store,
        Network::from_transport(network.transport("a.example")),
        test_config(),
    )
    .await?;
    assert_eq!(node.get_self(), me);
    let instance = node.get_instance(id.as_str()).await?.expect("instance kept");
    assert_eq!(instance.payload.get("text"), Some(&json!("persisted")));

    // The reloaded key still signs as the same identity.
    let next = node
        .submit(br#"{"text":"again"}"#, Session::AuthenticatedLocal)
        .await?;
    assert_eq!(next.instance.owner, me.id);
    Ok(())
}

#[tokio::test]
async fn store_failure_prevents_dissemination() -> anyhow::Result<()> {
    init_tracing();
    let network = MemoryNetwork::new();
    let mut peer_inbox = network.register_host("b.example").await;

    let store = Arc::new(FlakyStore::default());
    Node::bootstrap(Arc::clone(&store), "a.example", Profile::default()).await?;
    let transport = Network::from_transport(network.transport("a.example"))
        .with_directory(Arc::new(StaticPeers::new(["b.example"])));
    let node = Node::open(Arc::clone(&store), transport, test_config()).await?;
    let mut events = node.subscribe();

    store.fail_instances.store(true, Ordering::SeqCst);
    let err = node
        .submit(br#"{"text":"lost"}"#, Session::AuthenticatedLocal)
        .await
        .unwrap_err();
    assert!(matches!(err, NodeError::Store(_)));
    assert!(err.is_transient());

    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
    assert!(peer_inbox.try_recv().is_err());
    assert_eq!(network.delivery_count(), 0);

    store.fail_instances.store(false, Ordering::SeqCst);
    let ok = node
        .submit(br#"{"text":"kept"}"#, Session::AuthenticatedLocal)
        .await?;
    ok.push.expect("push started").await?;
    assert_eq!(events.try_recv()?.id, ok.instance.id);
    assert_eq!(peer_inbox.recv().await.map(|d| d.from), Some("a.example".into()));
    Ok(())
}

#[tokio::test]
async fn malformed_input_is_rejected() -> anyhow::Result<()> {
    let network = MemoryNetwork::new();
    let store = Arc::new(MemoryStore::new());
    Node::bootstrap(Arc::clone(&store), "a.example", Profile::default()).await?;
    let config = NodeConfig {
        max_payload_len: 64,
        ..test_config()
    };
    let node = Node::open(
        store,
        Network::from_transport(network.transport("a.example")),
        config,
    )
    .await?;

    for body in [
        &b"not json"[..],
        &b"[1,2,3]"[..],
        &br#"{"owner":42}"#[..],
        format!(r#"{{"text":"{}"}}"#, "x".repeat(100)).as_bytes(),
    ] {
        let err = node
            .submit(body, Session::AuthenticatedLocal)
            .await
            .unwrap_err();
        assert!(matches!(err, NodeError::Malformed(_)), "{err}");
        assert!(err.is_definitive());
    }
    assert_eq!(node.store().count(Collection::Instances).await?, 0);
    Ok(())
}

#[tokio::test]
async fn duplicate_submission_is_not_redisseminated() -> anyhow::Result<()> {
    let network = MemoryNetwork::new();
    let node = open_memory_node(&network, "a.example").await?;
    let signer = TestSigner::new("s.example");
    signer.publish(&network).await;

    let payload = signer.sign(json!({"text": "once"}))?;
    let first = node
        .submit_payload(payload.clone(), Session::Anonymous)
        .await?;
    assert!(!first.duplicate);

    let mut events = node.subscribe();
    let second = node.submit_payload(payload, Session::Anonymous).await?;
    assert!(second.duplicate);
    assert!(second.push.is_none());
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
    Ok(())
}

#[tokio::test]
async fn resolution_is_idempotent() -> anyhow::Result<()> {
    let network = MemoryNetwork::new();
    let a = open_memory_node(&network, "a.example").await?;
    let b = open_memory_node(&network, "b.example").await?;

    let uri = IdentityUri::new("http", "b.example", None);
    let first = a.resolve_and_upsert_identity(&uri).await?;
    let second = a.resolve_and_upsert_identity(&uri).await?;

    assert_eq!(first.id, second.id);
    assert_eq!(first.hostname, second.hostname);
    assert_eq!(first.public_key, second.public_key);
    assert_eq!(first, b.get_self());
    assert_eq!(a.list_identities().await?.len(), 2);

    let missing = IdentityUri::new("http", "nowhere.example", None);
    assert!(matches!(
        a.resolve_and_upsert_identity(&missing).await,
        Err(NodeError::Resolution { .. })
    ));
    Ok(())
}

#[tokio::test]
async fn announced_identity_is_fetched_not_trusted() -> anyhow::Result<()> {
    let network = MemoryNetwork::new();
    let a = open_memory_node(&network, "a.example").await?;
    let b = open_memory_node(&network, "b.example").await?;

    // The announcement carries a key B never had.
    let mut body = b.get_self().to_document();
    let bogus = TestSigner::new("b.example").identity.public_key;
    body["publicKey"] = json!(bogus.to_hex());

    let stored = a.announce_identity(&body).await?;
    assert_eq!(stored.public_key, b.get_self().public_key);

    let err = a.announce_identity(&json!({"id": "x"})).await.unwrap_err();
    assert!(matches!(err, NodeError::Malformed(_)));
    Ok(())
}

#[tokio::test]
async fn stored_identities_warm_the_cache() -> anyhow::Result<()> {
    let network = MemoryNetwork::new();
    let store = Arc::new(MemoryStore::new());
    Node::bootstrap(Arc::clone(&store), "a.example", Profile::default()).await?;

    let signer = TestSigner::new("s.example");
    store
        .upsert(
            Collection::Identities,
            signer.identity.id.as_str(),
            &signer.identity.to_document(),
        )
        .await?;

    let node = Node::open(
        store,
        Network::from_transport(network.transport("a.example")),
        test_config(),
    )
    .await?;
    assert!(node
        .resolver()
        .cached(&signer.identity.uri("http"))
        .is_some());

    // The signer's host is not even on the network; the cached key suffices.
    node.submit_payload(signer.sign(json!({"text": "x"}))?, Session::Anonymous)
        .await?;
    assert_eq!(network.fetch_count(), 0);
    Ok(())
}
