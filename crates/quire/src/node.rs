//! The Node: unified API for a federation participant.
//!
//! A node ties together its self identity, the ownership gate, the identity
//! resolver, the store, and dissemination. Every operation takes `&self`,
//! so a node is shared across request handlers behind an `Arc`.

use std::sync::Arc;

use quire_core::{Identity, IdentityId, IdentityUri, Instance, Payload, Profile};
use quire_net::{
    Disseminator, HttpTransport, IdentityFetcher, PeerDirectory, PeerTransport, PushReport,
};
use quire_store::{Collection, Filter, ObjectStore};
use serde_json::Value;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::config::NodeConfig;
use crate::context::{setting, NodeContext};
use crate::directory::IdentityDirectory;
use crate::error::{NodeError, Result, TrustDecision};
use crate::gate::{OwnershipGate, Session};
use crate::resolver::IdentityResolver;

/// The outbound side of a node.
pub struct Network {
    pub fetcher: Arc<dyn IdentityFetcher>,
    pub transport: Arc<dyn PeerTransport>,
    /// Peers to push to; `None` derives them from stored identities.
    pub directory: Option<Arc<dyn PeerDirectory>>,
}

impl Network {
    pub fn new(fetcher: Arc<dyn IdentityFetcher>, transport: Arc<dyn PeerTransport>) -> Self {
        Self {
            fetcher,
            transport,
            directory: None,
        }
    }

    /// Use one value for both fetching and pushing.
    pub fn from_transport<T>(transport: T) -> Self
    where
        T: IdentityFetcher + PeerTransport + 'static,
    {
        let transport = Arc::new(transport);
        Self::new(transport.clone(), transport)
    }

    /// HTTP in both directions, per the config's scheme and timeout.
    pub fn http(config: &NodeConfig) -> Result<Self> {
        Ok(Self::from_transport(HttpTransport::new(
            &config.scheme,
            config.fetch_timeout(),
        )?))
    }

    pub fn with_directory(mut self, directory: Arc<dyn PeerDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }
}

/// Result of an accepted submission.
#[derive(Debug)]
pub struct Submission {
    pub instance: Instance,
    pub decision: TrustDecision,
    /// An identical document was already stored, so nothing was disseminated.
    pub duplicate: bool,
    /// The background push to peers, if one was started. Dropping it does
    /// not cancel the push.
    pub push: Option<JoinHandle<PushReport>>,
}

/// The main Node struct.
pub struct Node<S: ObjectStore + 'static> {
    context: NodeContext<S>,
    config: NodeConfig,
    resolver: Arc<IdentityResolver>,
    gate: OwnershipGate,
    disseminator: Disseminator,
}

impl<S: ObjectStore + 'static> Node<S> {
    /// Create the self identity in an empty store.
    ///
    /// Returns the public view of the new identity.
    pub async fn bootstrap(store: Arc<S>, hostname: &str, profile: Profile) -> Result<Identity> {
        let context = NodeContext::bootstrap(store, hostname, profile).await?;
        Ok(context.local_identity().to_public())
    }

    /// Open a bootstrapped store.
    ///
    /// Identities already in the store are loaded into the resolver cache.
    pub async fn open(store: Arc<S>, network: Network, config: NodeConfig) -> Result<Self> {
        let context = NodeContext::load(store).await?;
        let identity = Arc::clone(context.local_identity());

        let resolver = Arc::new(IdentityResolver::new(
            network.fetcher,
            config.identity_ttl(),
        ));
        let known = context
            .store()
            .find(Collection::Identities, &Filter::all())
            .await?;
        for doc in known {
            match Identity::from_document(&doc) {
                Ok(known) if known.id != identity.id => {
                    resolver.prime(known.uri(&config.scheme), known);
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "skipping unreadable stored identity"),
            }
        }

        let directory: Arc<dyn PeerDirectory> = match network.directory {
            Some(directory) => directory,
            None => Arc::new(IdentityDirectory::new(Arc::clone(context.store()))),
        };
        let disseminator = Disseminator::new(
            network.transport,
            directory,
            identity.hostname.clone(),
            config.broadcast_capacity,
        );
        let gate = OwnershipGate::new(
            Arc::clone(&identity),
            Arc::clone(&resolver),
            config.scheme.clone(),
            config.refresh_on_mismatch,
        );

        tracing::info!(
            id = %identity.id,
            hostname = %identity.hostname,
            cached_identities = resolver.len(),
            "node opened"
        );

        Ok(Self {
            context,
            config,
            resolver,
            gate,
            disseminator,
        })
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// The self identity, private key included.
    pub fn local_identity(&self) -> &Arc<Identity> {
        self.context.local_identity()
    }

    pub fn resolver(&self) -> &IdentityResolver {
        &self.resolver
    }

    pub fn store(&self) -> &Arc<S> {
        self.context.store()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Instances
    // ─────────────────────────────────────────────────────────────────────────

    /// Submit a raw JSON payload.
    pub async fn submit(&self, raw: &[u8], session: Session) -> Result<Submission> {
        match Payload::from_json_limited(raw, self.config.max_payload_len) {
            Ok(payload) => self.submit_payload(payload, session).await,
            Err(e) => {
                let e = NodeError::from(e);
                log_rejection(&e, session);
                Err(e)
            }
        }
    }

    /// Submit an already decoded payload.
    ///
    /// On success the instance is stored, then broadcast to local
    /// subscribers and pushed to peers in the background. Nothing is
    /// disseminated unless the store write succeeded.
    pub async fn submit_payload(&self, payload: Payload, session: Session) -> Result<Submission> {
        let result = self.accept(payload, session).await;
        if let Err(e) = &result {
            log_rejection(e, session);
        }
        result
    }

    async fn accept(&self, payload: Payload, session: Session) -> Result<Submission> {
        let admission = self.gate.admit(payload, session).await?;
        let store = self.store();

        let instance = admission.instance;
        let document = instance.to_document();

        let existing = store.get(Collection::Instances, instance.id.as_str()).await?;
        if existing.as_ref() == Some(&document) {
            tracing::debug!(id = %instance.id, "already stored, not disseminating");
            return Ok(Submission {
                instance,
                decision: admission.decision,
                duplicate: true,
                push: None,
            });
        }
        if let Some(existing) = &existing {
            check_same_owner(existing, &instance)?;
        }
        self.check_binding(&instance.owner, &instance.origin).await?;

        if let Some(owner) = &admission.fetched {
            store
                .upsert(
                    Collection::Identities,
                    owner.id.as_str(),
                    &owner.to_document(),
                )
                .await?;
        }
        store
            .upsert(Collection::Instances, instance.id.as_str(), &document)
            .await?;

        let subscribers = self.disseminator.broadcast(&instance);
        let disseminator = self.disseminator.clone();
        let pushed = instance.clone();
        let push = tokio::spawn(async move { disseminator.push(&pushed).await });

        tracing::info!(
            id = %instance.id,
            owner = %instance.owner,
            origin = %instance.origin,
            decision = ?admission.decision,
            subscribers,
            "accepted instance"
        );

        Ok(Submission {
            instance,
            decision: admission.decision,
            duplicate: false,
            push: Some(push),
        })
    }

    /// Stored instances matching the filter.
    pub async fn list_instances(&self, filter: &Filter) -> Result<Vec<Instance>> {
        let docs = self.store().find(Collection::Instances, filter).await?;
        Ok(docs.into_iter().filter_map(decode_instance).collect())
    }

    /// A single stored instance.
    pub async fn get_instance(&self, id: &str) -> Result<Option<Instance>> {
        let doc = self.store().get(Collection::Instances, id).await?;
        Ok(doc.and_then(decode_instance))
    }

    /// Subscribe to instances accepted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Instance> {
        self.disseminator.subscribe()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Identities
    // ─────────────────────────────────────────────────────────────────────────

    /// The public self identity.
    pub fn get_self(&self) -> Identity {
        self.local_identity().to_public()
    }

    /// Fetch an identity (bypassing the cache) and store it.
    ///
    /// The self record is never overwritten this way.
    pub async fn resolve_and_upsert_identity(&self, uri: &IdentityUri) -> Result<Identity> {
        let identity = self.resolver.refresh(uri).await?;

        if identity.id == self.local_identity().id {
            tracing::debug!(%uri, "resolved self, not storing");
        } else {
            self.check_binding(&identity.id, &identity.hostname).await?;
            self.store()
                .upsert(
                    Collection::Identities,
                    identity.id.as_str(),
                    &identity.to_document(),
                )
                .await?;
            tracing::info!(%uri, id = %identity.id, "stored identity");
        }
        Ok((*identity).clone())
    }

    /// A peer announces an identity.
    ///
    /// The body is only used to find out where to look: the identity that
    /// gets stored is the one fetched from the announced host.
    pub async fn announce_identity(&self, document: &Value) -> Result<Identity> {
        let claimed = Identity::from_document(document)?;
        self.resolve_and_upsert_identity(&claimed.uri(&self.config.scheme))
            .await
    }

    /// Every stored identity, self included.
    pub async fn list_identities(&self) -> Result<Vec<Identity>> {
        let docs = self
            .store()
            .find(Collection::Identities, &Filter::all())
            .await?;
        Ok(docs
            .iter()
            .filter_map(|doc| match Identity::from_document(doc) {
                Ok(identity) => Some(identity),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unreadable stored identity");
                    None
                }
            })
            .collect())
    }

    /// Refuse an identity id that is already stored under another host.
    async fn check_binding(&self, id: &IdentityId, hostname: &str) -> Result<()> {
        let stored = self.store().get(Collection::Identities, id.as_str()).await?;
        let bound = stored
            .as_ref()
            .and_then(|doc| doc.get("hostname"))
            .and_then(Value::as_str);
        match bound {
            Some(bound) if bound != hostname => Err(NodeError::OwnershipMismatch {
                owner: id.to_string(),
                detail: format!("bound to {bound}, not {hostname}"),
            }),
            _ => Ok(()),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Settings
    // ─────────────────────────────────────────────────────────────────────────

    /// Settings documents, minus the private ones.
    pub async fn list_settings(&self) -> Result<Vec<Value>> {
        let docs = self
            .store()
            .find(Collection::Settings, &Filter::all())
            .await?;
        Ok(docs
            .into_iter()
            .filter(|doc| {
                doc.get("key")
                    .and_then(Value::as_str)
                    .map_or(false, |key| !setting::PRIVATE.contains(&key))
            })
            .collect())
    }
}

fn decode_instance(doc: Value) -> Option<Instance> {
    match Payload::from_value(doc).and_then(Instance::from_payload) {
        Ok(instance) => Some(instance),
        Err(e) => {
            tracing::warn!(error = %e, "skipping unreadable stored instance");
            None
        }
    }
}

/// An instance may only replace a stored one with the same owner and origin.
fn check_same_owner(existing: &Value, instance: &Instance) -> Result<()> {
    let field = |key: &str| existing.get(key).and_then(Value::as_str);
    let same_owner = field("owner") == Some(instance.owner.as_str());
    if same_owner && field("origin") == Some(instance.origin.as_str()) {
        return Ok(());
    }
    Err(NodeError::OwnershipMismatch {
        owner: instance.owner.to_string(),
        detail: format!("instance {} is held for another owner", instance.id),
    })
}

/// Definitive rejections are the client's problem; transient ones are ours.
fn log_rejection(e: &NodeError, session: Session) {
    if e.is_definitive() {
        tracing::info!(error = %e, ?session, decision = ?e.decision(), "rejected instance");
    } else {
        tracing::warn!(error = %e, ?session, "could not process instance");
    }
}
