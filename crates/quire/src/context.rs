//! The node's own identity and its store.
//!
//! The self record lives in the store itself:
//! - `settings/hostname`, `settings/self` (identity id) and
//!   `settings/signingKey` (hex-encoded Ed25519 seed);
//! - `identities/<self id>` (the public identity document).
//!
//! [`NodeContext::load`] reads it once; the identity is then shared
//! immutably for the life of the node.

use std::sync::Arc;

use quire_core::{Identity, IdentityId, Keypair, Profile};
use quire_store::{Collection, ObjectStore, StoreError, StoreExt};

use crate::error::{NodeError, Result};

/// Keys of the node's settings documents.
pub mod setting {
    pub const HOSTNAME: &str = "hostname";
    pub const SELF_ID: &str = "self";
    pub const SIGNING_KEY: &str = "signingKey";

    /// Settings that must never leave the node.
    pub const PRIVATE: &[&str] = &[SIGNING_KEY];
}

/// Self identity plus the store it was loaded from.
pub struct NodeContext<S: ObjectStore> {
    store: Arc<S>,
    identity: Arc<Identity>,
}

impl<S: ObjectStore> NodeContext<S> {
    /// Load the self record from the store.
    pub async fn load(store: Arc<S>) -> Result<Self> {
        let hostname = store
            .get_setting(setting::HOSTNAME)
            .await?
            .ok_or(NodeError::NotBootstrapped)?;
        let self_id = store
            .get_setting(setting::SELF_ID)
            .await?
            .ok_or(NodeError::NotBootstrapped)?;
        let seed = store
            .get_setting(setting::SIGNING_KEY)
            .await?
            .ok_or(NodeError::NotBootstrapped)?;

        let keypair = Keypair::from_seed_hex(&seed)
            .map_err(|e| StoreError::InvalidData(format!("signing key: {e}")))?;

        let profile = match store.get(Collection::Identities, &self_id).await? {
            Some(doc) => Identity::from_document(&doc)
                .map_err(|e| StoreError::InvalidData(format!("self identity: {e}")))?
                .profile,
            None => Profile::default(),
        };

        let identity = Identity::local(IdentityId::new(self_id), hostname, profile, keypair);
        tracing::debug!(
            id = %identity.id,
            hostname = %identity.hostname,
            key = %identity.public_key.fingerprint(),
            "loaded self identity"
        );

        Ok(Self {
            store,
            identity: Arc::new(identity),
        })
    }

    /// Create the self record in an empty store.
    ///
    /// Fails with `AlreadyBootstrapped` if a hostname is already set; the
    /// existing record is left untouched.
    pub async fn bootstrap(store: Arc<S>, hostname: &str, profile: Profile) -> Result<Self> {
        if store.get_setting(setting::HOSTNAME).await?.is_some() {
            return Err(NodeError::AlreadyBootstrapped);
        }

        let identity = Identity::generate(hostname, profile);
        let seed = identity
            .keypair()
            .map(|kp| hex::encode(kp.seed()))
            .ok_or(NodeError::NoPrivateKey)?;

        store
            .upsert(
                Collection::Identities,
                identity.id.as_str(),
                &identity.to_document(),
            )
            .await?;
        store.put_setting(setting::SIGNING_KEY, &seed).await?;
        store
            .put_setting(setting::SELF_ID, identity.id.as_str())
            .await?;
        // Written last: its presence marks the record as complete.
        store.put_setting(setting::HOSTNAME, hostname).await?;

        tracing::info!(id = %identity.id, hostname, "bootstrapped node");
        Ok(Self {
            store,
            identity: Arc::new(identity),
        })
    }

    /// The self identity, private key included.
    pub fn local_identity(&self) -> &Arc<Identity> {
        &self.identity
    }

    pub fn hostname(&self) -> &str {
        &self.identity.hostname
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }
}
