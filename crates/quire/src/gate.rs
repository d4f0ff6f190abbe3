//! The ownership gate: decides whether a submitted payload is trusted.
//!
//! ```text
//! Received -> Classified -+-> Signing   -+-> Accepted
//!                         |              |
//!                         +-> Verifying -+-> Rejected
//! ```
//!
//! A payload from an authenticated local session is owned by this node and
//! signed with its key, whatever the client claimed. Anything else must
//! carry a signature by the owner it names, checked against that owner's
//! resolved public key. No payload that names this node as owner is
//! accepted unless it came through a local session.

use std::sync::Arc;

use quire_core::{
    canonicalize, signing, Identity, IdentityUri, Instance, InstanceId, Payload, Signature,
};

use crate::error::{NodeError, Result, TrustDecision};
use crate::resolver::IdentityResolver;

/// How the submitter reached the node, as established by the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Session {
    /// A logged-in local user of this node.
    AuthenticatedLocal,
    /// A peer push or any unauthenticated caller.
    Anonymous,
}

/// A payload that passed the gate.
#[derive(Debug, Clone)]
pub struct Admission {
    pub instance: Instance,
    pub decision: TrustDecision,
    /// Owner identity fetched from the network while verifying, if any.
    pub fetched: Option<Arc<Identity>>,
}

/// Classifies and then signs or verifies submissions.
pub struct OwnershipGate {
    identity: Arc<Identity>,
    resolver: Arc<IdentityResolver>,
    scheme: String,
    refresh_on_mismatch: bool,
}

impl OwnershipGate {
    pub fn new(
        identity: Arc<Identity>,
        resolver: Arc<IdentityResolver>,
        scheme: impl Into<String>,
        refresh_on_mismatch: bool,
    ) -> Self {
        Self {
            identity,
            resolver,
            scheme: scheme.into(),
            refresh_on_mismatch,
        }
    }

    /// Decide which path a payload takes. Never touches the network.
    pub fn classify(&self, payload: &Payload, session: Session) -> Result<TrustDecision> {
        if session == Session::AuthenticatedLocal {
            return Ok(TrustDecision::LocalTrusted);
        }
        match payload.owner() {
            Some(owner) if owner == self.identity.id => Err(NodeError::OwnershipMismatch {
                owner: owner.to_string(),
                detail: "claims this node without a local session".into(),
            }),
            _ => Ok(TrustDecision::RemoteClaimPendingVerification),
        }
    }

    /// Run a payload through the gate.
    pub async fn admit(&self, payload: Payload, session: Session) -> Result<Admission> {
        tracing::debug!(?session, id = ?payload.id(), "received");

        let decision = match self.classify(&payload, session) {
            Ok(decision) => decision,
            Err(e) => {
                tracing::debug!(error = %e, "rejected at classification");
                return Err(e);
            }
        };
        tracing::debug!(?decision, "classified");

        let admission = match decision {
            TrustDecision::LocalTrusted => self.sign(payload).map(|instance| Admission {
                instance,
                decision,
                fetched: None,
            }),
            _ => self
                .verify(payload)
                .await
                .map(|(instance, fetched)| Admission {
                    instance,
                    decision,
                    fetched,
                }),
        };

        match &admission {
            Ok(a) => tracing::debug!(id = %a.instance.id, owner = %a.instance.owner, "accepted"),
            Err(e) => tracing::debug!(error = %e, "rejected"),
        }
        admission
    }

    fn sign(&self, mut payload: Payload) -> Result<Instance> {
        tracing::debug!("signing");

        let id = payload.id().unwrap_or_else(InstanceId::generate);
        payload.clear_signature();
        payload.stamp(&id, &self.identity.id, &self.identity.hostname);

        let signature = signing::sign(&canonicalize(&payload), &self.identity)?;
        payload.set_signature(&signature);
        Ok(Instance::from_payload(payload)?)
    }

    async fn verify(&self, payload: Payload) -> Result<(Instance, Option<Arc<Identity>>)> {
        tracing::debug!("verifying");

        let missing = |field: &str| NodeError::Malformed(format!("missing {field}"));
        let id = payload.id().ok_or_else(|| missing("id"))?;
        let owner = payload.owner().ok_or_else(|| missing("owner"))?;
        let origin = payload.origin().ok_or_else(|| missing("origin"))?;

        let encoded = payload
            .signature()
            .ok_or_else(|| NodeError::VerificationFailed(format!("{id} is unsigned")))?;
        let signature = Signature::from_hex(encoded)?;
        let canonical = canonicalize(&payload);

        let uri = IdentityUri::new(&self.scheme, origin, Some(owner));
        let resolved = self
            .resolver
            .resolve(&uri)
            .await
            .map_err(|e| NodeError::VerificationError(e.to_string()))?;

        let mut fetched = resolved.fresh.then(|| Arc::clone(&resolved.identity));
        let mut valid = signing::verify_signature(&canonical, &signature, &resolved.identity)?;

        if !valid && !resolved.fresh && self.refresh_on_mismatch {
            tracing::debug!(%uri, "cached key rejected signature, refreshing");
            let current = self
                .resolver
                .refresh(&uri)
                .await
                .map_err(|e| NodeError::VerificationError(e.to_string()))?;
            if current.public_key != resolved.identity.public_key {
                valid = signing::verify_signature(&canonical, &signature, &current)?;
                fetched = Some(current);
            }
        }

        if !valid {
            return Err(NodeError::VerificationFailed(format!(
                "{id} is not signed by {uri}"
            )));
        }
        Ok((Instance::from_payload(payload)?, fetched))
    }
}
