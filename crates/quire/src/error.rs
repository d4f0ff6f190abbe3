//! Error types for the node.

use quire_core::CoreError;
use quire_net::NetError;
use quire_store::StoreError;
use thiserror::Error;

/// Outcome of the trust decision for one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustDecision {
    /// Submitted through an authenticated local session; signed by self.
    LocalTrusted,
    /// Claims a remote owner; accepted only once the signature verifies.
    RemoteClaimPendingVerification,
    /// Claims to be owned by this node but did not come from a local session.
    OwnershipMismatch,
    /// The signature does not match the owner's key.
    VerificationFailed,
    /// The signature could not be checked.
    VerificationError,
}

/// Errors that can occur during node operations.
#[derive(Debug, Error)]
pub enum NodeError {
    /// The store holds no self identity yet.
    #[error("node is not bootstrapped")]
    NotBootstrapped,

    /// Bootstrap was run on a store that already has a self identity.
    #[error("node is already bootstrapped")]
    AlreadyBootstrapped,

    /// Signing was attempted with an identity that has no private key.
    #[error("identity has no private key")]
    NoPrivateKey,

    /// An identity document could not be fetched or was unusable.
    #[error("cannot resolve identity {uri}: {reason}")]
    Resolution { uri: String, reason: String },

    /// The signature could not be checked (transient, retryable).
    #[error("verification error: {0}")]
    VerificationError(String),

    /// The signature does not verify against the owner's key.
    #[error("verification failed: {0}")]
    VerificationFailed(String),

    /// The claimed owner conflicts with what this node already holds: a
    /// non-local submission naming this node, a stored instance of another
    /// owner, or an identity id already bound to another host.
    #[error("ownership mismatch for {owner}: {detail}")]
    OwnershipMismatch { owner: String, detail: String },

    /// The payload is not a usable instance.
    #[error("malformed payload: {0}")]
    Malformed(String),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// The network layer could not be set up.
    #[error("network error: {0}")]
    Net(#[from] NetError),
}

impl NodeError {
    /// Rejections that retrying the same request cannot fix.
    pub fn is_definitive(&self) -> bool {
        matches!(
            self,
            NodeError::VerificationFailed(_)
                | NodeError::OwnershipMismatch { .. }
                | NodeError::Malformed(_)
        )
    }

    /// Failures worth retrying later.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            NodeError::Resolution { .. } | NodeError::VerificationError(_) | NodeError::Store(_)
        )
    }

    /// The trust decision this error represents, if it is a trust rejection.
    pub fn decision(&self) -> Option<TrustDecision> {
        match self {
            NodeError::OwnershipMismatch { .. } => Some(TrustDecision::OwnershipMismatch),
            NodeError::VerificationFailed(_) => Some(TrustDecision::VerificationFailed),
            NodeError::VerificationError(_) | NodeError::Resolution { .. } => {
                Some(TrustDecision::VerificationError)
            }
            _ => None,
        }
    }
}

impl From<CoreError> for NodeError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::NoPrivateKey => NodeError::NoPrivateKey,
            CoreError::InvalidPublicKey(_) | CoreError::MalformedSignature(_) => {
                NodeError::VerificationError(e.to_string())
            }
            CoreError::MalformedIdentity(_)
            | CoreError::MalformedPayload(_)
            | CoreError::PayloadTooLarge { .. }
            | CoreError::DecodingError(_) => NodeError::Malformed(e.to_string()),
        }
    }
}

/// Result type for node operations.
pub type Result<T> = std::result::Result<T, NodeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_is_exclusive() {
        let errors = [
            NodeError::NotBootstrapped,
            NodeError::AlreadyBootstrapped,
            NodeError::NoPrivateKey,
            NodeError::Resolution {
                uri: "u".into(),
                reason: "r".into(),
            },
            NodeError::VerificationError("x".into()),
            NodeError::VerificationFailed("x".into()),
            NodeError::OwnershipMismatch {
                owner: "o".into(),
                detail: "d".into(),
            },
            NodeError::Malformed("x".into()),
            NodeError::Store(StoreError::Unavailable("down".into())),
        ];
        for e in &errors {
            assert!(!(e.is_definitive() && e.is_transient()), "{e}");
        }
    }

    #[test]
    fn test_core_error_mapping() {
        assert!(matches!(
            NodeError::from(CoreError::MalformedSignature("bad".into())),
            NodeError::VerificationError(_)
        ));
        assert!(matches!(
            NodeError::from(CoreError::PayloadTooLarge { len: 2, limit: 1 }),
            NodeError::Malformed(_)
        ));
        assert!(matches!(
            NodeError::from(CoreError::NoPrivateKey),
            NodeError::NoPrivateKey
        ));
    }

    #[test]
    fn test_decisions() {
        let mismatch = NodeError::OwnershipMismatch {
            owner: "o".into(),
            detail: "d".into(),
        };
        assert_eq!(
            mismatch.decision(),
            Some(TrustDecision::OwnershipMismatch)
        );
        assert_eq!(
            NodeError::Resolution {
                uri: "u".into(),
                reason: "r".into()
            }
            .decision(),
            Some(TrustDecision::VerificationError)
        );
        assert_eq!(NodeError::NotBootstrapped.decision(), None);
    }
}
