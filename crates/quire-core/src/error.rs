//! Error types for Quire core primitives.

use thiserror::Error;

/// Errors that can occur while handling keys, identities and payloads.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("identity has no private key")]
    NoPrivateKey,

    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    #[error("malformed identity: {0}")]
    MalformedIdentity(String),

    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("payload too large: {len} bytes exceeds limit of {limit}")]
    PayloadTooLarge { len: usize, limit: usize },

    #[error("decoding error: {0}")]
    DecodingError(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
