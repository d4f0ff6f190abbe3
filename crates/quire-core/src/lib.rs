//! # Quire Core
//!
//! Pure primitives for Quire: identities, signed instances, canonicalization.
//!
//! This crate contains no I/O, no storage, no networking. It is pure computation
//! over the data that nodes exchange.
//!
//! ## Key Types
//!
//! - [`Identity`] - A federation participant (id, hostname, public key)
//! - [`IdentityUri`] - Where an identity document can be fetched
//! - [`Payload`] - A decoded instance payload (JSON object)
//! - [`Instance`] - An accepted payload with an established owner binding
//! - [`Keypair`], [`PublicKey`], [`Signature`] - Ed25519 wrappers
//!
//! ## Canonicalization
//!
//! Signatures cover the deterministic CBOR encoding of the payload. See the
//! [`canonical`] module.

pub mod canonical;
pub mod crypto;
pub mod error;
pub mod identity;
pub mod instance;
pub mod signing;

pub use canonical::{canonicalize, sign_message, SIGN_DOMAIN};
pub use crypto::{Keypair, PublicKey, Signature};
pub use error::{CoreError, Result};
pub use identity::{Identity, IdentityId, IdentityUri, Profile, IDENTITY_PATH};
pub use instance::{Instance, InstanceId, Payload, MAX_PAYLOAD_LEN};
