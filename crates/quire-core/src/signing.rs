//! Detached signatures over canonical payload bytes.
//!
//! Both functions apply [`SIGN_DOMAIN`](crate::canonical::SIGN_DOMAIN)
//! separation internally, so callers pass canonical bytes exactly as
//! returned by [`canonicalize`](crate::canonical::canonicalize).

use crate::canonical::sign_message;
use crate::crypto::Signature;
use crate::error::{CoreError, Result};
use crate::identity::Identity;

/// Sign canonical bytes with the identity's private key.
pub fn sign(canonical: &[u8], identity: &Identity) -> Result<Signature> {
    let keypair = identity.keypair().ok_or(CoreError::NoPrivateKey)?;
    Ok(keypair.sign(&sign_message(canonical)))
}

/// Check an encoded signature against the identity's public key.
///
/// - `Ok(true)`: the signature matches.
/// - `Ok(false)`: well-formed, but does not match (definitive).
/// - `Err(MalformedSignature | InvalidPublicKey)`: could not be checked.
pub fn verify(canonical: &[u8], signature: &str, identity: &Identity) -> Result<bool> {
    let signature = Signature::from_hex(signature)?;
    verify_signature(canonical, &signature, identity)
}

/// Like [`verify`], for an already decoded signature.
pub fn verify_signature(
    canonical: &[u8],
    signature: &Signature,
    identity: &Identity,
) -> Result<bool> {
    identity
        .public_key
        .verify(&sign_message(canonical), signature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::canonicalize;
    use crate::crypto::Keypair;
    use crate::identity::{IdentityId, Profile};
    use crate::instance::Payload;
    use proptest::prelude::*;
    use serde_json::json;

    fn local(seed: u8) -> Identity {
        Identity::local(
            IdentityId::new(format!("id-{seed}")),
            "a.example",
            Profile::default(),
            Keypair::from_seed(&[seed; 32]),
        )
    }

    #[test]
    fn test_sign_requires_private_key() {
        let remote = local(1).to_public();
        assert!(matches!(
            sign(b"bytes", &remote),
            Err(CoreError::NoPrivateKey)
        ));
    }

    #[test]
    fn test_verify_with_public_view() {
        let identity = local(1);
        let payload = Payload::from_value(json!({"text": "hi"})).unwrap();
        let canonical = canonicalize(&payload);
        let signature = sign(&canonical, &identity).unwrap();

        assert!(verify(&canonical, &signature.to_hex(), &identity.to_public()).unwrap());
    }

    #[test]
    fn test_wrong_key_is_false_not_error() {
        let canonical = b"some canonical bytes";
        let signature = sign(canonical, &local(1)).unwrap();
        assert!(!verify(canonical, &signature.to_hex(), &local(2)).unwrap());
    }

    #[test]
    fn test_malformed_signature_is_error() {
        let identity = local(1);
        assert!(matches!(
            verify(b"x", "not-hex", &identity),
            Err(CoreError::MalformedSignature(_))
        ));
        assert!(matches!(
            verify(b"x", "abcd", &identity),
            Err(CoreError::MalformedSignature(_))
        ));
    }

    #[test]
    fn test_signature_is_domain_separated() {
        let identity = local(1);
        let raw = identity.keypair().unwrap().sign(b"bytes");
        assert!(!verify_signature(b"bytes", &raw, &identity).unwrap());
    }

    proptest! {
        #[test]
        fn prop_roundtrip(seed in any::<[u8; 32]>(), text in ".{0,64}", n in any::<i64>()) {
            let identity = Identity::local(
                IdentityId::generate(),
                "a.example",
                Profile::default(),
                Keypair::from_seed(&seed),
            );
            let payload = Payload::from_value(json!({"text": text, "n": n})).unwrap();
            let canonical = canonicalize(&payload);
            let signature = sign(&canonical, &identity).unwrap();
            prop_assert!(verify(&canonical, &signature.to_hex(), &identity).unwrap());
        }

        #[test]
        fn prop_tamper_detected(seed in any::<[u8; 32]>(), index in any::<prop::sample::Index>(), flip in 1u8..=255) {
            let identity = Identity::local(
                IdentityId::generate(),
                "a.example",
                Profile::default(),
                Keypair::from_seed(&seed),
            );
            let payload = Payload::from_value(json!({"text": "hello", "id": "x"})).unwrap();
            let mut canonical = canonicalize(&payload);
            let signature = sign(&canonical, &identity).unwrap();

            let i = index.index(canonical.len());
            canonical[i] ^= flip;
            prop_assert!(!verify(&canonical, &signature.to_hex(), &identity).unwrap());
        }
    }
}
