//! Proptest generators for property-based testing.

use proptest::prelude::*;
use serde_json::{Map, Number, Value};

use quire_core::{Identity, IdentityId, Keypair, Payload, Profile};

/// Generate a random keypair.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_map(|seed| Keypair::from_seed(&seed))
}

/// Generate a hostname.
pub fn hostname() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,15}\\.example".prop_map(String::from)
}

/// Generate a local identity (with private key).
pub fn local_identity() -> impl Strategy<Value = Identity> {
    (any::<[u8; 32]>(), hostname(), "[a-z0-9-]{1,36}").prop_map(|(seed, host, id)| {
        Identity::local(
            IdentityId::new(id),
            host,
            Profile::default(),
            Keypair::from_seed(&seed),
        )
    })
}

/// Generate a content key that does not collide with reserved payload keys.
pub fn content_key() -> impl Strategy<Value = String> {
    "[a-zA-Z_][a-zA-Z0-9_]{0,11}"
        .prop_filter("reserved key", |k| {
            !matches!(k.as_str(), "id" | "owner" | "origin" | "signature")
        })
        .prop_map(String::from)
}

/// Generate a finite JSON number, integral or not.
pub fn json_number() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(Value::from),
        any::<u64>().prop_map(Value::from),
        (-1.0e12f64..1.0e12f64)
            .prop_filter_map("finite", Number::from_f64)
            .prop_map(Value::Number),
    ]
}

/// Generate an arbitrary JSON value of bounded depth and size.
pub fn json_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        json_number(),
        ".{0,24}".prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 32, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,6}", inner, 0..6)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

/// Generate caller content: a JSON object without reserved keys.
pub fn content() -> impl Strategy<Value = Map<String, Value>> {
    prop::collection::btree_map(content_key(), json_value(), 0..8)
        .prop_map(|m| m.into_iter().collect())
}

/// Generate an unsigned content payload.
pub fn payload() -> impl Strategy<Value = Payload> {
    content().prop_filter_map("payload", |m| Payload::from_value(Value::Object(m)).ok())
}

/// Render a JSON object with its top-level keys in the given order.
///
/// `serde_json` maps are sorted, so this is how tests produce the same
/// object with different key order on the wire.
pub fn object_text(entries: &[(String, Value)]) -> String {
    let fields: Vec<String> = entries
        .iter()
        .map(|(k, v)| format!("{}:{}", Value::String(k.clone()), v))
        .collect();
    format!("{{{}}}", fields.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;
    use quire_core::{canonicalize, signing};

    proptest! {
        #[test]
        fn test_canonical_ignores_key_order(map in content()) {
            let forward: Vec<(String, Value)> = map.clone().into_iter().collect();
            let mut backward = forward.clone();
            backward.reverse();

            let a = Payload::from_json(object_text(&forward).as_bytes()).unwrap();
            let b = Payload::from_json(object_text(&backward).as_bytes()).unwrap();

            prop_assert_eq!(canonicalize(&a), canonicalize(&b));
        }

        #[test]
        fn test_sign_verify_roundtrip(identity in local_identity(), payload in payload()) {
            let canonical = canonicalize(&payload);
            let signature = signing::sign(&canonical, &identity).unwrap();
            prop_assert!(signing::verify(&canonical, &signature.to_hex(), &identity.to_public()).unwrap());
        }

        #[test]
        fn test_content_change_breaks_signature(
            identity in local_identity(),
            payload in payload(),
            key in content_key(),
            value in json_value(),
        ) {
            prop_assume!(payload.get(&key) != Some(&value));

            let signature = signing::sign(&canonicalize(&payload), &identity).unwrap();
            let mut tampered = payload.clone();
            tampered.insert(key, value);

            // 1 and 1.0 canonicalize alike; only a real byte change must fail.
            prop_assume!(canonicalize(&tampered) != canonicalize(&payload));
            prop_assert!(!signing::verify_signature(&canonicalize(&tampered), &signature, &identity).unwrap());
        }
    }
}
