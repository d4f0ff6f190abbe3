//! Instances: signed units of published content.
//!
//! On the wire an instance is a JSON object, its [`Payload`]. A handful of
//! keys are reserved and carry the ownership binding:
//! - `id`: assigned by the accepting node (or the origin node)
//! - `owner`: the owning identity's id
//! - `origin`: the owning identity's hostname
//! - `signature`: hex Ed25519 signature over the canonical form of everything else
//!
//! Every other key is opaque caller content.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::crypto::Signature;
use crate::error::{CoreError, Result};
use crate::identity::{IdentityId, IdentityUri};

/// Maximum encoded payload size accepted from the boundary (1 MiB).
pub const MAX_PAYLOAD_LEN: usize = 1 << 20;

/// Reserved payload keys.
pub mod keys {
    pub const ID: &str = "id";
    pub const OWNER: &str = "owner";
    pub const ORIGIN: &str = "origin";
    pub const SIGNATURE: &str = "signature";
}

/// Instance identifier.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(String);

impl InstanceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InstanceId({})", self.0)
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A decoded instance payload: a JSON object.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct Payload(Map<String, Value>);

impl Payload {
    /// Create an empty payload.
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Decode from raw JSON bytes, enforcing [`MAX_PAYLOAD_LEN`].
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        Self::from_json_limited(bytes, MAX_PAYLOAD_LEN)
    }

    /// Decode from raw JSON bytes with an explicit size limit.
    pub fn from_json_limited(bytes: &[u8], limit: usize) -> Result<Self> {
        if bytes.len() > limit {
            return Err(CoreError::PayloadTooLarge {
                len: bytes.len(),
                limit,
            });
        }
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| CoreError::MalformedPayload(e.to_string()))?;
        Self::from_value(value)
    }

    /// Wrap a JSON value; it must be an object whose reserved keys, when
    /// present, are strings.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => {
                for key in [keys::ID, keys::OWNER, keys::ORIGIN, keys::SIGNATURE] {
                    if let Some(v) = map.get(key) {
                        if !v.is_string() {
                            return Err(CoreError::MalformedPayload(format!(
                                "{key} must be a string"
                            )));
                        }
                    }
                }
                Ok(Self(map))
            }
            _ => Err(CoreError::MalformedPayload("expected JSON object".into())),
        }
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn id(&self) -> Option<InstanceId> {
        self.str_field(keys::ID).map(InstanceId::new)
    }

    pub fn owner(&self) -> Option<IdentityId> {
        self.str_field(keys::OWNER).map(IdentityId::new)
    }

    pub fn origin(&self) -> Option<&str> {
        self.str_field(keys::ORIGIN)
    }

    /// The encoded signature, exactly as supplied.
    pub fn signature(&self) -> Option<&str> {
        self.str_field(keys::SIGNATURE)
    }

    /// Stamp the ownership fields.
    pub fn stamp(&mut self, id: &InstanceId, owner: &IdentityId, origin: &str) {
        self.0.insert(keys::ID.into(), Value::String(id.to_string()));
        self.0
            .insert(keys::OWNER.into(), Value::String(owner.to_string()));
        self.0
            .insert(keys::ORIGIN.into(), Value::String(origin.to_string()));
    }

    pub fn set_signature(&mut self, signature: &Signature) {
        self.0
            .insert(keys::SIGNATURE.into(), Value::String(signature.to_hex()));
    }

    pub fn clear_signature(&mut self) {
        self.0.remove(keys::SIGNATURE);
    }

    /// Set an arbitrary content field.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

/// An accepted instance: a payload whose ownership binding has been
/// established and whose signature verifies against its owner.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    pub id: InstanceId,
    pub owner: IdentityId,
    pub origin: String,
    pub payload: Payload,
}

impl Instance {
    /// Build from a stamped and signed payload.
    pub fn from_payload(payload: Payload) -> Result<Self> {
        let missing = |k: &str| CoreError::MalformedPayload(format!("missing {k}"));
        let id = payload.id().ok_or_else(|| missing(keys::ID))?;
        let owner = payload.owner().ok_or_else(|| missing(keys::OWNER))?;
        let origin = payload
            .origin()
            .ok_or_else(|| missing(keys::ORIGIN))?
            .to_string();
        if payload.signature().is_none() {
            return Err(missing(keys::SIGNATURE));
        }
        Ok(Self {
            id,
            owner,
            origin,
            payload,
        })
    }

    /// URI of the owning identity.
    pub fn owner_uri(&self, scheme: &str) -> IdentityUri {
        IdentityUri::new(scheme, &self.origin, Some(self.owner.clone()))
    }

    /// The stored document (the full payload, signature included).
    pub fn to_document(&self) -> Value {
        self.payload.to_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_requires_object() {
        assert!(Payload::from_json(br#"{"text":"hi"}"#).is_ok());
        assert!(matches!(
            Payload::from_json(b"[1,2]"),
            Err(CoreError::MalformedPayload(_))
        ));
        assert!(matches!(
            Payload::from_json(b"{not json"),
            Err(CoreError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_reserved_keys_must_be_strings() {
        assert!(Payload::from_value(json!({"owner": 12})).is_err());
        assert!(Payload::from_value(json!({"signature": null})).is_err());
        assert!(Payload::from_value(json!({"id": "x", "owner": "y"})).is_ok());
    }

    #[test]
    fn test_size_limit() {
        let body = format!(r#"{{"text":"{}"}}"#, "a".repeat(64));
        assert!(Payload::from_json_limited(body.as_bytes(), 1024).is_ok());
        assert!(matches!(
            Payload::from_json_limited(body.as_bytes(), 16),
            Err(CoreError::PayloadTooLarge { limit: 16, .. })
        ));
    }

    #[test]
    fn test_stamp_and_accessors() {
        let mut payload = Payload::from_value(json!({"text": "hi"})).unwrap();
        let id = InstanceId::generate();
        let owner = IdentityId::new("owner-1");
        payload.stamp(&id, &owner, "a.example");

        assert_eq!(payload.id(), Some(id));
        assert_eq!(payload.owner(), Some(owner));
        assert_eq!(payload.origin(), Some("a.example"));
        assert_eq!(payload.signature(), None);
        assert_eq!(payload.get("text"), Some(&json!("hi")));
    }

    #[test]
    fn test_instance_requires_binding_fields() {
        let payload = Payload::from_value(json!({"text": "hi", "id": "1"})).unwrap();
        assert!(Instance::from_payload(payload).is_err());

        let payload = Payload::from_value(json!({
            "id": "1", "owner": "o", "origin": "a.example", "signature": "00"
        }))
        .unwrap();
        let instance = Instance::from_payload(payload).unwrap();
        assert_eq!(
            instance.owner_uri("https").to_string(),
            "https://a.example/identities/o"
        );
        assert_eq!(instance.to_document()["signature"], "00");
    }
}
