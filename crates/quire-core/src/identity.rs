//! Identities: federation participants and their canonical URIs.
//!
//! An [`Identity`] is what a node publishes about itself. Only the local
//! node's own identity carries a [`Keypair`]; the keypair is skipped by serde,
//! so an identity decoded from any document never has one.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::crypto::{Keypair, PublicKey};
use crate::error::{CoreError, Result};

/// Opaque identity identifier, assigned once at creation.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityId(String);

impl IdentityId {
    /// Wrap an existing identifier.
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

impl fmt::Debug for IdentityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IdentityId({})", self.0)
    }
}

impl fmt::Display for IdentityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque profile metadata. Not trust-relevant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

/// A federation participant.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: IdentityId,
    pub hostname: String,
    pub public_key: PublicKey,
    #[serde(flatten)]
    pub profile: Profile,
    #[serde(skip)]
    keypair: Option<Keypair>,
}

impl Identity {
    /// Create a new local identity with a fresh id and keypair.
    pub fn generate(hostname: impl Into<String>, profile: Profile) -> Self {
        Self::local(IdentityId::generate(), hostname, profile, Keypair::generate())
    }

    /// Assemble a local identity from its parts.
    pub fn local(
        id: IdentityId,
        hostname: impl Into<String>,
        profile: Profile,
        keypair: Keypair,
    ) -> Self {
        Self {
            id,
            hostname: hostname.into(),
            public_key: keypair.public_key(),
            profile,
            keypair: Some(keypair),
        }
    }

    /// Assemble a remote identity (no private key).
    pub fn remote(
        id: IdentityId,
        hostname: impl Into<String>,
        public_key: PublicKey,
        profile: Profile,
    ) -> Self {
        Self {
            id,
            hostname: hostname.into(),
            public_key,
            profile,
            keypair: None,
        }
    }

    /// Decode and validate an identity document.
    ///
    /// Requires `id`, `hostname` and `publicKey`; the key must be a valid
    /// Ed25519 point. The result never carries a private key.
    pub fn from_document(doc: &Value) -> Result<Self> {
        let obj = doc
            .as_object()
            .ok_or_else(|| CoreError::MalformedIdentity("expected object".into()))?;

        for field in ["id", "hostname", "publicKey"] {
            match obj.get(field) {
                Some(Value::String(s)) if !s.is_empty() => {}
                _ => {
                    return Err(CoreError::MalformedIdentity(format!(
                        "missing or invalid {field}"
                    )))
                }
            }
        }

        let identity: Identity = serde_json::from_value(doc.clone())
            .map_err(|e| CoreError::MalformedIdentity(e.to_string()))?;
        identity.public_key.validate()?;
        Ok(identity)
    }

    /// Encode as a public document (never includes the private key).
    pub fn to_document(&self) -> Value {
        // Serializing a struct of strings into a Value cannot fail.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// The identity's canonical URI under the given scheme.
    pub fn uri(&self, scheme: &str) -> IdentityUri {
        IdentityUri::new(scheme, &self.hostname, Some(self.id.clone()))
    }

    /// The keypair, if this is the local identity.
    pub fn keypair(&self) -> Option<&Keypair> {
        self.keypair.as_ref()
    }

    pub fn has_private_key(&self) -> bool {
        self.keypair.is_some()
    }

    /// Strip the private key, leaving only the public view.
    pub fn to_public(&self) -> Self {
        Self {
            keypair: None,
            ..self.clone()
        }
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("id", &self.id)
            .field("hostname", &self.hostname)
            .field("public_key", &self.public_key)
            .field("local", &self.keypair.is_some())
            .finish()
    }
}

impl PartialEq for Identity {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.hostname == other.hostname
            && self.public_key == other.public_key
            && self.profile == other.profile
    }
}

impl Eq for Identity {}

/// Where an identity document can be fetched.
///
/// Renders as `<scheme>://<hostname>/identities/<id>`, or
/// `<scheme>://<hostname>/` when the id is not yet known (the node's own
/// self document).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdentityUri {
    pub scheme: String,
    pub hostname: String,
    pub id: Option<IdentityId>,
}

/// Path segment under which nodes serve identity documents.
pub const IDENTITY_PATH: &str = "identities";

impl IdentityUri {
    pub fn new(scheme: &str, hostname: &str, id: Option<IdentityId>) -> Self {
        Self {
            scheme: scheme.to_string(),
            hostname: hostname.to_string(),
            id,
        }
    }

    /// Check a fetched identity against what this URI names.
    pub fn matches(&self, identity: &Identity) -> bool {
        identity.hostname == self.hostname
            && self.id.as_ref().map_or(true, |id| *id == identity.id)
    }
}

impl fmt::Display for IdentityUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(
                f,
                "{}://{}/{}/{}",
                self.scheme, self.hostname, IDENTITY_PATH, id
            ),
            None => write!(f, "{}://{}/", self.scheme, self.hostname),
        }
    }
}

impl FromStr for IdentityUri {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || CoreError::MalformedIdentity(format!("invalid identity uri: {s}"));

        let (scheme, rest) = s.split_once("://").ok_or_else(invalid)?;
        if scheme.is_empty() {
            return Err(invalid());
        }
        let (hostname, path) = match rest.split_once('/') {
            Some((host, path)) => (host, path),
            None => (rest, ""),
        };
        if hostname.is_empty() {
            return Err(invalid());
        }

        let path = path.trim_end_matches('/');
        let id = if path.is_empty() {
            None
        } else {
            match path.split_once('/') {
                Some((IDENTITY_PATH, id)) if !id.is_empty() && !id.contains('/') => {
                    Some(IdentityId::new(id))
                }
                _ => return Err(invalid()),
            }
        };

        Ok(Self::new(scheme, hostname, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_document_never_contains_private_key() {
        let identity = Identity::generate("a.example", Profile::default());
        assert!(identity.has_private_key());

        let doc = identity.to_document();
        let obj = doc.as_object().unwrap();
        assert_eq!(obj.len(), 5);
        assert!(obj.contains_key("publicKey"));
        assert!(!doc.to_string().contains(&hex::encode(identity.keypair().unwrap().seed())));
    }

    #[test]
    fn test_from_document_has_no_private_key() {
        let identity = Identity::generate("a.example", Profile::default());
        let decoded = Identity::from_document(&identity.to_document()).unwrap();
        assert_eq!(decoded, identity);
        assert!(!decoded.has_private_key());
    }

    #[test]
    fn test_from_document_requires_fields() {
        let pk = Keypair::from_seed(&[0x01; 32]).public_key().to_hex();
        let missing_host = json!({"id": "x", "publicKey": pk});
        assert!(matches!(
            Identity::from_document(&missing_host),
            Err(CoreError::MalformedIdentity(_))
        ));

        let empty_id = json!({"id": "", "hostname": "h", "publicKey": pk});
        assert!(Identity::from_document(&empty_id).is_err());

        let bad_key = json!({"id": "x", "hostname": "h", "publicKey": "abcd"});
        assert!(Identity::from_document(&bad_key).is_err());

        assert!(Identity::from_document(&json!("not an object")).is_err());
    }

    #[test]
    fn test_profile_fields_are_camel_case() {
        let identity = Identity::generate(
            "a.example",
            Profile {
                first_name: "Ada".into(),
                last_name: "Lovelace".into(),
            },
        );
        let doc = identity.to_document();
        assert_eq!(doc["firstName"], "Ada");
        assert_eq!(doc["lastName"], "Lovelace");
    }

    #[test]
    fn test_uri_display_and_parse() {
        let uri = IdentityUri::new("https", "a.example", Some(IdentityId::new("abc")));
        assert_eq!(uri.to_string(), "https://a.example/identities/abc");
        assert_eq!(uri.to_string().parse::<IdentityUri>().unwrap(), uri);

        let root: IdentityUri = "http://b.example:8080/".parse().unwrap();
        assert_eq!(root.hostname, "b.example:8080");
        assert_eq!(root.id, None);
        assert_eq!(root.to_string(), "http://b.example:8080/");

        let bare: IdentityUri = "http://b.example".parse().unwrap();
        assert_eq!(bare, root_with_host("http", "b.example"));
    }

    fn root_with_host(scheme: &str, host: &str) -> IdentityUri {
        IdentityUri::new(scheme, host, None)
    }

    #[test]
    fn test_uri_parse_rejects_garbage() {
        assert!("a.example/identities/x".parse::<IdentityUri>().is_err());
        assert!("https:///identities/x".parse::<IdentityUri>().is_err());
        assert!("https://a.example/other/x".parse::<IdentityUri>().is_err());
        assert!("https://a.example/identities/".parse::<IdentityUri>().is_err());
    }

    #[test]
    fn test_uri_matches() {
        let identity = Identity::generate("a.example", Profile::default());
        assert!(identity.uri("https").matches(&identity));
        assert!(IdentityUri::new("https", "a.example", None).matches(&identity));

        let other = IdentityUri::new("https", "a.example", Some(IdentityId::new("nope")));
        assert!(!other.matches(&identity));
        let wrong_host = IdentityUri::new("https", "b.example", None);
        assert!(!wrong_host.matches(&identity));
    }
}
