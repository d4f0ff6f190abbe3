//! Node configuration.

use std::time::Duration;

use quire_core::MAX_PAYLOAD_LEN;
use quire_net::DEFAULT_BROADCAST_CAPACITY;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Configuration for a [`Node`](crate::Node).
///
/// Every field has a default, so a TOML file only needs the keys it changes:
///
/// ```toml
/// scheme = "http"
/// identity_ttl_secs = 3600
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NodeConfig {
    /// URI scheme used for identity URIs and peer pushes.
    pub scheme: String,
    /// Timeout for each outbound HTTP request.
    pub fetch_timeout_ms: u64,
    /// Cached identities older than this are re-fetched. `None` keeps them
    /// until a verification mismatch forces a refresh.
    pub identity_ttl_secs: Option<u64>,
    /// Re-resolve once when a signature fails against a cached key.
    pub refresh_on_mismatch: bool,
    /// Buffer size of the local subscriber channel.
    pub broadcast_capacity: usize,
    /// Largest accepted raw payload, in bytes.
    pub max_payload_len: usize,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            scheme: "https".to_string(),
            fetch_timeout_ms: 10_000,
            identity_ttl_secs: None,
            refresh_on_mismatch: true,
            broadcast_capacity: DEFAULT_BROADCAST_CAPACITY,
            max_payload_len: MAX_PAYLOAD_LEN,
        }
    }
}

impl NodeConfig {
    /// Parse from TOML, filling unspecified fields with defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn identity_ttl(&self) -> Option<Duration> {
        self.identity_ttl_secs.map(Duration::from_secs)
    }
}
