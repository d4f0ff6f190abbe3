//! HTTP transport over reqwest.
//!
//! Identity documents are fetched with `GET <identity uri>`; instances are
//! pushed with `POST <scheme>://<peer>/instances` and a JSON body.

use std::time::Duration;

use async_trait::async_trait;
use quire_core::IdentityUri;
use serde_json::Value;

use crate::error::{NetError, Result};
use crate::transport::{IdentityFetcher, PeerAddr, PeerTransport};

/// Path peers accept pushed instances on.
pub const INSTANCES_PATH: &str = "instances";

/// Largest identity document accepted from a peer, in bytes.
pub const MAX_IDENTITY_DOCUMENT_LEN: usize = 64 * 1024;

/// HTTP client shared by all outbound calls of a node.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    scheme: String,
}

impl HttpTransport {
    /// Build a transport with a per-request timeout.
    pub fn new(scheme: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            scheme: scheme.into(),
        })
    }

    /// Where a peer accepts pushed instances.
    pub fn instances_url(&self, peer: &PeerAddr) -> String {
        format!("{}://{}/{}", self.scheme, peer.hostname(), INSTANCES_PATH)
    }
}

#[async_trait]
impl IdentityFetcher for HttpTransport {
    async fn fetch_identity(&self, uri: &IdentityUri) -> Result<Value> {
        let url = uri.to_string();
        tracing::debug!(%url, "fetching identity");

        let mut response = self.client.get(&url).send().await?.error_for_status()?;
        if let Some(len) = response.content_length() {
            check_len(usize::try_from(len).unwrap_or(usize::MAX), &url)?;
        }

        // Content-Length may be absent or wrong, so count what arrives.
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            check_len(body.len() + chunk.len(), &url)?;
            body.extend_from_slice(&chunk);
        }

        serde_json::from_slice(&body)
            .map_err(|e| NetError::InvalidResponse(format!("{url}: {e}")))
    }
}

fn check_len(len: usize, url: &str) -> Result<()> {
    if len > MAX_IDENTITY_DOCUMENT_LEN {
        return Err(NetError::InvalidResponse(format!(
            "{url}: identity document exceeds {MAX_IDENTITY_DOCUMENT_LEN} bytes"
        )));
    }
    Ok(())
}

#[async_trait]
impl PeerTransport for HttpTransport {
    async fn deliver(&self, peer: &PeerAddr, document: &Value) -> Result<()> {
        let url = self.instances_url(peer);
        self.client
            .post(&url)
            .json(document)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
