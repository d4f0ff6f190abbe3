//! Remote identity resolution with a shared cache.
//!
//! The cache is a sharded concurrent map keyed by identity URI. Lookups
//! for unrelated URIs never block each other, and two tasks resolving the
//! same URI may both fetch: the last successful fetch wins and replaces
//! the entry whole.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use quire_core::{Identity, IdentityUri};
use quire_net::IdentityFetcher;

use crate::error::{NodeError, Result};

#[derive(Clone)]
struct CachedIdentity {
    identity: Arc<Identity>,
    fetched_at: Instant,
}

/// A resolved identity and where it came from.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub identity: Arc<Identity>,
    /// True if the identity was just fetched rather than served from cache.
    pub fresh: bool,
}

/// Resolves identity URIs to identities, caching the results.
pub struct IdentityResolver {
    fetcher: Arc<dyn IdentityFetcher>,
    cache: DashMap<IdentityUri, CachedIdentity>,
    ttl: Option<Duration>,
}

impl IdentityResolver {
    /// Create a resolver. With `ttl` set, entries at least that old are
    /// re-fetched on the next lookup.
    pub fn new(fetcher: Arc<dyn IdentityFetcher>, ttl: Option<Duration>) -> Self {
        Self {
            fetcher,
            cache: DashMap::new(),
            ttl,
        }
    }

    /// Seed the cache with an already known identity.
    pub fn prime(&self, uri: IdentityUri, identity: Identity) {
        self.cache.insert(
            uri,
            CachedIdentity {
                identity: Arc::new(identity.to_public()),
                fetched_at: Instant::now(),
            },
        );
    }

    /// A cached, unexpired identity for `uri`.
    pub fn cached(&self, uri: &IdentityUri) -> Option<Arc<Identity>> {
        let entry = self.cache.get(uri)?;
        match self.ttl {
            Some(ttl) if entry.fetched_at.elapsed() >= ttl => None,
            _ => Some(Arc::clone(&entry.identity)),
        }
    }

    /// Resolve from cache, fetching on a miss.
    pub async fn resolve(&self, uri: &IdentityUri) -> Result<Resolved> {
        if let Some(identity) = self.cached(uri) {
            return Ok(Resolved {
                identity,
                fresh: false,
            });
        }
        self.refresh(uri).await.map(|identity| Resolved {
            identity,
            fresh: true,
        })
    }

    /// Fetch `uri`, bypassing the cache, and cache the result.
    pub async fn refresh(&self, uri: &IdentityUri) -> Result<Arc<Identity>> {
        let failed = |reason: String| NodeError::Resolution {
            uri: uri.to_string(),
            reason,
        };

        let doc = self
            .fetcher
            .fetch_identity(uri)
            .await
            .map_err(|e| failed(e.to_string()))?;
        let identity = Identity::from_document(&doc).map_err(|e| failed(e.to_string()))?;
        if !uri.matches(&identity) {
            return Err(failed(format!(
                "document names {} at {}",
                identity.id, identity.hostname
            )));
        }

        let identity = Arc::new(identity);
        let entry = CachedIdentity {
            identity: Arc::clone(&identity),
            fetched_at: Instant::now(),
        };
        // A lookup by bare hostname also answers the full URI.
        let canonical = identity.uri(&uri.scheme);
        if canonical != *uri {
            self.cache.insert(canonical, entry.clone());
        }
        self.cache.insert(uri.clone(), entry);

        tracing::debug!(
            %uri,
            key = %identity.public_key.fingerprint(),
            "resolved identity"
        );
        Ok(identity)
    }

    /// Drop a cached entry.
    pub fn invalidate(&self, uri: &IdentityUri) {
        self.cache.remove(uri);
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
