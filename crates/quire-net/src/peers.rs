//! Fixed peer lists.

use async_trait::async_trait;

use crate::error::Result;
use crate::transport::{PeerAddr, PeerDirectory};

/// A peer directory backed by a fixed list, e.g. from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticPeers(Vec<PeerAddr>);

impl StaticPeers {
    pub fn new<I, P>(peers: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PeerAddr>,
    {
        Self(peers.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl PeerDirectory for StaticPeers {
    async fn peers(&self) -> Result<Vec<PeerAddr>> {
        Ok(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_peers() {
        let peers = StaticPeers::new(["a.example", "b.example"]);
        assert_eq!(
            peers.peers().await.unwrap(),
            vec![PeerAddr::new("a.example"), PeerAddr::new("b.example")]
        );
        assert!(StaticPeers::default().peers().await.unwrap().is_empty());
    }
}
