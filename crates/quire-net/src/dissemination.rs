//! Dissemination of accepted instances.
//!
//! Two independent paths:
//! - **broadcast**: in-process fan-out to local subscribers over a tokio
//!   broadcast channel. Never blocks; slow subscribers lag and drop.
//! - **push**: best-effort delivery to every peer in the directory, all
//!   peers concurrently. A failing peer is logged and counted, never retried.

use std::collections::BTreeSet;
use std::sync::Arc;

use futures::future::join_all;
use quire_core::Instance;
use tokio::sync::broadcast;

use crate::transport::{PeerAddr, PeerDirectory, PeerTransport};

/// Default capacity of the local subscriber channel.
pub const DEFAULT_BROADCAST_CAPACITY: usize = 256;

/// Outcome of one push round.
#[derive(Debug, Default)]
pub struct PushReport {
    /// Peers a delivery was attempted to.
    pub attempted: usize,
    /// Peers that accepted the delivery.
    pub delivered: usize,
    /// Peers that failed, with the error.
    pub failed: Vec<(PeerAddr, String)>,
}

impl PushReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Fans accepted instances out to peers and local subscribers.
#[derive(Clone)]
pub struct Disseminator {
    transport: Arc<dyn PeerTransport>,
    directory: Arc<dyn PeerDirectory>,
    local_host: String,
    sender: broadcast::Sender<Instance>,
}

impl Disseminator {
    pub fn new(
        transport: Arc<dyn PeerTransport>,
        directory: Arc<dyn PeerDirectory>,
        local_host: impl Into<String>,
        capacity: usize,
    ) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            transport,
            directory,
            local_host: local_host.into(),
            sender,
        }
    }

    /// A new local subscription. Only instances broadcast after this call
    /// are received.
    pub fn subscribe(&self) -> broadcast::Receiver<Instance> {
        self.sender.subscribe()
    }

    /// Publish to local subscribers; returns how many received it.
    pub fn broadcast(&self, instance: &Instance) -> usize {
        // An error only means nobody is listening.
        self.sender.send(instance.clone()).unwrap_or(0)
    }

    /// Push to every peer except the instance's origin and this node.
    pub async fn push(&self, instance: &Instance) -> PushReport {
        let mut report = PushReport::default();

        let peers = match self.directory.peers().await {
            Ok(peers) => peers,
            Err(e) => {
                tracing::warn!(instance = %instance.id, error = %e, "cannot list peers");
                return report;
            }
        };

        let targets: BTreeSet<PeerAddr> = peers
            .into_iter()
            .filter(|p| p.hostname() != instance.origin && p.hostname() != self.local_host)
            .collect();
        if targets.is_empty() {
            return report;
        }

        let document = instance.to_document();
        let deliveries = targets.iter().map(|peer| {
            let document = &document;
            async move { (peer, self.transport.deliver(peer, document).await) }
        });

        for (peer, outcome) in join_all(deliveries).await {
            report.attempted += 1;
            match outcome {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    tracing::warn!(
                        instance = %instance.id,
                        peer = %peer,
                        error = %e,
                        "push to peer failed"
                    );
                    report.failed.push((peer.clone(), e.to_string()));
                }
            }
        }

        tracing::debug!(
            instance = %instance.id,
            attempted = report.attempted,
            delivered = report.delivered,
            "push complete"
        );
        report
    }
}
