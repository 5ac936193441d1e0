//! Inbound result aggregation
//!
//! The aggregator is the single consumer of the connection-handler channel
//! and the sole owner of the accumulated dataset. It keeps pulling results
//! until the expected number of peers have finished cleanly; arrival order
//! does not matter.
//!
//! # Completion
//!
//! ```text
//! clean results observed == expected peers  →  done
//! ```
//!
//! FIN-only results add no records but still count. There is no timeout: a
//! peer that never connects stalls the wait.

use crate::error::ExchangeError;
use crate::exchange::InboundResult;
use crate::record::Record;
use std::collections::HashMap;
use std::net::SocketAddr;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Everything received from peers
#[derive(Debug, Default)]
pub struct Aggregation {
    /// Records from every cleanly terminated peer stream
    pub records: Vec<Record>,
    /// Per-peer clean-termination flag
    pub fin_status: HashMap<SocketAddr, bool>,
    /// Per-peer record count
    pub per_peer: HashMap<SocketAddr, usize>,
}

impl Aggregation {
    /// Number of peers that finished cleanly
    pub fn completed_peers(&self) -> usize {
        self.fin_status.values().filter(|&&clean| clean).count()
    }

    /// Peer addresses in ascending order for stable diagnostics
    pub fn peers(&self) -> Vec<SocketAddr> {
        let mut peers: Vec<SocketAddr> = self.fin_status.keys().copied().collect();
        peers.sort_unstable();
        peers
    }
}

/// Merges connection results from `expected` peers
#[derive(Debug)]
pub struct Aggregator {
    expected: usize,
}

impl Aggregator {
    pub fn new(expected: usize) -> Self {
        Self { expected }
    }

    pub fn expected(&self) -> usize {
        self.expected
    }

    /// Consume results until every expected peer has finished cleanly
    ///
    /// A framing violation reported by any handler ends aggregation with
    /// that error. If every producer goes away first, the wait ends with
    /// [`ExchangeError::ChannelClosed`].
    pub async fn collect(
        self,
        results: &mut mpsc::Receiver<InboundResult>,
    ) -> Result<Aggregation, ExchangeError> {
        let mut aggregation = Aggregation::default();
        let mut completed = 0usize;

        info!(expected = self.expected, "waiting for peers");

        while completed < self.expected {
            let result = match results.recv().await {
                Some(outcome) => outcome?,
                None => {
                    return Err(ExchangeError::ChannelClosed {
                        received: completed,
                        expected: self.expected,
                    })
                }
            };

            aggregation.fin_status.insert(result.peer, result.clean);
            aggregation.per_peer.insert(result.peer, result.records.len());

            if result.clean {
                completed += 1;
                aggregation.records.extend(result.records);
            } else {
                debug!(peer = %result.peer, "unclean result, not counted");
            }

            info!(completed, expected = self.expected, "peer accounted for");
        }

        info!(records = aggregation.records.len(), "aggregation complete");
        Ok(aggregation)
    }
}
