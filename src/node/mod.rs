//! Node orchestration
//!
//! Sequences one node's run:
//!
//! ```text
//! PARTITIONED → LISTENING → BROADCASTING → AGGREGATING → MERGED → SORTED → WRITTEN
//! ```
//!
//! Listening starts before the warm-up delay and keeps running while this
//! node broadcasts, so peers can deliver whenever they are ready. A
//! single-node cluster skips the three network phases.
//!
//! Every component reports typed errors; this layer attaches context and
//! returns them so the binary can exit non-zero with nothing written.

use crate::config::Config;
use crate::error::ExchangeError;
use crate::exchange::{broadcast, Aggregation, Aggregator, DialPolicy, Receiver, Sender};
use crate::partition::{partition, BucketMap};
use crate::record::{Record, RecordSink, RecordSource};
use crate::sort::sort_records;
use anyhow::{Context, Result};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::sleep;
use tracing::{debug, info};

/// Orchestrator phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Partitioned,
    Listening,
    Broadcasting,
    Aggregating,
    Merged,
    Sorted,
    Written,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Partitioned => "PARTITIONED",
            Phase::Listening => "LISTENING",
            Phase::Broadcasting => "BROADCASTING",
            Phase::Aggregating => "AGGREGATING",
            Phase::Merged => "MERGED",
            Phase::Sorted => "SORTED",
            Phase::Written => "WRITTEN",
        };
        f.write_str(name)
    }
}

/// Outcome of a completed run
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Records read from the local shard
    pub shard_records: usize,
    /// Records from the shard that stayed on this node
    pub kept_records: usize,
    /// Records received from peers
    pub received_records: usize,
    /// Records written to the sink
    pub output_records: usize,
    /// Phases entered, in order
    pub phases: Vec<Phase>,
    /// Peer diagnostics (empty for a single-node cluster)
    pub aggregation: Aggregation,
}

impl RunSummary {
    fn enter(&mut self, phase: Phase) {
        info!(%phase, "entering phase");
        self.phases.push(phase);
    }
}

/// One cluster member
pub struct SortNode {
    config: Arc<Config>,
    local_id: usize,
}

impl SortNode {
    /// Create a node; the configuration must already be validated
    pub fn new(config: Arc<Config>, local_id: usize) -> Result<Self> {
        if config.server(local_id).is_none() {
            anyhow::bail!("server id {} is not in the topology", local_id);
        }

        Ok(Self { config, local_id })
    }

    pub fn local_id(&self) -> usize {
        self.local_id
    }

    /// Run the full pipeline from `source` to `sink`
    pub async fn run<S, K>(&self, source: &mut S, sink: &mut K) -> Result<RunSummary>
    where
        S: RecordSource,
        K: RecordSink,
    {
        let shard = source
            .read_all_records()
            .context("Failed to read input shard")?;

        let (sorted, mut summary) = self.sort_cluster_wide(shard).await?;

        sink.write_all_records(&sorted)
            .context("Failed to write sorted output")?;
        summary.output_records = sorted.len();
        summary.enter(Phase::Written);

        Ok(summary)
    }

    /// Partition, exchange, merge and sort; returns this node's key range
    pub async fn sort_cluster_wide(&self, shard: Vec<Record>) -> Result<(Vec<Record>, RunSummary)> {
        let node_count = self.config.node_count();
        let mut summary = RunSummary {
            shard_records: shard.len(),
            ..Default::default()
        };

        let mut buckets = partition(&shard, node_count).context("Failed to partition shard")?;
        drop(shard);
        for (dest, bucket) in sorted_buckets(&buckets) {
            debug!(dest, records = bucket, "bucket built");
        }
        summary.enter(Phase::Partitioned);

        let local = buckets.remove(&self.local_id).unwrap_or_default();
        summary.kept_records = local.len();

        let mut records = if node_count == 1 {
            info!("single-node cluster, skipping exchange");
            local
        } else {
            let aggregation = self.exchange(buckets, &mut summary).await?;
            summary.received_records = aggregation.records.len();

            let mut merged = aggregation.records;
            merged.extend(local);
            summary.aggregation = Aggregation {
                records: Vec::new(),
                fin_status: aggregation.fin_status,
                per_peer: aggregation.per_peer,
            };
            summary.enter(Phase::Merged);
            merged
        };

        sort_records(&mut records);
        summary.enter(Phase::Sorted);
        info!(records = records.len(), "sorted local key range");

        Ok((records, summary))
    }

    /// Listen, broadcast, and wait for every peer
    ///
    /// A broadcast failure ends the wait at once instead of leaving this
    /// node blocked on peers. The broadcast must also have finished cleanly
    /// before this returns.
    async fn exchange(&self, buckets: BucketMap, summary: &mut RunSummary) -> Result<Aggregation> {
        let exchange = &self.config.exchange;
        let local = self
            .config
            .server(self.local_id)
            .context("local server missing from topology")?;

        let receiver = Receiver::bind(&exchange.bind_host, local.port)
            .await
            .context("Failed to start listener")?;
        let (tx, mut rx) = mpsc::channel(exchange.channel_capacity);
        let accept_loop = receiver.spawn(tx);
        summary.enter(Phase::Listening);

        let mut broadcast_task = self.spawn_broadcast(buckets);
        summary.enter(Phase::Broadcasting);

        let expected = self.config.node_count() - 1;
        let aggregate = Aggregator::new(expected).collect(&mut rx);
        tokio::pin!(aggregate);
        summary.enter(Phase::Aggregating);

        let mut broadcast_done = false;
        let outcome = loop {
            tokio::select! {
                result = &mut aggregate => {
                    break result.context("Failed to aggregate peer records");
                }
                joined = &mut broadcast_task, if !broadcast_done => {
                    match broadcast_outcome(joined) {
                        Ok(()) => broadcast_done = true,
                        Err(e) => break Err(e),
                    }
                }
            }
        };
        accept_loop.abort();
        let aggregation = outcome?;

        if !broadcast_done {
            broadcast_outcome(broadcast_task.await)?;
        }

        Ok(aggregation)
    }

    /// Warm up, then send every peer its bucket on a separate task
    fn spawn_broadcast(&self, buckets: BucketMap) -> JoinHandle<Result<(), ExchangeError>> {
        let config = Arc::clone(&self.config);
        let local_id = self.local_id;
        let sender = Sender::new(DialPolicy::from_config(&config));
        let warmup = config.exchange.warmup();

        tokio::spawn(async move {
            if !warmup.is_zero() {
                debug!(warmup_ms = warmup.as_millis() as u64, "waiting for peers to start listening");
                sleep(warmup).await;
            }
            broadcast(&config, local_id, &buckets, sender).await
        })
    }
}

fn broadcast_outcome(joined: Result<Result<(), ExchangeError>, JoinError>) -> Result<()> {
    joined
        .context("broadcast task panicked")?
        .context("broadcast error")
}

/// `(destination, bucket size)` in destination order
fn sorted_buckets(buckets: &BucketMap) -> Vec<(usize, usize)> {
    let mut sizes: Vec<(usize, usize)> = buckets.iter().map(|(&d, b)| (d, b.len())).collect();
    sizes.sort_unstable();
    sizes
}
