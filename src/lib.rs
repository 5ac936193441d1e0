//! netsort - Distributed external sort over a static cluster
//!
//! Every node in the cluster holds a shard of fixed-size 100-byte records.
//! Nodes partition their shard by key range, exchange buckets with every
//! other node over plain TCP streams, then sort what they own and write it out.
//!
//! # Architecture
//!
//! - **Record model**: fixed binary layout and key ordering
//! - **Partitioner**: leading-key-byte routing to an owning node
//! - **Exchange**: sentinel-terminated wire protocol, sender, receiver, aggregator
//! - **Sort engine**: in-place partition-exchange sort by key
//! - **Node**: the orchestrator that sequences one node's run

pub mod config;
pub mod error;
pub mod exchange;
pub mod node;
pub mod partition;
pub mod record;
pub mod sort;

// Re-export commonly used types
pub use config::Config;
pub use error::{ConfigError, ExchangeError, RecordError};
pub use record::{Record, KEY_SIZE, RECORD_SIZE, SENTINEL, VALUE_SIZE};

/// Result type used throughout netsort
pub type Result<T> = anyhow::Result<T>;
