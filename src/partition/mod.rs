//! Key-range partitioner
//!
//! Routes every record to the node that owns its key range. Only the first
//! key byte is inspected: with `n` nodes (a power of two, at most 256) the
//! top `log2(n)` bits of that byte select the destination.
//!
//! ```text
//! shift       = 8 - log2(node_count)
//! destination = key[0] >> shift
//! ```
//!
//! Every node must run with the same `node_count` and the same id space
//! `[0, node_count)`; nothing checks this across nodes.

use crate::error::ConfigError;
use crate::record::Record;
use std::collections::HashMap;

/// Destination node id → records routed to it
pub type BucketMap = HashMap<usize, Vec<Record>>;

/// Largest cluster the single-byte routing scheme can address
pub const MAX_NODES: usize = 256;

/// Right-shift applied to the leading key byte for a given cluster size
pub fn routing_shift(node_count: usize) -> Result<u32, ConfigError> {
    if node_count == 0 {
        return Err(ConfigError::Empty);
    }
    if node_count > MAX_NODES {
        return Err(ConfigError::TooManyNodes(node_count));
    }
    if !node_count.is_power_of_two() {
        return Err(ConfigError::NotPowerOfTwo(node_count));
    }

    Ok(8 - node_count.trailing_zeros())
}

/// Owning node for a single record
#[inline]
pub fn destination(record: &Record, shift: u32) -> usize {
    // A shift of 8 (single node) would overflow a u8 shift.
    (u16::from(record.leading_byte()) >> shift) as usize
}

/// Split a shard into per-destination buckets
///
/// Nodes that receive nothing are absent from the map.
pub fn partition(records: &[Record], node_count: usize) -> Result<BucketMap, ConfigError> {
    let shift = routing_shift(node_count)?;
    let mut buckets = BucketMap::new();

    for record in records {
        buckets
            .entry(destination(record, shift))
            .or_default()
            .push(*record);
    }

    Ok(buckets)
}
