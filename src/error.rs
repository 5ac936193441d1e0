//! Typed errors for each component
//!
//! Components return these; the node orchestrator and the binary decide
//! whether a failure ends the run.

use std::net::SocketAddr;

/// Record model and record file errors
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("record must be exactly {expected} bytes, got {len}", expected = crate::RECORD_SIZE)]
    SizeMismatch { len: usize },

    #[error("{len} bytes is not a whole number of {size}-byte records", size = crate::RECORD_SIZE)]
    TrailingBytes { len: usize },

    #[error("record file I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Exchange engine errors (sender, receiver, aggregator)
#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
    #[error("connection refused time out: {addr} after {attempts} attempts")]
    DialExhausted { addr: String, attempts: u32 },

    #[error("non-network error dialing {addr}: {source}")]
    DialFailed {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed writing to {addr}: {source}")]
    SendFailed {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("protocol violation from {peer}: {reason}")]
    ProtocolViolation { peer: SocketAddr, reason: String },

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to accept connection: {0}")]
    Accept(#[source] std::io::Error),

    #[error("inbound channel closed after {received} of {expected} peers completed")]
    ChannelClosed { received: usize, expected: usize },
}

/// Topology validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("topology lists no servers")]
    Empty,

    #[error("node count {0} is not a power of two")]
    NotPowerOfTwo(usize),

    #[error("node count {0} exceeds 256 (routing inspects only the first key byte)")]
    TooManyNodes(usize),

    #[error("server id {0} appears more than once")]
    DuplicateServer(usize),

    #[error("server id {id} is outside [0, {count})")]
    IdOutOfRange { id: usize, count: usize },

    #[error("server id {0} is not in the topology")]
    UnknownServer(usize),

    #[error("server id {id} has invalid port {port:?}")]
    InvalidPort { id: usize, port: String },
}
