//! Record exchange between nodes
//!
//! Each directed node pair uses one TCP connection carrying one bucket.
//!
//! # Modules
//!
//! - `protocol`: stream framing (records followed by one sentinel)
//! - `sender`: dial with bounded retry, stream a bucket, send the sentinel
//! - `receiver`: accept peers, drain each connection, validate framing
//! - `aggregator`: merge connection results until every peer is accounted for

pub mod aggregator;
pub mod protocol;
pub mod receiver;
pub mod sender;

pub use aggregator::{Aggregation, Aggregator};
pub use protocol::ConnectionResult;
pub use receiver::Receiver;
pub use sender::{broadcast, DialPolicy, Sender};

/// What a connection handler hands to the aggregator
pub type InboundResult = Result<ConnectionResult, crate::error::ExchangeError>;
