//! Exchange wire protocol
//!
//! A stream carries zero or more records back to back followed by exactly
//! one sentinel, then the sender closes its side. There is no length prefix,
//! handshake, or acknowledgement.
//!
//! # Stream Layout
//!
//! ```text
//! [100 bytes: record 0][100 bytes: record 1]...[100 bytes: all-zero sentinel]<EOF>
//! ```
//!
//! A stream holding only the sentinel is "FIN-only": the peer had nothing
//! for this node but still counts as finished.

use crate::record::{records_from_bytes, Record, RECORD_SIZE, SENTINEL};
use std::net::SocketAddr;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Parsed outcome of draining one inbound connection
#[derive(Debug, Clone)]
pub struct ConnectionResult {
    /// Remote address of the sending peer
    pub peer: SocketAddr,
    /// Records carried before the sentinel
    pub records: Vec<Record>,
    /// True iff the stream ended with the sentinel
    pub clean: bool,
}

impl ConnectionResult {
    /// FIN-only stream: clean and empty
    pub fn is_fin_only(&self) -> bool {
        self.clean && self.records.is_empty()
    }
}

/// Why a drained stream does not satisfy the framing rules
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FramingError {
    /// Fewer bytes than one sentinel
    TooShort { len: usize },
    /// Last block is not the sentinel
    MissingSentinel { len: usize },
    /// Payload before the sentinel is not a whole number of records
    PartialRecord { len: usize },
}

impl std::fmt::Display for FramingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FramingError::TooShort { len } => {
                write!(f, "didn't receive FIN: stream is {} bytes", len)
            }
            FramingError::MissingSentinel { len } => {
                write!(f, "didn't receive FIN: last block of {}-byte stream is not the sentinel", len)
            }
            FramingError::PartialRecord { len } => {
                write!(f, "payload of {} bytes is not a whole number of records", len)
            }
        }
    }
}

/// Serialize a bucket into its full wire form
pub fn encode_stream(records: &[Record]) -> Vec<u8> {
    let mut buf = Vec::with_capacity((records.len() + 1) * RECORD_SIZE);
    for record in records {
        buf.extend_from_slice(record.as_bytes());
    }
    buf.extend_from_slice(SENTINEL.as_bytes());
    buf
}

/// Validate a drained stream and split it into records
///
/// The trailing sentinel is stripped; everything before it must be whole
/// records.
pub fn decode_stream(buf: &[u8]) -> Result<Vec<Record>, FramingError> {
    if buf.len() < RECORD_SIZE {
        return Err(FramingError::TooShort { len: buf.len() });
    }

    let (payload, tail) = buf.split_at(buf.len() - RECORD_SIZE);
    if tail != SENTINEL.as_bytes() {
        return Err(FramingError::MissingSentinel { len: buf.len() });
    }

    records_from_bytes(payload).map_err(|_| FramingError::PartialRecord { len: payload.len() })
}

/// Write every record then the sentinel
///
/// Records go out in the order given. The caller closes the stream.
pub async fn write_stream<W>(writer: &mut W, records: &[Record]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    for record in records {
        writer.write_all(record.as_bytes()).await?;
    }
    writer.write_all(SENTINEL.as_bytes()).await?;
    writer.flush().await
}

/// Read a stream until the peer closes it
///
/// A read error other than end-of-stream stops the loop; the bytes read so
/// far are returned with the error so framing can still be judged on them.
pub async fn read_to_close<R>(reader: &mut R) -> (Vec<u8>, Option<std::io::Error>)
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    let mut chunk = [0u8; 64 * RECORD_SIZE];

    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => return (buf, None),
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
            Err(e) => return (buf, Some(e)),
        }
    }
}
