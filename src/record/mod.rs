//! Record model
//!
//! A record is a fixed 100-byte block: a 10-byte sort key followed by a
//! 90-byte opaque payload. Keys compare byte-wise, unsigned, lexicographically.
//!
//! # Layout
//!
//! ```text
//! [10 bytes: key][90 bytes: value]
//! ```
//!
//! The all-zero record doubles as the end-of-stream sentinel on the wire,
//! so a genuine all-zero record cannot be exchanged between nodes.

pub mod file;

pub use file::{RecordFile, RecordSink, RecordSource};

use crate::error::RecordError;
use std::cmp::Ordering;
use std::fmt;

/// Size of the sort key prefix in bytes
pub const KEY_SIZE: usize = 10;

/// Size of the opaque payload in bytes
pub const VALUE_SIZE: usize = 90;

/// Size of a full record in bytes
pub const RECORD_SIZE: usize = KEY_SIZE + VALUE_SIZE;

/// End-of-stream marker: `RECORD_SIZE` zero bytes
pub const SENTINEL: Record = Record([0u8; RECORD_SIZE]);

/// Fixed-size binary record
///
/// Equality compares every byte; ordering for sorting is by key only
/// (see [`Record::cmp_key`]), which is why `Ord` is not implemented.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Record([u8; RECORD_SIZE]);

impl Record {
    /// Wrap an owned 100-byte block
    pub const fn new(bytes: [u8; RECORD_SIZE]) -> Self {
        Self(bytes)
    }

    /// Copy a record out of a slice that must be exactly `RECORD_SIZE` bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self, RecordError> {
        let block: [u8; RECORD_SIZE] = bytes
            .try_into()
            .map_err(|_| RecordError::SizeMismatch { len: bytes.len() })?;
        Ok(Self(block))
    }

    /// Build a record from a key and a payload
    pub fn from_parts(key: [u8; KEY_SIZE], value: [u8; VALUE_SIZE]) -> Self {
        let mut block = [0u8; RECORD_SIZE];
        block[..KEY_SIZE].copy_from_slice(&key);
        block[KEY_SIZE..].copy_from_slice(&value);
        Self(block)
    }

    #[inline]
    pub fn key(&self) -> &[u8] {
        &self.0[..KEY_SIZE]
    }

    #[inline]
    pub fn value(&self) -> &[u8] {
        &self.0[KEY_SIZE..]
    }

    /// First key byte, the only byte the partitioner inspects
    #[inline]
    pub fn leading_byte(&self) -> u8 {
        self.0[0]
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8; RECORD_SIZE] {
        &self.0
    }

    /// True when this record is bit-identical to the sentinel
    pub fn is_sentinel(&self) -> bool {
        *self == SENTINEL
    }

    /// Compare two records by key (unsigned, lexicographic)
    #[inline]
    pub fn cmp_key(&self, other: &Record) -> Ordering {
        self.key().cmp(other.key())
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Record(key=")?;
        for byte in self.key() {
            write!(f, "{:02X}", byte)?;
        }
        write!(f, ", value={}B)", VALUE_SIZE)
    }
}

/// Split a byte buffer into records
///
/// The buffer must hold a whole number of records.
pub fn records_from_bytes(bytes: &[u8]) -> Result<Vec<Record>, RecordError> {
    if bytes.len() % RECORD_SIZE != 0 {
        return Err(RecordError::TrailingBytes { len: bytes.len() });
    }

    bytes
        .chunks_exact(RECORD_SIZE)
        .map(Record::from_slice)
        .collect()
}

#[cfg(test)]
pub(crate) fn record_with_key(key: &[u8]) -> Record {
    let mut block = [0xAB; RECORD_SIZE];
    block[..KEY_SIZE].fill(0);
    block[..key.len()].copy_from_slice(key);
    Record::new(block)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sizes() {
        assert_eq!(RECORD_SIZE, 100);
        assert_eq!(SENTINEL.as_bytes().len(), RECORD_SIZE);
        assert!(SENTINEL.is_sentinel());
    }

    #[test]
    fn test_from_slice_rejects_wrong_length() {
        assert!(Record::from_slice(&[0u8; 99]).is_err());
        assert!(Record::from_slice(&[0u8; 101]).is_err());
        assert!(Record::from_slice(&[1u8; 100]).is_ok());
    }

    #[test]
    fn test_key_and_value_split() {
        let record = Record::from_parts([7u8; KEY_SIZE], [9u8; VALUE_SIZE]);
        assert_eq!(record.key(), &[7u8; KEY_SIZE]);
        assert_eq!(record.value(), &[9u8; VALUE_SIZE]);
        assert_eq!(record.leading_byte(), 7);
        assert!(!record.is_sentinel());
    }

    #[test]
    fn test_cmp_key_is_unsigned_lexicographic() {
        let low = record_with_key(&[0x10, 0xFF]);
        let high = record_with_key(&[0x90, 0x00]);
        assert_eq!(low.cmp_key(&high), Ordering::Less);
        assert_eq!(high.cmp_key(&low), Ordering::Greater);
        assert_eq!(low.cmp_key(&low), Ordering::Equal);
    }

    #[test]
    fn test_cmp_key_ignores_value() {
        let a = Record::from_parts([3u8; KEY_SIZE], [0u8; VALUE_SIZE]);
        let b = Record::from_parts([3u8; KEY_SIZE], [1u8; VALUE_SIZE]);
        assert_eq!(a.cmp_key(&b), Ordering::Equal);
        assert_ne!(a, b);
    }

    #[test]
    fn test_records_from_bytes() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(record_with_key(&[1]).as_bytes());
        bytes.extend_from_slice(record_with_key(&[2]).as_bytes());

        let records = records_from_bytes(&bytes).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].leading_byte(), 2);

        assert!(records_from_bytes(&[]).unwrap().is_empty());
        assert!(matches!(
            records_from_bytes(&bytes[..150]),
            Err(RecordError::TrailingBytes { len: 150 })
        ));
    }

    #[test]
    fn test_debug_shows_hex_key() {
        let record = record_with_key(&[0xDE, 0xAD]);
        let text = format!("{:?}", record);
        assert!(text.starts_with("Record(key=DEAD"));
    }
}
