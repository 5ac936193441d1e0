//! Record sources and sinks
//!
//! The input shard and the sorted output are flat files of back-to-back
//! records with no header.

use super::{records_from_bytes, Record};
use crate::error::RecordError;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Anything that can hand over a node's whole local shard
pub trait RecordSource {
    fn read_all_records(&mut self) -> Result<Vec<Record>, RecordError>;
}

/// Anything that can accept the final sorted record set
pub trait RecordSink {
    fn write_all_records(&mut self, records: &[Record]) -> Result<(), RecordError>;
}

/// Flat record file on disk
#[derive(Debug, Clone)]
pub struct RecordFile {
    path: PathBuf,
}

impl RecordFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSource for RecordFile {
    fn read_all_records(&mut self) -> Result<Vec<Record>, RecordError> {
        let bytes = fs::read(&self.path)?;
        records_from_bytes(&bytes)
    }
}

impl RecordSink for RecordFile {
    fn write_all_records(&mut self, records: &[Record]) -> Result<(), RecordError> {
        let mut writer = BufWriter::new(File::create(&self.path)?);
        for record in records {
            writer.write_all(record.as_bytes())?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl RecordSource for Vec<Record> {
    fn read_all_records(&mut self) -> Result<Vec<Record>, RecordError> {
        Ok(std::mem::take(self))
    }
}

impl RecordSink for Vec<Record> {
    fn write_all_records(&mut self, records: &[Record]) -> Result<(), RecordError> {
        self.extend_from_slice(records);
        Ok(())
    }
}
