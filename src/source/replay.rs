//! Replays a recorded log through the live pipeline, one batch per poll.

use crate::source::{collect_batch, CsvLogSource, PollBatch, SampleSource, SourceError};
use std::path::Path;

/// A fixed set of records revealed `batch_size` at a time.
///
/// Each poll behaves as though the acquisition process had appended one more
/// batch since the previous poll.
#[derive(Debug, Clone)]
pub struct ReplaySource {
    label: String,
    records: Vec<String>,
    batch_size: usize,
    revealed: usize,
}

impl ReplaySource {
    /// Load every record of a recorded log file.
    pub fn from_path(
        path: &Path,
        has_header: bool,
        batch_size: usize,
    ) -> Result<Self, SourceError> {
        let records = CsvLogSource::new(path)
            .with_header(has_header)
            .include_partial_lines()
            .read_records()?;
        Ok(Self::from_records(
            path.display().to_string(),
            records,
            batch_size,
        ))
    }

    /// Build a replay source from in-memory records.
    pub fn from_records(label: impl Into<String>, records: Vec<String>, batch_size: usize) -> Self {
        Self {
            label: label.into(),
            records,
            batch_size: batch_size.max(1),
            revealed: 0,
        }
    }

    /// True once every record has been revealed.
    pub fn is_exhausted(&self) -> bool {
        self.revealed >= self.records.len()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl SampleSource for ReplaySource {
    fn poll(&mut self, since_offset: usize) -> Result<PollBatch, SourceError> {
        self.revealed = (self.revealed + self.batch_size).min(self.records.len());
        Ok(collect_batch(
            &self.records[..self.revealed],
            since_offset,
            &self.label,
        ))
    }

    fn describe(&self) -> String {
        format!("replay:{}", self.label)
    }
}
