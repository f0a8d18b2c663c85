//! Sample sources for the hit pipeline.
//!
//! A source answers one question: "which records were appended since
//! offset P?". The acquisition process owns the log; we only read it.

pub mod csv_log;
pub mod replay;
pub mod types;

pub use csv_log::CsvLogSource;
pub use replay::ReplaySource;
pub use types::{norm, parse_record, parse_timestamp, RecordError, Sample, Vec3, FIELD_COUNT};

use std::path::Path;

/// Records observed by one poll.
#[derive(Debug, Clone, Default)]
pub struct PollBatch {
    /// Well-formed samples beyond the requested offset, in log order
    pub samples: Vec<Sample>,
    /// Offset to pass to the next poll (total records observed)
    pub new_offset: usize,
    /// Records beyond the offset that were dropped as malformed
    pub malformed: usize,
}

impl PollBatch {
    /// A batch with no new records that keeps the caller's offset.
    pub fn empty(offset: usize) -> Self {
        Self {
            samples: Vec::new(),
            new_offset: offset,
            malformed: 0,
        }
    }
}

/// An append-only record log.
pub trait SampleSource: Send {
    /// Read the log and return everything beyond `since_offset`.
    ///
    /// If the log holds fewer records than `since_offset` the source returns
    /// an empty batch that keeps `since_offset`.
    fn poll(&mut self, since_offset: usize) -> Result<PollBatch, SourceError>;

    /// Human-readable description used in diagnostics.
    fn describe(&self) -> String;
}

/// Errors reading a source. All of them are transient from the pipeline's
/// point of view: the next tick retries.
#[derive(Debug)]
pub enum SourceError {
    Io { path: String, message: String },
}

impl SourceError {
    pub(crate) fn io(path: &Path, err: std::io::Error) -> Self {
        SourceError::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceError::Io { path, message } => write!(f, "cannot read {path}: {message}"),
        }
    }
}

impl std::error::Error for SourceError {}

/// Parse the records beyond `since_offset` out of everything observed.
pub(crate) fn collect_batch<S: AsRef<str>>(
    records: &[S],
    since_offset: usize,
    label: &str,
) -> PollBatch {
    let total = records.len();
    if total < since_offset {
        tracing::warn!(
            source = label,
            observed = total,
            offset = since_offset,
            "log shrank below the read offset; keeping offset"
        );
        return PollBatch::empty(since_offset);
    }

    let mut batch = PollBatch {
        samples: Vec::with_capacity(total - since_offset),
        new_offset: total,
        malformed: 0,
    };

    for (i, record) in records[since_offset..].iter().enumerate() {
        match parse_record(record.as_ref()) {
            Ok(sample) => batch.samples.push(sample),
            Err(e) => {
                batch.malformed += 1;
                tracing::warn!(
                    source = label,
                    record = since_offset + i,
                    error = %e,
                    "dropping malformed record"
                );
            }
        }
    }

    batch
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_batch_skips_malformed() {
        let records = [
            "2024-05-01T12:00:00.00,0,0,1,0,0,0",
            "2024-05-01T12:00:00.01,0,0,1",
            "2024-05-01T12:00:00.02,0,0,2,0,0,0",
        ];
        let batch = collect_batch(&records, 0, "test");
        assert_eq!(batch.samples.len(), 2);
        assert_eq!(batch.malformed, 1);
        assert_eq!(batch.new_offset, 3);
        assert_eq!(batch.samples[1].acc[2], 2.0);
    }

    #[test]
    fn test_collect_batch_respects_offset() {
        let records = [
            "2024-05-01T12:00:00.00,0,0,1,0,0,0",
            "2024-05-01T12:00:00.01,0,0,2,0,0,0",
        ];
        let batch = collect_batch(&records, 1, "test");
        assert_eq!(batch.samples.len(), 1);
        assert_eq!(batch.samples[0].acc[2], 2.0);
        assert_eq!(batch.new_offset, 2);
    }

    #[test]
    fn test_collect_batch_shrunk_log_keeps_offset() {
        let records = ["2024-05-01T12:00:00.00,0,0,1,0,0,0"];
        let batch = collect_batch(&records, 5, "test");
        assert!(batch.samples.is_empty());
        assert_eq!(batch.new_offset, 5);
    }
}
