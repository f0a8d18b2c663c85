//! CSV log written by the acquisition process.

use crate::source::{collect_batch, PollBatch, SampleSource, SourceError};
use std::path::{Path, PathBuf};

/// Reads an append-only CSV log from disk on every poll.
#[derive(Debug, Clone)]
pub struct CsvLogSource {
    path: PathBuf,
    has_header: bool,
    complete_lines_only: bool,
}

impl CsvLogSource {
    /// Create a source for a live log with a header row.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            has_header: true,
            complete_lines_only: true,
        }
    }

    /// Whether the first non-blank line is a header row.
    pub fn with_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    /// Also read a final line that has no terminating newline.
    ///
    /// Live logs leave this off: the writer may be halfway through the line.
    pub fn include_partial_lines(mut self) -> Self {
        self.complete_lines_only = false;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every record currently in the log (header and blank lines excluded).
    pub fn read_records(&self) -> Result<Vec<String>, SourceError> {
        let bytes = std::fs::read(&self.path).map_err(|e| SourceError::io(&self.path, e))?;
        let content = String::from_utf8_lossy(&bytes);
        Ok(self.records_in(&content))
    }

    fn records_in(&self, content: &str) -> Vec<String> {
        let body = if self.complete_lines_only {
            match content.rfind('\n') {
                Some(end) => &content[..=end],
                None => "",
            }
        } else {
            content
        };

        let mut lines = body.lines().map(str::trim).filter(|l| !l.is_empty());
        if self.has_header {
            lines.next();
        }
        lines.map(str::to_string).collect()
    }
}

impl SampleSource for CsvLogSource {
    fn poll(&mut self, since_offset: usize) -> Result<PollBatch, SourceError> {
        let records = self.read_records()?;
        Ok(collect_batch(&records, since_offset, &self.describe()))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HEADER: &str = "Timestamp,acc_x,acc_y,acc_z,GyroX,GyroY,GyroZ\n";

    fn write_log(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_header_and_blank_lines_are_not_records() {
        let file = write_log(&format!(
            "{HEADER}2024-05-01T12:00:00,0,0,1,0,0,0\n\n2024-05-01T12:00:01,0,0,2,0,0,0\n"
        ));
        let mut source = CsvLogSource::new(file.path());
        let batch = source.poll(0).unwrap();
        assert_eq!(batch.samples.len(), 2);
        assert_eq!(batch.new_offset, 2);
    }

    #[test]
    fn test_partial_trailing_line_waits() {
        let file = write_log(&format!(
            "{HEADER}2024-05-01T12:00:00,0,0,1,0,0,0\n2024-05-01T12:00:01,0,0"
        ));
        let mut source = CsvLogSource::new(file.path());
        let batch = source.poll(0).unwrap();
        assert_eq!(batch.new_offset, 1);
        assert_eq!(batch.malformed, 0);

        let mut replay = CsvLogSource::new(file.path()).include_partial_lines();
        let batch = replay.poll(0).unwrap();
        assert_eq!(batch.new_offset, 2);
        assert_eq!(batch.malformed, 1);
    }

    #[test]
    fn test_incremental_polls() {
        let mut file = write_log(&format!("{HEADER}2024-05-01T12:00:00,0,0,1,0,0,0\n"));
        let mut source = CsvLogSource::new(file.path());

        let first = source.poll(0).unwrap();
        assert_eq!(first.samples.len(), 1);

        file.write_all(b"2024-05-01T12:00:01,0,0,2,0,0,0\n2024-05-01T12:00:02,0,0,3,0,0,0\n")
            .unwrap();
        file.flush().unwrap();

        let second = source.poll(first.new_offset).unwrap();
        assert_eq!(second.samples.len(), 2);
        assert_eq!(second.samples[0].acc[2], 2.0);
        assert_eq!(second.new_offset, 3);

        let third = source.poll(second.new_offset).unwrap();
        assert!(third.samples.is_empty());
        assert_eq!(third.new_offset, 3);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = CsvLogSource::new(dir.path().join("absent.csv"));
        assert!(source.poll(0).is_err());
    }

    #[test]
    fn test_headerless_log() {
        let file = write_log("2024-05-01T12:00:00,0,0,1,0,0,0\n");
        let mut source = CsvLogSource::new(file.path()).with_header(false);
        assert_eq!(source.poll(0).unwrap().samples.len(), 1);
    }
}
