//! Durable record sinks
//!
//! A sink receives ordered batches of admitted records and must have them on
//! disk before `append_batch` returns. Sinks never retry; any failure is
//! reported to the caller, which owns the batch.

use crate::record::Record;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while persisting a batch
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Record '{identity}' has columns {found:?}, expected {expected:?}")]
    SchemaMismatch {
        identity: String,
        expected: Vec<String>,
        found: Vec<String>,
    },
}

/// Destination for batches of admitted records
pub trait RecordSink: Send {
    /// Appends `records` in order; a no-op for an empty batch
    fn append_batch(&mut self, records: &[Record]) -> Result<(), SinkError>;
}

/// Append-only CSV file sink
///
/// The column order is taken from the first record ever written and reused
/// for every later batch. A header row is written only if the file was
/// missing or empty at the time of the first write.
#[derive(Debug)]
pub struct CsvSink {
    path: PathBuf,
    columns: Option<Vec<String>>,
    rows_written: u64,
}

impl CsvSink {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            columns: None,
            rows_written: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rows appended by this sink (header excluded)
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Column order and header decision for the next batch
    ///
    /// Before the first successful write the order comes from `first` and the
    /// destination is checked for existing content.
    fn layout(&self, first: &Record) -> (Vec<String>, bool) {
        if let Some(columns) = &self.columns {
            return (columns.clone(), false);
        }

        let columns: Vec<String> = first.field_names().map(str::to_string).collect();
        let has_content = std::fs::metadata(&self.path)
            .map(|meta| meta.is_file() && meta.len() > 0)
            .unwrap_or(false);

        tracing::debug!(
            "Using {} columns for {} (existing content: {})",
            columns.len(),
            self.path.display(),
            has_content
        );

        (columns, !has_content)
    }
}

impl RecordSink for CsvSink {
    fn append_batch(&mut self, records: &[Record]) -> Result<(), SinkError> {
        let Some(first) = records.first() else {
            return Ok(());
        };

        let (columns, write_header) = self.layout(first);

        // Reject the whole batch before touching the file
        for record in records {
            if !record.field_names().eq(columns.iter().map(String::as_str)) {
                return Err(SinkError::SchemaMismatch {
                    identity: record.identity(),
                    expected: columns,
                    found: record.field_names().map(str::to_string).collect(),
                });
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if write_header {
            writer.write_record(&columns)?;
        }

        for record in records {
            writer.write_record(record.fields().iter().map(|(_, value)| value.to_string()))?;
        }

        let file: File = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_data()?;

        self.columns.get_or_insert(columns);
        self.rows_written += records.len() as u64;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn record(name: &str, location: &str) -> Record {
        Record::builder("name")
            .text("name", name)
            .text("location", location)
            .build()
            .unwrap()
    }

    fn read_lines(path: &Path) -> Vec<String> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_fresh_file_gets_one_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        let mut sink = CsvSink::new(&path);

        sink.append_batch(&[record("a", "Seattle"), record("b", "")]).unwrap();
        sink.append_batch(&[record("c", "Austin")]).unwrap();

        let lines = read_lines(&path);
        assert_eq!(
            lines,
            vec!["name,location", "a,Seattle", "b,No location", "c,Austin"]
        );
        assert_eq!(sink.rows_written(), 3);
    }

    #[test]
    fn test_existing_file_gets_no_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        std::fs::write(&path, "name,location\nold,Paris\n").unwrap();

        let mut sink = CsvSink::new(&path);
        sink.append_batch(&[record("new", "Rome")]).unwrap();

        let lines = read_lines(&path);
        assert_eq!(lines, vec!["name,location", "old,Paris", "new,Rome"]);
    }

    #[test]
    fn test_empty_existing_file_gets_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        std::fs::File::create(&path).unwrap().flush().unwrap();

        let mut sink = CsvSink::new(&path);
        sink.append_batch(&[record("a", "Oslo")]).unwrap();

        assert_eq!(read_lines(&path), vec!["name,location", "a,Oslo"]);
    }

    #[test]
    fn test_empty_batch_is_noop() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        let mut sink = CsvSink::new(&path);

        sink.append_batch(&[]).unwrap();

        assert!(!path.exists());
        assert_eq!(sink.rows_written(), 0);
    }

    #[test]
    fn test_values_are_quoted_when_needed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        let mut sink = CsvSink::new(&path);

        sink.append_batch(&[record("a", "Seattle, WA")]).unwrap();

        assert_eq!(read_lines(&path)[1], "a,\"Seattle, WA\"");
    }

    #[test]
    fn test_schema_mismatch_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        let mut sink = CsvSink::new(&path);
        sink.append_batch(&[record("a", "Oslo")]).unwrap();

        let other = Record::builder("name")
            .text("name", "b")
            .number("followers", 3)
            .build()
            .unwrap();
        let err = sink.append_batch(&[other]).unwrap_err();

        assert!(matches!(err, SinkError::SchemaMismatch { .. }));
        assert_eq!(read_lines(&path).len(), 2);
    }

    #[test]
    fn test_unwritable_path_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing-dir").join("out.csv");
        let mut sink = CsvSink::new(&path);

        let err = sink.append_batch(&[record("a", "Oslo")]).unwrap_err();
        assert!(matches!(err, SinkError::Io(_)));
    }
}
