//! Append-only persistence of check results.
//!
//! Sinks never fail past [`ResultSink::record`]: write errors are logged and the
//! cycle carries on.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{error, info};

use super::types::CheckResult;

/// Header row of the durable log
pub const CSV_HEADER: [&str; 5] = ["Timestamp", "URL", "Status", "Response Time (ms)", "Status Code"];

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("log file I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),
}

/// Destination for check results, called once per check in observation order
pub trait ResultSink: Send {
    fn record(&mut self, result: &CheckResult);
}

impl<S: ResultSink + ?Sized> ResultSink for Box<S> {
    fn record(&mut self, result: &CheckResult) {
        (**self).record(result);
    }
}

/// Tabular log, one row per result. Backed by an append-mode file unless built
/// with [`CsvSink::from_writer`].
pub struct CsvSink<W: Write = File> {
    path: PathBuf,
    writer: csv::Writer<W>,
    created: bool,
}

impl CsvSink<File> {
    /// Open `path` for appending, writing the header row only if the file is new or empty
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let created = file.metadata()?.len() == 0;

        let sink = Self::from_writer(path, file, created)?;
        if created {
            info!(path = %sink.path.display(), "Created log file");
        }
        Ok(sink)
    }
}

impl<W: Write> CsvSink<W> {
    /// Log into `writer`; `path` only labels diagnostics
    pub fn from_writer(path: impl Into<PathBuf>, writer: W, write_header: bool) -> Result<Self, SinkError> {
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
        if write_header {
            writer.write_record(CSV_HEADER)?;
            writer.flush()?;
        }

        Ok(Self { path: path.into(), writer, created: write_header })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether this sink wrote the header, i.e. the log did not exist before
    pub fn created(&self) -> bool {
        self.created
    }

    fn append(&mut self, result: &CheckResult) -> Result<(), SinkError> {
        self.writer.write_record(csv_row(result))?;
        // Flush per row so an interrupt never leaves a buffered partial record
        self.writer.flush()?;
        Ok(())
    }
}

impl<W: Write + Send> ResultSink for CsvSink<W> {
    fn record(&mut self, result: &CheckResult) {
        if let Err(e) = self.append(result) {
            error!(
                url = %result.url,
                path = %self.path.display(),
                error = %e,
                "Failed to append check result to log"
            );
        }
    }
}

/// Columns in [`CSV_HEADER`] order
pub fn csv_row(result: &CheckResult) -> [String; 5] {
    [
        result.formatted_timestamp(),
        result.url.clone(),
        result.outcome.to_string(),
        format!("{:.2}", result.latency_ms()),
        result.status.log_label().into_owned(),
    ]
}

/// Forwards every result to each inner sink in insertion order
#[derive(Default)]
pub struct FanoutSink {
    sinks: Vec<Box<dyn ResultSink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: impl ResultSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn push(&mut self, sink: Box<dyn ResultSink>) {
        self.sinks.push(sink);
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl ResultSink for FanoutSink {
    fn record(&mut self, result: &CheckResult) {
        for sink in &mut self.sinks {
            sink.record(result);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitoring::types::Target;
    use chrono::{Local, TimeZone};
    use std::time::Duration;
    use tempfile::tempdir;
    use url::Url;

    fn sample(code: u16) -> CheckResult {
        let target = Target::new(0, Url::parse("https://example.com").unwrap());
        let timestamp = Local.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        CheckResult::responded(&target, timestamp, code, Duration::from_micros(123_456))
    }

    #[test]
    fn test_csv_row_format() {
        let row = csv_row(&sample(200));
        assert_eq!(row, [
            "2024-05-01 12:30:00".to_string(),
            "https://example.com/".to_string(),
            "UP".to_string(),
            "123.46".to_string(),
            "200".to_string(),
        ]);
    }

    /// Writer whose disk is always full
    struct FullDisk;

    impl Write for FullDisk {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("no space left on device"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::other("no space left on device"))
        }
    }

    #[test]
    fn test_write_failure_is_contained() {
        let mut sink = CsvSink::from_writer("full.csv", FullDisk, false).unwrap();

        // Each record logs the failure and returns normally
        sink.record(&sample(200));
        sink.record(&sample(500));

        assert!(matches!(sink.append(&sample(200)), Err(SinkError::Io(_))));
    }

    #[test]
    fn test_header_written_once_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logs").join("uptime_log.csv");

        let mut sink = CsvSink::open(&path).unwrap();
        assert!(sink.created());
        sink.record(&sample(200));
        drop(sink);

        let mut sink = CsvSink::open(&path).unwrap();
        assert!(!sink.created());
        sink.record(&sample(500));
        drop(sink);

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "Timestamp,URL,Status,Response Time (ms),Status Code");
        assert!(lines[1].ends_with(",UP,123.46,200"));
        assert!(lines[2].ends_with(",DOWN,123.46,500"));
    }
}
