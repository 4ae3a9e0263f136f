//! Writer backend trait for aggregated position reports
//!
//! Defines the interface the scheduler uses to persist a finished report.

use super::trade::AggregateRecord;
use std::path::Path;

#[derive(Debug)]
pub enum ReportWriterError {
    Io(std::io::Error),
    Csv(csv::Error),
}

impl From<std::io::Error> for ReportWriterError {
    fn from(err: std::io::Error) -> Self {
        ReportWriterError::Io(err)
    }
}

impl From<csv::Error> for ReportWriterError {
    fn from(err: csv::Error) -> Self {
        ReportWriterError::Csv(err)
    }
}

impl std::fmt::Display for ReportWriterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportWriterError::Io(e) => write!(f, "IO error: {}", e),
            ReportWriterError::Csv(e) => write!(f, "CSV error: {}", e),
        }
    }
}

impl std::error::Error for ReportWriterError {}

/// Backend trait for writing a report file
pub trait ReportWriter: Send + Sync {
    /// Write `records` to `path`, replacing any existing file.
    /// The parent directory must already exist.
    fn write_report(&self, records: &[AggregateRecord], path: &Path) -> Result<(), ReportWriterError>;

    /// Get backend type for logging
    fn backend_type(&self) -> &'static str;
}
