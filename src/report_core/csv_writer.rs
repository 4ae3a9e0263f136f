//! Delimited report writer: `datetime;Volume` header then one row per period

use super::trade::AggregateRecord;
use super::writer_backend::{ReportWriter, ReportWriterError};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_DELIMITER: u8 = b';';
pub const REPORT_HEADER: [&str; 2] = ["datetime", "Volume"];

#[derive(Debug, Clone)]
pub struct CsvReportWriter {
    delimiter: u8,
}

impl Default for CsvReportWriter {
    fn default() -> Self {
        Self::new(DEFAULT_DELIMITER)
    }
}

impl CsvReportWriter {
    pub fn new(delimiter: u8) -> Self {
        Self { delimiter }
    }

    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }

    fn write_to(&self, records: &[AggregateRecord], path: &Path) -> Result<(), ReportWriterError> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(false)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_path(path)?;

        writer.write_record(REPORT_HEADER)?;
        for record in records {
            // f64 Display is locale independent and round-trips
            writer.write_record([record.datetime.as_str(), record.volume.to_string().as_str()])?;
        }
        writer.flush()?;

        Ok(())
    }
}

/// Sibling path the report is staged under before the rename
fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("report"));
    name.push(".tmp");
    path.with_file_name(name)
}

impl ReportWriter for CsvReportWriter {
    fn write_report(&self, records: &[AggregateRecord], path: &Path) -> Result<(), ReportWriterError> {
        let staging = staging_path(path);

        if let Err(e) = self.write_to(records, &staging) {
            let _ = fs::remove_file(&staging);
            log::error!("❌ Failed to write report to {}: {}", path.display(), e);
            return Err(e);
        }

        if let Err(e) = fs::rename(&staging, path) {
            let _ = fs::remove_file(&staging);
            log::error!("❌ Failed to move report into {}: {}", path.display(), e);
            return Err(e.into());
        }

        log::debug!("📝 Wrote {} rows to {}", records.len(), path.display());
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "CSV"
    }
}
