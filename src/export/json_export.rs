//! JSON export functionality
//!
//! Wraps exported rows in an envelope carrying the export date and version.

use std::io::Write;
use std::path::Path;

use serde::Serialize;

use super::{ExportableAuditEntry, ExportableAvailability};
use crate::ScanError;

const EXPORT_VERSION: &str = "1.0.0";

/// Complete export structure for JSON
#[derive(Debug, Clone, Serialize)]
pub struct ReportExportJson<T> {
    pub export_date: String,
    pub export_version: &'static str,
    pub total_records: usize,
    pub records: Vec<T>,
}

impl<T: Clone> ReportExportJson<T> {
    fn new(records: &[T]) -> Self {
        Self {
            export_date: chrono::Utc::now().to_rfc3339(),
            export_version: EXPORT_VERSION,
            total_records: records.len(),
            records: records.to_vec(),
        }
    }
}

fn write_json<T: Serialize>(export: &T, path: &Path) -> Result<(), ScanError> {
    let json = serde_json::to_string_pretty(export)
        .map_err(|e| ScanError::Export(format!("Failed to serialize JSON: {}", e)))?;

    let mut file = std::fs::File::create(path)
        .map_err(|e| ScanError::Export(format!("Failed to create JSON file: {}", e)))?;

    file.write_all(json.as_bytes())
        .map_err(|e| ScanError::Export(format!("Failed to write JSON file: {}", e)))?;

    Ok(())
}

/// Write audit entries to JSON format
pub fn write_audit_log_json(entries: &[ExportableAuditEntry], path: &Path) -> Result<(), ScanError> {
    write_json(&ReportExportJson::new(entries), path)
}

/// Write availability records to JSON format
pub fn write_availability_json(
    records: &[ExportableAvailability],
    path: &Path,
) -> Result<(), ScanError> {
    write_json(&ReportExportJson::new(records), path)
}
