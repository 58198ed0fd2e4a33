//! CSV export functionality
//!
//! Provides CSV serialization for the movement history and availability.

use std::path::Path;

use csv::Writer;
use serde::Serialize;

use super::{ExportableAuditEntry, ExportableAvailability};
use crate::ScanError;

fn write_rows_csv<T: Serialize>(rows: &[T], path: &Path) -> Result<(), ScanError> {
    let file = std::fs::File::create(path)
        .map_err(|e| ScanError::Export(format!("Failed to create CSV file: {}", e)))?;

    let mut writer = Writer::from_writer(file);

    // Write headers and data
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| ScanError::Export(format!("Failed to write CSV record: {}", e)))?;
    }

    writer
        .flush()
        .map_err(|e| ScanError::Export(format!("Failed to flush CSV: {}", e)))?;

    Ok(())
}

/// Write audit entries to CSV format
pub fn write_audit_log_csv(entries: &[ExportableAuditEntry], path: &Path) -> Result<(), ScanError> {
    write_rows_csv(entries, path)
}

/// Write availability records to CSV format
pub fn write_availability_csv(
    records: &[ExportableAvailability],
    path: &Path,
) -> Result<(), ScanError> {
    write_rows_csv(records, path)
}
