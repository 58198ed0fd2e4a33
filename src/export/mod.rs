//! Export module for CSV and JSON export functionality
//!
//! Hands report data (the movement history and the availability table)
//! to outside viewers in CSV or JSON form.

pub mod csv_export;
pub mod json_export;

use serde::{Deserialize, Serialize};

use crate::models::audit::format_timestamp;
use crate::models::{AuditLogEntry, AvailabilityRecord};
use crate::ScanError;

/// Export format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Json,
}

impl std::str::FromStr for ExportFormat {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            _ => Err(ScanError::Export(format!(
                "Invalid export format: {}. Use 'csv' or 'json'",
                s
            ))),
        }
    }
}

impl ExportFormat {
    /// Get file extension for format
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

/// Exportable audit row for CSV/JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportableAuditEntry {
    pub sku: String,
    pub equipment_name: String,
    pub student_id: String,
    pub student_name: String,
    pub date: String,
    pub direction: String,
}

impl From<&AuditLogEntry> for ExportableAuditEntry {
    fn from(entry: &AuditLogEntry) -> Self {
        Self {
            sku: entry.sku.clone(),
            equipment_name: entry.equipment_name.clone(),
            student_id: entry.student_id.clone(),
            student_name: entry.student_name.clone(),
            date: format_timestamp(&entry.timestamp),
            direction: entry.direction.as_str().to_string(),
        }
    }
}

/// Exportable availability row for CSV/JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportableAvailability {
    pub name: String,
    pub location: String,
}

impl From<&AvailabilityRecord> for ExportableAvailability {
    fn from(record: &AvailabilityRecord) -> Self {
        Self {
            name: record.name.clone(),
            location: record.location.as_str().to_string(),
        }
    }
}

/// Generate a timestamped filename for exports
pub fn generate_export_filename(prefix: &str, extension: &str) -> String {
    let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
    format!("{}_{}.{}", prefix, timestamp, extension)
}

pub use csv_export::*;
pub use json_export::*;
