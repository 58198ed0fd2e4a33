//! Audit log types
//!
//! Direction of a movement and the immutable record written per scanned SKU

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::equipment::Location;

/// Direction of a scan session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    CheckIn,
    CheckOut,
}

impl Direction {
    /// Location an item must currently be at for this direction to accept it
    pub fn required_location(&self) -> Location {
        match self {
            Self::CheckIn => Location::Out,
            Self::CheckOut => Location::In,
        }
    }

    /// Location every touched equipment name ends up at after commit
    pub fn target_location(&self) -> Location {
        match self {
            Self::CheckIn => Location::In,
            Self::CheckOut => Location::Out,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CheckIn => "check_in",
            Self::CheckOut => "check_out",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "check_in" | "checkin" | "in" => Some(Self::CheckIn),
            "check_out" | "checkout" | "out" => Some(Self::CheckOut),
            _ => None,
        }
    }

    /// Display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::CheckIn => "Check-in",
            Self::CheckOut => "Check-out",
        }
    }
}

/// One committed movement of one SKU
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub sku: String,
    pub equipment_name: String,
    pub student_id: String,
    pub student_name: String,
    /// Acceptance time of the scan, not the commit time
    pub timestamp: DateTime<Utc>,
    pub direction: Direction,
}

/// Format a timestamp the way it is persisted (sortable as text)
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a persisted timestamp
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
