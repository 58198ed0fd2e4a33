//! Kitcheck - equipment loan tracking backend
//!
//! This library provides the scan-session engine for tracking equipment
//! loaned to students. It handles:
//! - SQLite storage of the catalog, roster, availability and audit log
//! - Per-scan validation and staging of check-in/check-out sessions
//! - All-or-nothing resolution of kits (a main item plus its parts)
//! - Atomic commit of a session into availability and the audit log
//! - Export of report data

pub mod clock;
pub mod commit;
pub mod config;
pub mod db;
pub mod engine;
pub mod export;
pub mod import;
pub mod models;
pub mod session;

use serde::{Deserialize, Serialize};

pub use engine::Engine;
pub use session::{ScanOutcome, SessionHandle};

use models::{Direction, Location};

/// Error type for engine operations
///
/// Validation failures leave the session untouched; the caller may prompt
/// for a corrective scan. Only `CommitFailed` concerns durable state and it
/// guarantees nothing was written.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("No matching student found: {0}")]
    UnknownStudent(String),

    #[error("No equipment found for barcode {0}")]
    UnknownEquipment(String),

    #[error("Barcode {0} was already scanned in this session")]
    DuplicateScan(String),

    #[error("Item {name} ({sku}) cannot be used for {}: currently {}", .direction.display_name(), .location.map(|l| l.as_str()).unwrap_or("untracked"))]
    WrongDirection {
        sku: String,
        name: String,
        direction: Direction,
        location: Option<Location>,
    },

    #[error("Barcode {0} is part of a kit; scan the kit first")]
    OrphanPart(String),

    #[error("Barcode {sku} is not part of kit {kit_sku}")]
    NotInThisKit { sku: String, kit_sku: String },

    #[error("Kit {open_kit} is still open; finish it before scanning kit {sku}")]
    KitAlreadyOpen { sku: String, open_kit: String },

    #[error("Kit {kit_sku} is incomplete, missing: {}", .remaining.join(", "))]
    IncompleteKit { kit_sku: String, remaining: Vec<String> },

    #[error("Commit failed: {0}")]
    CommitFailed(#[source] db::DbError),

    #[error("Kit {0} has no parts in the catalog")]
    KitWithoutParts(String),

    #[error("Unknown session: {0}")]
    UnknownSession(SessionHandle),

    #[error("Another scan session is open: {0}")]
    SessionBusy(SessionHandle),

    #[error("Session {0} is closed and waiting for commit")]
    SessionClosed(SessionHandle),

    #[error("Invalid catalog: {0}")]
    InvalidCatalog(String),

    #[error("Database error: {0}")]
    Storage(#[from] db::DbError),

    #[error("Export error: {0}")]
    Export(String),
}

impl ScanError {
    /// Kind of the error, enough to pick a user-facing message
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownStudent(_) => ErrorKind::UnknownStudent,
            Self::UnknownEquipment(_) => ErrorKind::UnknownEquipment,
            Self::DuplicateScan(_) => ErrorKind::DuplicateScan,
            Self::WrongDirection { .. } => ErrorKind::WrongDirection,
            Self::OrphanPart(_) => ErrorKind::OrphanPart,
            Self::NotInThisKit { .. } => ErrorKind::NotInThisKit,
            Self::KitAlreadyOpen { .. } => ErrorKind::KitAlreadyOpen,
            Self::IncompleteKit { .. } => ErrorKind::IncompleteKit,
            Self::CommitFailed(_) => ErrorKind::CommitFailed,
            Self::KitWithoutParts(_) => ErrorKind::KitWithoutParts,
            Self::UnknownSession(_) => ErrorKind::UnknownSession,
            Self::SessionBusy(_) => ErrorKind::SessionBusy,
            Self::SessionClosed(_) => ErrorKind::SessionClosed,
            Self::InvalidCatalog(_) => ErrorKind::InvalidCatalog,
            Self::Storage(_) => ErrorKind::Storage,
            Self::Export(_) => ErrorKind::Export,
        }
    }
}

// Implement serialization for frontends
impl Serialize for ScanError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Error kinds, one per distinct user-facing message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnknownStudent,
    UnknownEquipment,
    DuplicateScan,
    WrongDirection,
    OrphanPart,
    NotInThisKit,
    KitAlreadyOpen,
    IncompleteKit,
    CommitFailed,
    KitWithoutParts,
    UnknownSession,
    SessionBusy,
    SessionClosed,
    InvalidCatalog,
    Storage,
    Export,
}

impl ErrorKind {
    /// Message shown to the person at the scanner
    pub fn message(&self) -> &'static str {
        match self {
            Self::UnknownStudent => "No matching student found.",
            Self::UnknownEquipment => "No equipment found.",
            Self::DuplicateScan => "Same barcode scanned.",
            Self::WrongDirection => "Item is not available for this action.",
            Self::OrphanPart => "Scanned item is a part of a kit.",
            Self::NotInThisKit => "Barcode is not part of the kit.",
            Self::KitAlreadyOpen => "Finish scanning the open kit first.",
            Self::IncompleteKit => "Scan the remaining kit parts before finishing.",
            Self::CommitFailed => "Could not save the scanned items. Please try again.",
            Self::KitWithoutParts => "No kit parts found for kit.",
            Self::UnknownSession => "This scan session no longer exists.",
            Self::SessionBusy => "Another scan session is still open.",
            Self::SessionClosed => "This scan session is already finished.",
            Self::InvalidCatalog => "The equipment or student list is invalid.",
            Self::Storage => "The database could not be read.",
            Self::Export => "The report could not be exported.",
        }
    }

    /// Get all error kinds
    pub fn all() -> Vec<ErrorKind> {
        vec![
            Self::UnknownStudent,
            Self::UnknownEquipment,
            Self::DuplicateScan,
            Self::WrongDirection,
            Self::OrphanPart,
            Self::NotInThisKit,
            Self::KitAlreadyOpen,
            Self::IncompleteKit,
            Self::CommitFailed,
            Self::KitWithoutParts,
            Self::UnknownSession,
            Self::SessionBusy,
            Self::SessionClosed,
            Self::InvalidCatalog,
            Self::Storage,
            Self::Export,
        ]
    }
}

// ============================================================================
// Logging
// ============================================================================

/// Install the global fmt subscriber.
///
/// Unknown levels fall back to INFO. Calling this more than once is harmless.
pub fn init_tracing(level: &str) {
    let level = level
        .parse::<tracing::Level>()
        .unwrap_or(tracing::Level::INFO);

    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_error_kind_messages_are_distinct() {
        let messages: HashSet<&str> = ErrorKind::all().iter().map(|k| k.message()).collect();
        assert_eq!(messages.len(), ErrorKind::all().len());
    }

    #[test]
    fn test_error_kind_mapping() {
        let err = ScanError::NotInThisKit {
            sku: "A1".to_string(),
            kit_sku: "K1".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::NotInThisKit);
        assert_eq!(err.to_string(), "Barcode A1 is not part of kit K1");

        let err = ScanError::IncompleteKit {
            kit_sku: "K1".to_string(),
            remaining: vec!["P1".to_string(), "P2".to_string()],
        };
        assert_eq!(err.to_string(), "Kit K1 is incomplete, missing: P1, P2");
    }

    #[test]
    fn test_wrong_direction_message() {
        let err = ScanError::WrongDirection {
            sku: "A1".to_string(),
            name: "Drill".to_string(),
            direction: Direction::CheckOut,
            location: Some(Location::Out),
        };
        assert_eq!(
            err.to_string(),
            "Item Drill (A1) cannot be used for Check-out: currently out"
        );
    }

    #[test]
    fn test_error_serializes_as_message() {
        let err = ScanError::DuplicateScan("A1".to_string());
        let json = serde_json::to_string(&err).unwrap();
        assert_eq!(json, "\"Barcode A1 was already scanned in this session\"");
    }

    #[test]
    fn test_init_tracing_twice() {
        init_tracing("debug");
        init_tracing("not-a-level");
    }
}
