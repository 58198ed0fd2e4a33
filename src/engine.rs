//! Engine facade
//!
//! Everything the interactive workflow calls: opening a session for a
//! verified student, feeding it barcodes, closing (which commits) or
//! cancelling it, plus roster imports and report reads.
//!
//! Sessions live in a small table keyed by [`SessionHandle`]. The store
//! serves one open session at a time; a second `open_session` fails with
//! `SessionBusy` until the first is committed or cancelled.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;

use crate::clock::{Clock, SystemClock};
use crate::commit::{self, CommitResult};
use crate::config::EngineConfig;
use crate::db::{queries, Database, DbError};
use crate::export::{self, ExportFormat, ExportableAuditEntry, ExportableAvailability};
use crate::import;
use crate::models::{AuditLogEntry, AvailabilityRecord, Direction, EquipmentItem, Location, Student};
use crate::session::{ScanEntry, ScanOutcome, ScanSession, SessionHandle, SessionState};
use crate::ScanError;

/// Open kit as shown to the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KitSnapshot {
    pub kit_sku: String,
    pub parts: Vec<String>,
    pub remaining: Vec<String>,
}

/// Read-only view of a live session, for the scanned-items display
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub handle: SessionHandle,
    pub direction: Direction,
    pub student_id: String,
    pub state: SessionState,
    pub entries: Vec<ScanEntry>,
    pub open_kit: Option<KitSnapshot>,
}

#[derive(Default)]
struct SessionTable {
    next_id: u64,
    sessions: BTreeMap<SessionHandle, ScanSession>,
}

impl SessionTable {
    fn insert(&mut self, session: ScanSession) -> SessionHandle {
        self.next_id += 1;
        let handle = SessionHandle::new(self.next_id);
        self.sessions.insert(handle, session);
        handle
    }

    fn active(&self) -> Option<SessionHandle> {
        self.sessions.keys().next().copied()
    }

    fn get(&self, handle: SessionHandle) -> Result<&ScanSession, ScanError> {
        self.sessions
            .get(&handle)
            .ok_or(ScanError::UnknownSession(handle))
    }

    fn get_mut(&mut self, handle: SessionHandle) -> Result<&mut ScanSession, ScanError> {
        self.sessions
            .get_mut(&handle)
            .ok_or(ScanError::UnknownSession(handle))
    }
}

/// Scan-session engine over one store
pub struct Engine {
    db: Database,
    clock: Arc<dyn Clock>,
    sessions: SessionTable,
}

impl Engine {
    /// Create an engine over an initialized database
    pub fn new(db: Database) -> Self {
        Self::with_clock(db, Arc::new(SystemClock))
    }

    /// Create an engine with a custom timestamp source
    pub fn with_clock(db: Database, clock: Arc<dyn Clock>) -> Self {
        Self {
            db,
            clock,
            sessions: SessionTable::default(),
        }
    }

    /// Install logging at the configured level, then open (creating if
    /// needed) the database named by `config`
    pub fn from_config(config: &EngineConfig) -> Result<Self, ScanError> {
        crate::init_tracing(&config.log_level);

        let db_path = &config.database_path;
        tracing::info!("Database path: {:?}", db_path);

        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                tracing::error!("Failed to create database directory {:?}: {}", parent, e);
                DbError::from(e)
            })?;
        }

        let db = Database::new(db_path.clone())?;
        db.initialize()?;
        tracing::info!("Database initialized successfully at {:?}", db_path);

        Ok(Self::new(db))
    }

    /// Engine over a fresh in-memory store
    pub fn open_in_memory() -> Result<Self, ScanError> {
        let db = Database::open_in_memory()?;
        db.initialize()?;
        Ok(Self::new(db))
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Handle of the session currently open, if any
    pub fn active_session(&self) -> Option<SessionHandle> {
        self.sessions.active()
    }

    // ========================================================================
    // Session workflow
    // ========================================================================

    /// Start a check-in or check-out for a known student
    pub fn open_session(
        &mut self,
        direction: Direction,
        student_id: &str,
    ) -> Result<SessionHandle, ScanError> {
        if let Some(active) = self.sessions.active() {
            tracing::warn!("Refusing new session, {} is still open", active);
            return Err(ScanError::SessionBusy(active));
        }

        let student_id = student_id.trim();
        let student = self
            .db
            .with_connection(|conn| queries::lookup_student(conn, student_id))?
            .ok_or_else(|| ScanError::UnknownStudent(student_id.to_string()))?;

        let handle = self
            .sessions
            .insert(ScanSession::new(direction, student.student_id));

        tracing::info!("Opened {} ({}) for student {}", handle, direction.display_name(), student_id);
        Ok(handle)
    }

    /// Validate and stage one barcode
    pub fn scan(&mut self, handle: SessionHandle, sku: &str) -> Result<ScanOutcome, ScanError> {
        let session = self.sessions.get_mut(handle)?;
        if session.state() == SessionState::Closed {
            return Err(ScanError::SessionClosed(handle));
        }

        let now = self.clock.now();
        let result = self
            .db
            .with_connection(|conn| session.scan(sku, conn, now));

        match &result {
            Ok(outcome) => tracing::debug!("{}: {:?}", handle, outcome),
            Err(e) => tracing::warn!("{}: rejected scan {:?}: {}", handle, sku, e),
        }

        result
    }

    /// Finish scanning and commit.
    ///
    /// Fails with `IncompleteKit` (session still open) while a kit is
    /// unresolved. On `CommitFailed` the session stays closed in the table
    /// and [`Engine::commit_session`] may retry it.
    pub fn close_session(&mut self, handle: SessionHandle) -> Result<CommitResult, ScanError> {
        let session = self.sessions.get_mut(handle)?;
        if session.state() != SessionState::Closed {
            session.close()?;
            tracing::info!("Closed {} with {} entries", handle, session.entries().len());
        }

        self.commit_session(handle)
    }

    /// Commit a closed session, atomically.
    ///
    /// A session that was not closed yet is closed first.
    pub fn commit_session(&mut self, handle: SessionHandle) -> Result<CommitResult, ScanError> {
        let session = self.sessions.get_mut(handle)?;
        if session.state() != SessionState::Closed {
            session.close()?;
        }

        let result = self
            .db
            .with_transaction(|conn| commit::commit_session(conn, session));

        match result {
            Ok(result) => {
                self.sessions.sessions.remove(&handle);
                tracing::info!(
                    "Committed {}: {} entries, {} names now {}",
                    handle,
                    result.entries_committed,
                    result.names_updated.len(),
                    result.location
                );
                Ok(result)
            }
            Err(e) => {
                tracing::warn!("Commit of {} failed, session kept for retry: {}", handle, e);
                Err(ScanError::CommitFailed(e))
            }
        }
    }

    /// Discard a session without touching durable state
    pub fn cancel_session(&mut self, handle: SessionHandle) -> Result<(), ScanError> {
        let session = self
            .sessions
            .sessions
            .remove(&handle)
            .ok_or(ScanError::UnknownSession(handle))?;

        tracing::info!(
            "Cancelled {}, discarded {} staged entries",
            handle,
            session.entries().len()
        );
        Ok(())
    }

    /// Current state of a live session
    pub fn session_snapshot(&self, handle: SessionHandle) -> Result<SessionSnapshot, ScanError> {
        let session = self.sessions.get(handle)?;

        Ok(SessionSnapshot {
            handle,
            direction: session.direction(),
            student_id: session.student_id().to_string(),
            state: session.state(),
            entries: session.entries().to_vec(),
            open_kit: session.open_kit().map(|kit| KitSnapshot {
                kit_sku: kit.kit_sku().to_string(),
                parts: kit.parts().to_vec(),
                remaining: kit.remaining().to_vec(),
            }),
        })
    }

    // ========================================================================
    // Roster import
    // ========================================================================

    /// Replace the equipment catalog; every name restarts as `in`
    pub fn import_equipment(&mut self, items: Vec<EquipmentItem>) -> Result<usize, ScanError> {
        self.ensure_idle()?;
        let items = import::normalize_equipment(items)?;

        let count = self
            .db
            .with_transaction(|conn| queries::replace_catalog(conn, &items))?;

        tracing::info!("Imported {} equipment items", count);
        Ok(count)
    }

    /// Add students, optionally replacing the existing roster
    pub fn import_students(
        &mut self,
        students: Vec<Student>,
        replace_existing: bool,
    ) -> Result<usize, ScanError> {
        self.ensure_idle()?;
        let students = import::normalize_students(students)?;

        let count = self
            .db
            .with_transaction(|conn| queries::import_students(conn, &students, replace_existing))?;

        tracing::info!(
            "Imported {} of {} students (replace existing: {})",
            count,
            students.len(),
            replace_existing
        );
        Ok(count)
    }

    fn ensure_idle(&self) -> Result<(), ScanError> {
        match self.sessions.active() {
            Some(active) => Err(ScanError::SessionBusy(active)),
            None => Ok(()),
        }
    }

    // ========================================================================
    // Reports
    // ========================================================================

    /// Student roster ordered by name
    pub fn students(&self) -> Result<Vec<Student>, ScanError> {
        Ok(self.db.with_connection(queries::list_students)?)
    }

    /// All availability records ordered by name
    pub fn availability(&self) -> Result<Vec<AvailabilityRecord>, ScanError> {
        Ok(self.db.with_connection(queries::get_availability)?)
    }

    /// Location of one equipment name
    pub fn location(&self, name: &str) -> Result<Option<Location>, ScanError> {
        Ok(self.db.with_connection(|conn| queries::get_location(conn, name))?)
    }

    /// Audit log, newest first
    pub fn audit_log(
        &self,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Result<Vec<AuditLogEntry>, ScanError> {
        Ok(self
            .db
            .with_connection(|conn| queries::get_audit_log(conn, limit, offset))?)
    }

    /// Audit log of one student, newest first
    pub fn audit_log_for_student(&self, student_id: &str) -> Result<Vec<AuditLogEntry>, ScanError> {
        Ok(self
            .db
            .with_connection(|conn| queries::get_audit_log_for_student(conn, student_id))?)
    }

    /// Write the whole audit log to `path`; returns the row count
    pub fn export_audit_log(&self, format: ExportFormat, path: &Path) -> Result<usize, ScanError> {
        let rows: Vec<ExportableAuditEntry> =
            self.audit_log(None, None)?.iter().map(Into::into).collect();

        match format {
            ExportFormat::Csv => export::write_audit_log_csv(&rows, path)?,
            ExportFormat::Json => export::write_audit_log_json(&rows, path)?,
        }

        tracing::info!("Exported {} audit entries to {}", rows.len(), path.display());
        Ok(rows.len())
    }

    /// Write the availability table to `path`; returns the row count
    pub fn export_availability(&self, format: ExportFormat, path: &Path) -> Result<usize, ScanError> {
        let rows: Vec<ExportableAvailability> =
            self.availability()?.iter().map(Into::into).collect();

        match format {
            ExportFormat::Csv => export::write_availability_csv(&rows, path)?,
            ExportFormat::Json => export::write_availability_json(&rows, path)?,
        }

        tracing::info!("Exported {} availability records to {}", rows.len(), path.display());
        Ok(rows.len())
    }
}
