//! Session committer
//!
//! Materializes a closed scan session into the audit log and the
//! availability ledger. The caller runs [`commit_session`] inside one
//! transaction, so either every row lands or none does.

use std::collections::BTreeSet;

use rusqlite::Connection;
use serde::Serialize;

use crate::db::{queries, DbError};
use crate::models::{AuditLogEntry, Direction, Location};
use crate::session::ScanSession;

/// Summary of a successful commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitResult {
    pub direction: Direction,
    pub student_id: String,
    /// Audit rows written, one per staged SKU
    pub entries_committed: usize,
    /// Distinct equipment names whose location was set
    pub names_updated: Vec<String>,
    pub location: Location,
}

impl CommitResult {
    /// Result for a session closed with nothing scanned
    pub fn empty(session: &ScanSession) -> Self {
        Self {
            direction: session.direction(),
            student_id: session.student_id().to_string(),
            entries_committed: 0,
            names_updated: Vec::new(),
            location: session.direction().target_location(),
        }
    }
}

/// Write the audit rows and availability updates for `session`.
///
/// Equipment and student names are resolved now, at commit time. A SKU or
/// student that vanished from the catalog since scanning fails the commit.
pub fn commit_session(conn: &Connection, session: &ScanSession) -> Result<CommitResult, DbError> {
    if session.entries().is_empty() {
        return Ok(CommitResult::empty(session));
    }

    let student = queries::lookup_student(conn, session.student_id())?.ok_or_else(|| {
        DbError::Missing(format!("student {}", session.student_id()))
    })?;

    let direction = session.direction();
    let target = direction.target_location();
    let mut names = BTreeSet::new();

    for entry in session.entries() {
        let item = queries::lookup_equipment(conn, &entry.sku)?.ok_or_else(|| {
            DbError::Missing(format!("equipment {}", entry.sku))
        })?;

        queries::append_audit_entry(
            conn,
            &AuditLogEntry {
                sku: entry.sku.clone(),
                equipment_name: item.name.clone(),
                student_id: student.student_id.clone(),
                student_name: student.name.clone(),
                timestamp: entry.timestamp,
                direction,
            },
        )?;

        names.insert(item.name);
    }

    for name in &names {
        queries::set_location(conn, name, target)?;
    }

    Ok(CommitResult {
        direction,
        student_id: student.student_id,
        entries_committed: session.entries().len(),
        names_updated: names.into_iter().collect(),
        location: target,
    })
}
