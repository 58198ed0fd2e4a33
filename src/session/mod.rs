//! Scan session staging
//!
//! A session accumulates validated scans for one check-in or check-out by
//! one student. Nothing here touches durable state; the committer turns a
//! closed session into ledger and audit writes.
//!
//! Validation order for every scan:
//! 1. the SKU must not already be staged
//! 2. the SKU must be catalogued
//! 3. its equipment name must be at the direction's required location
//! 4. dispatch on kit role (plain item, kit part, kit main)

pub mod kit;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::db::{queries, DbError};
use crate::models::{Direction, EquipmentItem, KitRole, Location};
use crate::ScanError;

pub use kit::{KitInProgress, KitProgress};

/// Opaque reference to a session in the engine's session table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionHandle(u64);

impl SessionHandle {
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Live states of a session; committed and cancelled sessions leave the table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Open,
    KitOpen,
    /// Closed and waiting for (or retrying) commit
    Closed,
}

/// One accepted scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanEntry {
    pub sku: String,
    pub timestamp: DateTime<Utc>,
}

/// What a successful scan did, for the caller's live display
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScanOutcome {
    /// Plain item staged
    Accepted { sku: String, name: String },
    /// Kit main scanned; its parts are now expected
    KitOpened {
        kit_sku: String,
        name: String,
        remaining: Vec<String>,
    },
    /// One kit part scanned, others outstanding
    KitPartConsumed {
        kit_sku: String,
        part_sku: String,
        remaining: Vec<String>,
    },
    /// Last part scanned; kit main and all parts staged
    KitCompleted {
        kit_sku: String,
        enrolled: Vec<String>,
    },
}

/// Read access the validation pipeline needs
pub trait CatalogView {
    fn equipment(&self, sku: &str) -> Result<Option<EquipmentItem>, DbError>;
    fn kit_parts(&self, sku: &str) -> Result<Option<Vec<String>>, DbError>;
    fn location(&self, name: &str) -> Result<Option<Location>, DbError>;
}

impl CatalogView for Connection {
    fn equipment(&self, sku: &str) -> Result<Option<EquipmentItem>, DbError> {
        queries::lookup_equipment(self, sku)
    }

    fn kit_parts(&self, sku: &str) -> Result<Option<Vec<String>>, DbError> {
        queries::lookup_kit_parts(self, sku)
    }

    fn location(&self, name: &str) -> Result<Option<Location>, DbError> {
        queries::get_location(self, name)
    }
}

/// Staged state of one check-in or check-out
#[derive(Debug, Clone)]
pub struct ScanSession {
    direction: Direction,
    student_id: String,
    entries: Vec<ScanEntry>,
    kit: Option<KitInProgress>,
    closed: bool,
}

impl ScanSession {
    /// Create an empty session; the student must already be verified
    pub fn new(direction: Direction, student_id: impl Into<String>) -> Self {
        Self {
            direction,
            student_id: student_id.into(),
            entries: Vec::new(),
            kit: None,
            closed: false,
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn student_id(&self) -> &str {
        &self.student_id
    }

    /// Accepted scans in arrival order
    pub fn entries(&self) -> &[ScanEntry] {
        &self.entries
    }

    pub fn open_kit(&self) -> Option<&KitInProgress> {
        self.kit.as_ref()
    }

    pub fn state(&self) -> SessionState {
        if self.closed {
            SessionState::Closed
        } else if self.kit.is_some() {
            SessionState::KitOpen
        } else {
            SessionState::Open
        }
    }

    pub fn contains(&self, sku: &str) -> bool {
        self.entries.iter().any(|e| e.sku == sku)
    }

    /// Validate one barcode and stage it.
    ///
    /// On error the session is left exactly as it was.
    pub fn scan<C>(&mut self, sku: &str, catalog: &C, now: DateTime<Utc>) -> Result<ScanOutcome, ScanError>
    where
        C: CatalogView + ?Sized,
    {
        let sku = sku.trim();

        if self.contains(sku) {
            return Err(ScanError::DuplicateScan(sku.to_string()));
        }

        let item = catalog
            .equipment(sku)?
            .ok_or_else(|| ScanError::UnknownEquipment(sku.to_string()))?;

        let location = catalog.location(&item.name)?;
        if location != Some(self.direction.required_location()) {
            return Err(ScanError::WrongDirection {
                sku: item.sku,
                name: item.name,
                direction: self.direction,
                location,
            });
        }

        // A declared part of the open kit is consumed whatever its own role
        if self.kit.as_ref().is_some_and(|kit| kit.declares(sku)) {
            return self.consume_kit_part(sku, now);
        }

        match item.kit_role {
            KitRole::None => {
                let timestamp = self.next_timestamp(now);
                self.entries.push(ScanEntry {
                    sku: item.sku.clone(),
                    timestamp,
                });
                Ok(ScanOutcome::Accepted {
                    sku: item.sku,
                    name: item.name,
                })
            }
            KitRole::KitPart => match &self.kit {
                Some(kit) => Err(ScanError::NotInThisKit {
                    sku: item.sku,
                    kit_sku: kit.kit_sku().to_string(),
                }),
                None => Err(ScanError::OrphanPart(item.sku)),
            },
            KitRole::KitMain => self.open_kit_for(item, catalog),
        }
    }

    fn open_kit_for<C>(&mut self, item: EquipmentItem, catalog: &C) -> Result<ScanOutcome, ScanError>
    where
        C: CatalogView + ?Sized,
    {
        if let Some(open) = &self.kit {
            if open.kit_sku() == item.sku {
                return Err(ScanError::DuplicateScan(item.sku));
            }
            return Err(ScanError::KitAlreadyOpen {
                sku: item.sku,
                open_kit: open.kit_sku().to_string(),
            });
        }

        let declared = catalog.kit_parts(&item.sku)?.unwrap_or_default();
        let kit = KitInProgress::open(&item.sku, &declared)?;

        // Enrollment must not duplicate a part already staged on its own
        if let Some(staged) = kit.parts().iter().find(|p| self.contains(p)) {
            return Err(ScanError::DuplicateScan(staged.clone()));
        }

        let remaining = kit.remaining().to_vec();
        self.kit = Some(kit);

        Ok(ScanOutcome::KitOpened {
            kit_sku: item.sku,
            name: item.name,
            remaining,
        })
    }

    fn consume_kit_part(&mut self, sku: &str, now: DateTime<Utc>) -> Result<ScanOutcome, ScanError> {
        let Some(kit) = self.kit.as_mut() else {
            return Err(ScanError::OrphanPart(sku.to_string()));
        };

        match kit.consume(sku)? {
            KitProgress::Consumed { remaining } => Ok(ScanOutcome::KitPartConsumed {
                kit_sku: kit.kit_sku().to_string(),
                part_sku: sku.to_string(),
                remaining,
            }),
            KitProgress::Completed => {
                let enrolled = kit.enrollment();
                let kit_sku = kit.kit_sku().to_string();
                self.kit = None;

                let timestamp = self.next_timestamp(now);
                self.entries.extend(enrolled.iter().map(|sku| ScanEntry {
                    sku: sku.clone(),
                    timestamp,
                }));

                Ok(ScanOutcome::KitCompleted { kit_sku, enrolled })
            }
        }
    }

    /// Acceptance timestamps never go backwards within a session
    fn next_timestamp(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self.entries.last() {
            Some(last) if last.timestamp > now => last.timestamp,
            _ => now,
        }
    }

    /// Stop accepting scans; fails while a kit is unresolved
    pub fn close(&mut self) -> Result<(), ScanError> {
        if let Some(kit) = &self.kit {
            return Err(ScanError::IncompleteKit {
                kit_sku: kit.kit_sku().to_string(),
                remaining: kit.remaining().to_vec(),
            });
        }
        self.closed = true;
        Ok(())
    }
}
