//! Data models module
//!
//! Contains all data structures shared between the store and the engine:
//! - Equipment and kit types
//! - Student identity
//! - Audit log entries and scan direction

pub mod audit;
pub mod equipment;
pub mod student;

pub use audit::{AuditLogEntry, Direction};
pub use equipment::{AvailabilityRecord, EquipmentItem, KitRole, Location};
pub use student::Student;
