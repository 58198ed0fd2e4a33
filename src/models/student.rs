//! Student identity

use serde::{Deserialize, Serialize};

/// Imported student record, referenced by sessions and audit entries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub student_id: String,
    pub name: String,
}

impl Student {
    pub fn new(student_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            student_id: student_id.into(),
            name: name.into(),
        }
    }
}
