//! Roster import validation
//!
//! Rows arrive already parsed from the import collaborator. A batch is
//! checked as a whole before anything is written, so a bad roster never
//! replaces a good one.

use std::collections::{HashMap, HashSet};

use crate::models::{EquipmentItem, KitRole, Student};
use crate::ScanError;

/// Trim and validate an equipment batch
pub fn normalize_equipment(items: Vec<EquipmentItem>) -> Result<Vec<EquipmentItem>, ScanError> {
    let items: Vec<EquipmentItem> = items
        .into_iter()
        .map(|mut item| {
            item.sku = item.sku.trim().to_string();
            item.name = item.name.trim().to_string();
            item.category = item
                .category
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty());
            // Parts are an ordered set: a repeat keeps its first position
            let mut seen = HashSet::new();
            item.kit_parts = item
                .kit_parts
                .iter()
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty() && seen.insert(p.clone()))
                .collect();
            item
        })
        .collect();

    let mut roles: HashMap<&str, KitRole> = HashMap::with_capacity(items.len());
    for item in &items {
        if item.sku.is_empty() {
            return Err(invalid(format!("item '{}' has no SKU", item.name)));
        }
        if item.name.is_empty() {
            return Err(invalid(format!("item {} has no name", item.sku)));
        }
        if roles.insert(item.sku.as_str(), item.kit_role).is_some() {
            return Err(invalid(format!("SKU {} appears more than once", item.sku)));
        }
    }

    for item in &items {
        match item.kit_role {
            KitRole::KitMain => {
                if item.kit_parts.is_empty() {
                    return Err(invalid(format!("kit {} declares no parts", item.sku)));
                }
                for part in &item.kit_parts {
                    if part == &item.sku {
                        return Err(invalid(format!("kit {} lists itself as a part", item.sku)));
                    }
                    match roles.get(part.as_str()) {
                        None => {
                            return Err(invalid(format!(
                                "kit {} references unknown part {}",
                                item.sku, part
                            )))
                        }
                        Some(KitRole::KitMain) => {
                            return Err(invalid(format!(
                                "kit {} nests kit {} as a part",
                                item.sku, part
                            )))
                        }
                        Some(_) => {}
                    }
                }
            }
            KitRole::None | KitRole::KitPart => {
                if !item.kit_parts.is_empty() {
                    return Err(invalid(format!(
                        "item {} declares parts but is not a kit",
                        item.sku
                    )));
                }
            }
        }
    }

    Ok(items)
}

/// Trim and validate a student batch
pub fn normalize_students(students: Vec<Student>) -> Result<Vec<Student>, ScanError> {
    students
        .into_iter()
        .map(|s| {
            let student = Student::new(s.student_id.trim(), s.name.trim());
            if student.student_id.is_empty() || student.name.is_empty() {
                return Err(invalid(format!(
                    "student row '{}' / '{}' is incomplete",
                    s.student_id, s.name
                )));
            }
            Ok(student)
        })
        .collect()
}

fn invalid(reason: String) -> ScanError {
    ScanError::InvalidCatalog(reason)
}
