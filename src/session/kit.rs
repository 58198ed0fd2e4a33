//! Kit resolution
//!
//! A kit main plus its declared parts travel as one unit: nothing of a kit
//! reaches the session entries until every part has been scanned.

use serde::Serialize;

use crate::ScanError;

/// Resolution state of one kit inside a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KitInProgress {
    kit_sku: String,
    parts: Vec<String>,
    remaining: Vec<String>,
}

/// Result of consuming a part
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KitProgress {
    /// Part removed, others still outstanding
    Consumed { remaining: Vec<String> },
    /// Last part removed
    Completed,
}

impl KitInProgress {
    /// Start resolving `kit_sku` with its declared parts.
    ///
    /// Duplicate part references collapse into one; an empty list or a
    /// self reference is rejected.
    pub fn open(kit_sku: &str, declared: &[String]) -> Result<Self, ScanError> {
        let mut parts: Vec<String> = Vec::with_capacity(declared.len());
        for part in declared {
            if part == kit_sku {
                return Err(ScanError::InvalidCatalog(format!(
                    "kit {} lists itself as a part",
                    kit_sku
                )));
            }
            if !parts.contains(part) {
                parts.push(part.clone());
            }
        }

        if parts.is_empty() {
            return Err(ScanError::KitWithoutParts(kit_sku.to_string()));
        }

        Ok(Self {
            kit_sku: kit_sku.to_string(),
            remaining: parts.clone(),
            parts,
        })
    }

    pub fn kit_sku(&self) -> &str {
        &self.kit_sku
    }

    /// All declared parts, in catalog order
    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    /// Parts not scanned yet, in catalog order
    pub fn remaining(&self) -> &[String] {
        &self.remaining
    }

    /// Whether `sku` is one of this kit's declared parts
    pub fn declares(&self, sku: &str) -> bool {
        self.parts.iter().any(|p| p == sku)
    }

    /// Mark a part as scanned
    pub fn consume(&mut self, sku: &str) -> Result<KitProgress, ScanError> {
        if !self.declares(sku) {
            return Err(ScanError::NotInThisKit {
                sku: sku.to_string(),
                kit_sku: self.kit_sku.clone(),
            });
        }

        let Some(index) = self.remaining.iter().position(|p| p == sku) else {
            return Err(ScanError::DuplicateScan(sku.to_string()));
        };

        self.remaining.remove(index);

        if self.remaining.is_empty() {
            Ok(KitProgress::Completed)
        } else {
            Ok(KitProgress::Consumed {
                remaining: self.remaining.clone(),
            })
        }
    }

    /// SKUs to enroll once complete: the kit main first, then its parts
    pub fn enrollment(&self) -> Vec<String> {
        std::iter::once(self.kit_sku.clone())
            .chain(self.parts.iter().cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_open_rejects_empty_and_self_reference() {
        assert!(matches!(
            KitInProgress::open("K1", &[]),
            Err(ScanError::KitWithoutParts(sku)) if sku == "K1"
        ));
        assert!(matches!(
            KitInProgress::open("K1", &parts(&["P1", "K1"])),
            Err(ScanError::InvalidCatalog(_))
        ));
    }

    #[test]
    fn test_open_collapses_duplicate_parts() {
        let kit = KitInProgress::open("K1", &parts(&["P1", "P2", "P1"])).unwrap();
        assert_eq!(kit.parts(), parts(&["P1", "P2"]).as_slice());
        assert_eq!(kit.remaining(), kit.parts());
    }

    #[test]
    fn test_consume_in_any_order() {
        let mut kit = KitInProgress::open("K1", &parts(&["P1", "P2", "P3"])).unwrap();

        assert_eq!(
            kit.consume("P3").unwrap(),
            KitProgress::Consumed { remaining: parts(&["P1", "P2"]) }
        );
        assert_eq!(
            kit.consume("P1").unwrap(),
            KitProgress::Consumed { remaining: parts(&["P2"]) }
        );
        assert_eq!(kit.consume("P2").unwrap(), KitProgress::Completed);
        assert_eq!(kit.enrollment(), parts(&["K1", "P1", "P2", "P3"]));
    }

    #[test]
    fn test_consume_rejects_foreign_and_repeated_parts() {
        let mut kit = KitInProgress::open("K1", &parts(&["P1", "P2"])).unwrap();

        assert!(matches!(
            kit.consume("X9"),
            Err(ScanError::NotInThisKit { sku, kit_sku }) if sku == "X9" && kit_sku == "K1"
        ));

        kit.consume("P1").unwrap();
        assert!(matches!(kit.consume("P1"), Err(ScanError::DuplicateScan(sku)) if sku == "P1"));
        assert_eq!(kit.remaining(), parts(&["P2"]).as_slice());
    }
}
