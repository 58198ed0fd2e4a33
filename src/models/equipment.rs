//! Equipment data types
//!
//! Catalog items, kit structure and availability state

use serde::{Deserialize, Serialize};

/// Role an item plays in kit resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KitRole {
    /// Plain item, scanned on its own
    #[default]
    None,
    /// Root of a kit; scanning it opens kit resolution
    KitMain,
    /// Sub-part of a kit; only accepted while its kit is open
    KitPart,
}

impl KitRole {
    /// Storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::KitMain => "kit_main",
            Self::KitPart => "kit_part",
        }
    }

    /// Parse from string
    ///
    /// Accepts the roster spellings (`kmain`, `kpart`, blank) as well as the
    /// storage names.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "" | "none" => Some(Self::None),
            "kit_main" | "kitmain" | "kmain" => Some(Self::KitMain),
            "kit_part" | "kitpart" | "kpart" => Some(Self::KitPart),
            _ => None,
        }
    }
}

/// Coarse location of an equipment group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    In,
    Out,
}

impl Location {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::In => "in",
            Self::Out => "out",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "in" => Some(Self::In),
            "out" => Some(Self::Out),
            _ => None,
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Catalog entry for one physical unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquipmentItem {
    /// Unique barcode identity
    pub sku: String,
    /// Display and availability group key; several SKUs may share it
    pub name: String,
    pub category: Option<String>,
    #[serde(default)]
    pub kit_role: KitRole,
    /// Ordered part SKUs, only populated for `KitRole::KitMain`
    #[serde(default)]
    pub kit_parts: Vec<String>,
}

impl EquipmentItem {
    /// Create a plain (non-kit) item
    pub fn new(sku: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            sku: sku.into(),
            name: name.into(),
            category: None,
            kit_role: KitRole::None,
            kit_parts: Vec::new(),
        }
    }

    /// Set category
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Turn this item into a kit main with the given parts
    pub fn kit_main<I, S>(mut self, parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.kit_role = KitRole::KitMain;
        self.kit_parts = parts.into_iter().map(Into::into).collect();
        self
    }

    /// Mark this item as a kit part
    pub fn kit_part(mut self) -> Self {
        self.kit_role = KitRole::KitPart;
        self.kit_parts.clear();
        self
    }
}

/// Current location of one equipment name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityRecord {
    pub name: String,
    pub location: Location,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kit_role_from_roster_spelling() {
        assert_eq!(KitRole::from_str("kmain"), Some(KitRole::KitMain));
        assert_eq!(KitRole::from_str("KPart"), Some(KitRole::KitPart));
        assert_eq!(KitRole::from_str(""), Some(KitRole::None));
        assert_eq!(KitRole::from_str("kit_main"), Some(KitRole::KitMain));
        assert_eq!(KitRole::from_str("bundle"), None);
    }

    #[test]
    fn test_kit_role_storage_names_parse_back() {
        for role in [KitRole::None, KitRole::KitMain, KitRole::KitPart] {
            assert_eq!(KitRole::from_str(role.as_str()), Some(role));
        }
    }

    #[test]
    fn test_location_parse() {
        assert_eq!(Location::from_str("in"), Some(Location::In));
        assert_eq!(Location::from_str(" OUT "), Some(Location::Out));
        assert_eq!(Location::from_str("lost"), None);
        assert_eq!(Location::Out.to_string(), "out");
    }

    #[test]
    fn test_item_builder() {
        let kit = EquipmentItem::new("K1", "ProjectorKit")
            .category("AV")
            .kit_main(["P1", "P2"]);

        assert_eq!(kit.kit_role, KitRole::KitMain);
        assert_eq!(kit.kit_parts, vec!["P1".to_string(), "P2".to_string()]);
        assert_eq!(kit.category.as_deref(), Some("AV"));

        let part = EquipmentItem::new("P1", "Projector").kit_part();
        assert_eq!(part.kit_role, KitRole::KitPart);
        assert!(part.kit_parts.is_empty());
    }
}
