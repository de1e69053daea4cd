//! # Domain Types
//!
//! Core domain types used throughout Pharma POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────────┐        ┌──────────────────────┐               │
//! │  │  InventoryRecord    │ 1    * │   AlternateForm      │               │
//! │  │  ─────────────────  │───────►│  ──────────────────  │               │
//! │  │  drug_identity_id ◄─┼─ 1:1   │  packaging_type      │               │
//! │  │  primary_form       │        │  selling_price       │               │
//! │  │  expiration_date    │        │  quantity (own units)│               │
//! │  └─────────────────────┘        └──────────────────────┘               │
//! │                                                                         │
//! │  ┌─────────────────────┐        ┌──────────────────────┐               │
//! │  │  DrugIdentity       │        │  TransactionRecord   │               │
//! │  │  (catalog, r/o)     │        │  (append-only)       │               │
//! │  │  name, image, uses  │        │  total_amount, qty   │               │
//! │  └─────────────────────┘        └──────────────────────┘               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Independent Stock Per Form
//! Primary and alternate forms each track their own stock. Selling a strip
//! never touches the box count and vice versa; no unit conversion happens here.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Drug Category
// =============================================================================

/// Therapeutic category tag used for browsing filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DrugCategory {
    Analgesic,
    Antibiotic,
    Antifungal,
    Antihistamine,
    Antihypertensive,
    Antimalarial,
    Antidiabetic,
    Antiviral,
    Gastrointestinal,
    Respiratory,
    Supplement,
    Topical,
    Other,
}

impl DrugCategory {
    pub const ALL: [DrugCategory; 13] = [
        DrugCategory::Analgesic,
        DrugCategory::Antibiotic,
        DrugCategory::Antifungal,
        DrugCategory::Antihistamine,
        DrugCategory::Antihypertensive,
        DrugCategory::Antimalarial,
        DrugCategory::Antidiabetic,
        DrugCategory::Antiviral,
        DrugCategory::Gastrointestinal,
        DrugCategory::Respiratory,
        DrugCategory::Supplement,
        DrugCategory::Topical,
        DrugCategory::Other,
    ];

    /// Wire/database spelling.
    pub const fn as_str(&self) -> &'static str {
        match self {
            DrugCategory::Analgesic => "analgesic",
            DrugCategory::Antibiotic => "antibiotic",
            DrugCategory::Antifungal => "antifungal",
            DrugCategory::Antihistamine => "antihistamine",
            DrugCategory::Antihypertensive => "antihypertensive",
            DrugCategory::Antimalarial => "antimalarial",
            DrugCategory::Antidiabetic => "antidiabetic",
            DrugCategory::Antiviral => "antiviral",
            DrugCategory::Gastrointestinal => "gastrointestinal",
            DrugCategory::Respiratory => "respiratory",
            DrugCategory::Supplement => "supplement",
            DrugCategory::Topical => "topical",
            DrugCategory::Other => "other",
        }
    }
}

impl fmt::Display for DrugCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DrugCategory {
    type Err = ValidationError;

    /// Parses the form value submitted by the inventory screen.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        DrugCategory::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "category".to_string(),
                allowed: DrugCategory::ALL.iter().map(|c| c.to_string()).collect(),
            })
    }
}

// =============================================================================
// Packaging Type
// =============================================================================

/// How a form is packaged and counted at the till.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PackagingType {
    Tablet,
    Capsule,
    Strip,
    Blister,
    Carton,
    Bottle,
    Sachet,
    Vial,
    Ampoule,
    Tube,
    Inhaler,
    Drops,
}

impl PackagingType {
    pub const ALL: [PackagingType; 12] = [
        PackagingType::Tablet,
        PackagingType::Capsule,
        PackagingType::Strip,
        PackagingType::Blister,
        PackagingType::Carton,
        PackagingType::Bottle,
        PackagingType::Sachet,
        PackagingType::Vial,
        PackagingType::Ampoule,
        PackagingType::Tube,
        PackagingType::Inhaler,
        PackagingType::Drops,
    ];

    /// Wire/database spelling.
    pub const fn as_str(&self) -> &'static str {
        match self {
            PackagingType::Tablet => "tablet",
            PackagingType::Capsule => "capsule",
            PackagingType::Strip => "strip",
            PackagingType::Blister => "blister",
            PackagingType::Carton => "carton",
            PackagingType::Bottle => "bottle",
            PackagingType::Sachet => "sachet",
            PackagingType::Vial => "vial",
            PackagingType::Ampoule => "ampoule",
            PackagingType::Tube => "tube",
            PackagingType::Inhaler => "inhaler",
            PackagingType::Drops => "drops",
        }
    }

    /// Label printed next to the unit price ("$4.50 / Strip").
    pub const fn label(&self) -> &'static str {
        match self {
            PackagingType::Tablet => "Tablet",
            PackagingType::Capsule => "Capsule",
            PackagingType::Strip => "Strip",
            PackagingType::Blister => "Blister",
            PackagingType::Carton => "Carton",
            PackagingType::Bottle => "Bottle",
            PackagingType::Sachet => "Sachet",
            PackagingType::Vial => "Vial",
            PackagingType::Ampoule => "Ampoule",
            PackagingType::Tube => "Tube",
            PackagingType::Inhaler => "Inhaler",
            PackagingType::Drops => "Drops",
        }
    }
}

impl fmt::Display for PackagingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PackagingType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        PackagingType::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == wanted)
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "packaging_type".to_string(),
                allowed: PackagingType::ALL.iter().map(|p| p.to_string()).collect(),
            })
    }
}

// =============================================================================
// Drug Identity
// =============================================================================

/// Catalog entry owned by the catalog collaborator. Read-only to the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DrugIdentity {
    pub id: String,
    pub name: String,
    pub image_url: Option<String>,
    /// Usage tags ("pain", "fever", ...).
    pub uses: Vec<String>,
}

// =============================================================================
// Inventory Record
// =============================================================================

/// The default packaging/price/stock entry of an inventory record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PrimaryForm {
    pub packaging_type: PackagingType,
    pub cost_price: Money,
    pub selling_price: Money,
    pub quantity: i64,
}

/// An additional packaging option with its own price and its own stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AlternateForm {
    pub id: String,
    pub inventory_record_id: String,
    /// Need not be unique within a record.
    pub packaging_type: PackagingType,
    pub selling_price: Money,
    /// Stock counted in this form's own units.
    pub quantity_in_base_units: i64,
}

/// One drug's stock entry. Exactly one exists per `drug_identity_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InventoryRecord {
    pub id: String,
    pub drug_identity_id: String,
    pub supplier_id: String,
    pub category: DrugCategory,
    pub primary_form: PrimaryForm,
    #[ts(as = "String")]
    pub expiration_date: NaiveDate,
    pub can_have_alternate_forms: bool,
    /// Ordered by insertion. Only meaningful when `can_have_alternate_forms`.
    pub alternate_forms: Vec<AlternateForm>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl InventoryRecord {
    /// Looks up an alternate form by id.
    pub fn alternate_form(&self, form_id: &str) -> Option<&AlternateForm> {
        self.alternate_forms.iter().find(|f| f.id == form_id)
    }

    /// True when any alternate form still has positive stock.
    pub fn has_alternate_stock(&self) -> bool {
        self.alternate_forms
            .iter()
            .any(|f| f.quantity_in_base_units > 0)
    }
}

// =============================================================================
// Inventory Input
// =============================================================================

/// Payload of the inventory-management screen, before validation.
///
/// The expiration date stays textual here because that is how it arrives
/// from the form; [`crate::validation::validate_inventory_input`] parses it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InventoryInput {
    pub drug_identity_id: String,
    pub supplier_id: String,
    pub category: DrugCategory,
    pub packaging_type: PackagingType,
    pub cost_price: Money,
    pub selling_price: Money,
    pub quantity: i64,
    pub expiration_date: String,
    pub can_have_alternate_forms: bool,
    pub alternate_forms: Vec<AlternateFormInput>,
}

/// One alternate form row from the inventory screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AlternateFormInput {
    pub packaging_type: PackagingType,
    pub selling_price: Money,
    pub quantity: i64,
}

// =============================================================================
// Transaction Record
// =============================================================================

/// One settled cart line. Append-only: never updated after insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TransactionRecord {
    pub id: String,
    pub drug_identity_id: String,
    /// unit price × quantity, exact in cents.
    pub total_amount: Money,
    pub quantity: i64,
    pub dosage_note: Option<String>,
    pub teller_id: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_round_trips_through_text() {
        for category in DrugCategory::ALL {
            assert_eq!(category.as_str().parse::<DrugCategory>().unwrap(), category);
        }
        assert_eq!(" Antibiotic ".parse::<DrugCategory>().unwrap(), DrugCategory::Antibiotic);
    }

    #[test]
    fn test_unknown_category_is_rejected() {
        let err = "snake_oil".parse::<DrugCategory>().unwrap_err();
        assert!(matches!(err, ValidationError::NotAllowed { ref field, .. } if field == "category"));
    }

    #[test]
    fn test_packaging_type_parsing_and_labels() {
        assert_eq!("strip".parse::<PackagingType>().unwrap(), PackagingType::Strip);
        assert_eq!(PackagingType::Carton.label(), "Carton");
        assert!("crate".parse::<PackagingType>().is_err());
    }

    #[test]
    fn test_enums_serialize_snake_case() {
        let json = serde_json::to_string(&DrugCategory::Antihypertensive).unwrap();
        assert_eq!(json, "\"antihypertensive\"");
        let json = serde_json::to_string(&PackagingType::Ampoule).unwrap();
        assert_eq!(json, "\"ampoule\"");
    }
}
