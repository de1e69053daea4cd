//! # Form Resolver
//!
//! Turns an `(InventoryRecord, FormSelector)` pair into the immutable
//! [`FormSnapshot`] a cart line is priced and bounded by.
//!
//! ## Resolution
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  resolve(record, selector)                                              │
//! │                                                                         │
//! │  "primary" ─────────► primary_form.selling_price                        │
//! │                       primary_form.packaging_type                       │
//! │                       primary_form.quantity            = ceiling        │
//! │                                                                         │
//! │  "<form id>" ───────► alternate_forms[id].selling_price                 │
//! │                       alternate_forms[id].packaging_type                │
//! │                       alternate_forms[id].quantity_in_base_units = ceil │
//! │                                                                         │
//! │  anything else ─────► NotFound                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The snapshot is only as fresh as the record passed in. Callers that need
//! live stock re-fetch the record and resolve again.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{InventoryRecord, PackagingType};

/// Literal text of the primary form selector.
pub const PRIMARY_SELECTOR: &str = "primary";

// =============================================================================
// Form Selector
// =============================================================================

/// Chooses which form of a drug a cart line represents.
///
/// Serialized as the plain string `"primary"` or the alternate form id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum FormSelector {
    #[default]
    Primary,
    Alternate(String),
}

impl FormSelector {
    pub fn alternate(form_id: impl Into<String>) -> Self {
        FormSelector::Alternate(form_id.into())
    }

    pub fn as_str(&self) -> &str {
        match self {
            FormSelector::Primary => PRIMARY_SELECTOR,
            FormSelector::Alternate(id) => id,
        }
    }

    pub fn is_primary(&self) -> bool {
        matches!(self, FormSelector::Primary)
    }
}

impl fmt::Display for FormSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormSelector {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == PRIMARY_SELECTOR {
            Ok(FormSelector::Primary)
        } else {
            Ok(FormSelector::Alternate(s.to_string()))
        }
    }
}

impl From<&str> for FormSelector {
    fn from(s: &str) -> Self {
        match s.parse() {
            Ok(selector) => selector,
            Err(never) => match never {},
        }
    }
}

impl Serialize for FormSelector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FormSelector {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Ok(FormSelector::from(text.as_str()))
    }
}

// =============================================================================
// Form Snapshot
// =============================================================================

/// Price, label and stock ceiling of one form at resolution time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct FormSnapshot {
    #[ts(type = "string")]
    pub selector: FormSelector,
    pub unit_price: Money,
    pub packaging_type: PackagingType,
    pub packaging_label: String,
    /// Maximum quantity currently sellable, equal to the persisted stock.
    pub stock_ceiling: i64,
}

/// Resolves a form selector against a record snapshot.
///
/// ## Errors
/// `CoreError::NotFound` when the selector names no form on this record.
///
/// ## Example
/// ```rust,ignore
/// let snapshot = resolve(&record, &FormSelector::Primary)?;
/// assert_eq!(snapshot.stock_ceiling, record.primary_form.quantity);
/// ```
pub fn resolve(record: &InventoryRecord, selector: &FormSelector) -> CoreResult<FormSnapshot> {
    match selector {
        FormSelector::Primary => {
            let primary = &record.primary_form;
            Ok(FormSnapshot {
                selector: FormSelector::Primary,
                unit_price: primary.selling_price,
                packaging_type: primary.packaging_type,
                packaging_label: primary.packaging_type.label().to_string(),
                stock_ceiling: primary.quantity.max(0),
            })
        }
        FormSelector::Alternate(form_id) => {
            let form = record
                .alternate_form(form_id)
                .ok_or_else(|| CoreError::not_found("Alternate form", form_id.as_str()))?;
            Ok(FormSnapshot {
                selector: selector.clone(),
                unit_price: form.selling_price,
                packaging_type: form.packaging_type,
                packaging_label: form.packaging_type.label().to_string(),
                stock_ceiling: form.quantity_in_base_units.max(0),
            })
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{record_with_forms, sample_record};

    #[test]
    fn test_resolve_primary() {
        let record = sample_record("D1", 1000, 5);
        let snapshot = resolve(&record, &FormSelector::Primary).unwrap();

        assert_eq!(snapshot.unit_price, Money::from_cents(1000));
        assert_eq!(snapshot.packaging_label, "Carton");
        assert_eq!(snapshot.stock_ceiling, 5);
        assert!(snapshot.selector.is_primary());
    }

    #[test]
    fn test_resolve_alternate() {
        let record = record_with_forms("D1", 1000, 5, &[("F1", 250, 2)]);
        let snapshot = resolve(&record, &FormSelector::alternate("F1")).unwrap();

        assert_eq!(snapshot.unit_price, Money::from_cents(250));
        assert_eq!(snapshot.packaging_label, "Strip");
        assert_eq!(snapshot.stock_ceiling, 2);
        assert_eq!(snapshot.selector, FormSelector::alternate("F1"));
    }

    #[test]
    fn test_resolve_unknown_form_is_not_found() {
        let record = record_with_forms("D1", 1000, 5, &[("F1", 250, 2)]);
        let err = resolve(&record, &FormSelector::alternate("F404")).unwrap_err();
        assert_eq!(err, CoreError::not_found("Alternate form", "F404"));
    }

    #[test]
    fn test_duplicate_packaging_types_resolve_by_id() {
        let record = record_with_forms("D1", 1000, 5, &[("F1", 250, 2), ("F2", 300, 7)]);
        let first = resolve(&record, &FormSelector::alternate("F1")).unwrap();
        let second = resolve(&record, &FormSelector::alternate("F2")).unwrap();

        assert_eq!(first.packaging_type, second.packaging_type);
        assert_eq!(first.stock_ceiling, 2);
        assert_eq!(second.stock_ceiling, 7);
    }

    #[test]
    fn test_selector_text_form() {
        assert_eq!(FormSelector::from("primary"), FormSelector::Primary);
        assert_eq!(FormSelector::from("F1"), FormSelector::alternate("F1"));
        assert_eq!(FormSelector::Primary.to_string(), "primary");

        let json = serde_json::to_string(&FormSelector::alternate("F1")).unwrap();
        assert_eq!(json, "\"F1\"");
        let back: FormSelector = serde_json::from_str("\"primary\"").unwrap();
        assert_eq!(back, FormSelector::Primary);
    }
}
