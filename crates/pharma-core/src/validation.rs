//! # Validation Module
//!
//! Input validation for inventory edits, cart notes and ledger stamping.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Inventory screen                                              │
//! │  └── Field shapes (empty, numeric)                                      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                   │
//! │  ├── Prices and quantities are non-negative                             │
//! │  ├── Ids are present and bounded                                        │
//! │  └── Expiration date parses                                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                        │
//! │  ├── UNIQUE(drug_identity_id)                                           │
//! │  └── CHECK (quantity >= 0), foreign keys                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use pharma_core::validation::{parse_expiration_date, validate_dosage_note};
//!
//! assert!(parse_expiration_date("2026-03-31").is_ok());
//! assert!(parse_expiration_date("31/03/2026").is_err());
//! assert_eq!(validate_dosage_note(Some("  ")).unwrap(), None);
//! ```

use chrono::{DateTime, NaiveDate};

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{AlternateFormInput, DrugCategory, InventoryInput, PackagingType, PrimaryForm};
use crate::{MAX_DOSAGE_NOTE_LEN, MAX_ID_LEN, MAX_PRICE_CENTS, MAX_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Validated Inventory
// =============================================================================

/// An [`InventoryInput`] that passed every check, with its date parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedInventory {
    pub drug_identity_id: String,
    pub supplier_id: String,
    pub category: DrugCategory,
    pub primary_form: PrimaryForm,
    pub expiration_date: NaiveDate,
    pub can_have_alternate_forms: bool,
    pub alternate_forms: Vec<ValidatedAlternateForm>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedAlternateForm {
    pub packaging_type: PackagingType,
    pub selling_price: Money,
    pub quantity: i64,
}

/// Validates the inventory screen payload.
///
/// ## Rules
/// - `drug_identity_id` and `supplier_id` are non-empty ids
/// - cost and selling price in `0..=MAX_PRICE_CENTS`, quantity in `0..=MAX_QUANTITY`
/// - every alternate form obeys the same price and quantity bounds
/// - `expiration_date` is `YYYY-MM-DD` or an RFC 3339 timestamp
///
/// Alternate forms are validated even when `can_have_alternate_forms` is
/// false; the store decides what to do with them.
pub fn validate_inventory_input(input: &InventoryInput) -> ValidationResult<ValidatedInventory> {
    let drug_identity_id = validate_id("drug_identity_id", &input.drug_identity_id)?;
    let supplier_id = validate_id("supplier_id", &input.supplier_id)?;

    price_in_range("cost_price", input.cost_price)?;
    price_in_range("selling_price", input.selling_price)?;
    quantity_in_range("quantity", input.quantity)?;

    let expiration_date = parse_expiration_date(&input.expiration_date)?;

    let alternate_forms = input
        .alternate_forms
        .iter()
        .map(validate_alternate_form)
        .collect::<ValidationResult<Vec<_>>>()?;

    Ok(ValidatedInventory {
        drug_identity_id,
        supplier_id,
        category: input.category,
        primary_form: PrimaryForm {
            packaging_type: input.packaging_type,
            cost_price: input.cost_price,
            selling_price: input.selling_price,
            quantity: input.quantity,
        },
        expiration_date,
        can_have_alternate_forms: input.can_have_alternate_forms,
        alternate_forms,
    })
}

fn validate_alternate_form(form: &AlternateFormInput) -> ValidationResult<ValidatedAlternateForm> {
    price_in_range("alternate_forms.selling_price", form.selling_price)?;
    quantity_in_range("alternate_forms.quantity", form.quantity)?;
    Ok(ValidatedAlternateForm {
        packaging_type: form.packaging_type,
        selling_price: form.selling_price,
        quantity: form.quantity,
    })
}

// =============================================================================
// Field Validators
// =============================================================================

/// Parses an expiration date.
///
/// Accepts a calendar date (`2026-03-31`) or a full timestamp
/// (`2026-03-31T00:00:00Z`); only the date part of a timestamp is kept.
pub fn parse_expiration_date(text: &str) -> ValidationResult<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ValidationError::required("expiration_date"));
    }

    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(stamp) = DateTime::parse_from_rfc3339(text) {
        return Ok(stamp.date_naive());
    }

    Err(ValidationError::invalid_format(
        "expiration_date",
        format!("'{}' is not a valid date (expected YYYY-MM-DD)", text),
    ))
}

/// Validates an identifier and returns it trimmed.
///
/// ## Example
/// ```rust
/// use pharma_core::validation::validate_id;
///
/// assert_eq!(validate_id("teller_id", " T-01 ").unwrap(), "T-01");
/// assert!(validate_id("teller_id", "").is_err());
/// ```
pub fn validate_id(field: &str, value: &str) -> ValidationResult<String> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::required(field));
    }

    if value.chars().count() > MAX_ID_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_ID_LEN,
        });
    }

    Ok(value.to_string())
}

pub fn validate_teller_id(teller_id: &str) -> ValidationResult<String> {
    validate_id("teller_id", teller_id)
}

/// Normalizes a dosage note: trimmed, blank becomes `None`, at most
/// [`MAX_DOSAGE_NOTE_LEN`] characters.
pub fn validate_dosage_note(note: Option<&str>) -> ValidationResult<Option<String>> {
    let Some(note) = note.map(str::trim).filter(|n| !n.is_empty()) else {
        return Ok(None);
    };

    if note.chars().count() > MAX_DOSAGE_NOTE_LEN {
        return Err(ValidationError::TooLong {
            field: "dosage_note".to_string(),
            max: MAX_DOSAGE_NOTE_LEN,
        });
    }

    Ok(Some(note.to_string()))
}

/// Validates a direct stock decrement amount. Zero is allowed and moves nothing.
pub fn validate_decrement_amount(amount: i64) -> ValidationResult<()> {
    if amount < 0 {
        return Err(ValidationError::negative("amount"));
    }
    Ok(())
}

/// Validates a catalog search query.
///
/// ## Rules
/// - Can be empty (returns the first page of the catalog)
/// - Maximum 100 characters
///
/// ## Returns
/// The trimmed query string.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.chars().count() > 100 {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

fn price_in_range(field: &str, value: Money) -> ValidationResult<()> {
    if value.is_negative() {
        return Err(ValidationError::negative(field));
    }
    if value.cents() > MAX_PRICE_CENTS {
        return Err(ValidationError::too_large(field, MAX_PRICE_CENTS));
    }
    Ok(())
}

fn quantity_in_range(field: &str, value: i64) -> ValidationResult<()> {
    if value < 0 {
        return Err(ValidationError::negative(field));
    }
    if value > MAX_QUANTITY {
        return Err(ValidationError::too_large(field, MAX_QUANTITY));
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
