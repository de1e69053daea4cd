//! # Error Types
//!
//! Domain-specific error types for pharma-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  pharma-core errors (this file)                                        │
//! │  ├── CoreError        - Inventory / cart / settlement rule violations  │
//! │  └── ValidationError  - Malformed input                                │
//! │                                                                         │
//! │  pharma-db errors (separate crate)                                     │
//! │  └── DbError          - Database failures + Domain(CoreError)          │
//! │                                                                         │
//! │  pharma-pos errors                                                     │
//! │  └── PosError         - What the POS UI sees (code + message)          │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → PosError → POS UI       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every failed mutation surfaces one of these variants. Nothing is logged
//! and swallowed.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Inventory, cart and settlement errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Malformed input (negative price or quantity, bad date, empty id).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Unknown drug, alternate form or cart line.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The selected form has a stock ceiling of zero at add-time.
    ///
    /// ## User Workflow
    /// ```text
    /// Click "Add" on Amoxicillin 500mg
    ///      │
    ///      ▼
    /// Primary form stock: 0
    ///      │
    ///      ▼
    /// OutOfStock { drug_id } → UI shows "Out of stock", no line added
    /// ```
    #[error("Drug {drug_id} is out of stock")]
    OutOfStock { drug_id: String },

    /// A direct stock decrement asked for more than is on hand.
    #[error("Insufficient stock for {drug_id} ({form}): available {available}, requested {requested}")]
    InsufficientStock {
        drug_id: String,
        form: String,
        available: i64,
        requested: i64,
    },

    /// Stock changed between cart building and checkout.
    ///
    /// ## When This Occurs
    /// - Another terminal settled against the same drug first
    /// - An operator lowered the stock through an inventory update
    ///
    /// The whole checkout is rejected; no stock moves and no record is written.
    #[error("Stock changed for {drug_id} ({form}): available {available}, cart holds {requested}")]
    StockConflict {
        drug_id: String,
        form: String,
        available: i64,
        requested: i64,
    },

    /// Checkout was attempted with no lines in the cart.
    #[error("Cart is empty")]
    EmptyCart,
}

impl CoreError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur before any business logic runs, typically when the
/// inventory-management form is submitted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    Negative { field: String },

    /// Value is above its upper bound.
    #[error("{field} must be at most {max}")]
    TooLarge { field: String, max: i64 },

    /// Invalid format (e.g., invalid date, malformed price).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

impl ValidationError {
    pub(crate) fn negative(field: &str) -> Self {
        ValidationError::Negative {
            field: field.to_string(),
        }
    }

    pub(crate) fn too_large(field: &str, max: i64) -> Self {
        ValidationError::TooLarge {
            field: field.to_string(),
            max,
        }
    }

    pub(crate) fn required(field: &str) -> Self {
        ValidationError::Required {
            field: field.to_string(),
        }
    }

    pub(crate) fn invalid_format(field: &str, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            drug_id: "D1".to_string(),
            form: "primary".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for D1 (primary): available 3, requested 5"
        );

        let err = CoreError::not_found("Alternate form", "F9");
        assert_eq!(err.to_string(), "Alternate form not found: F9");

        assert_eq!(CoreError::EmptyCart.to_string(), "Cart is empty");
    }

    #[test]
    fn test_validation_error_messages() {
        assert_eq!(
            ValidationError::required("supplier_id").to_string(),
            "supplier_id is required"
        );
        assert_eq!(
            ValidationError::negative("cost_price").to_string(),
            "cost_price must not be negative"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::required("drug_identity_id").into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
