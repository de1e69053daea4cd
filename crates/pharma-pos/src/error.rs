//! # POS Error Type
//!
//! Unified error type handed to the POS screens.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Pharma POS                             │
//! │                                                                         │
//! │  Screen                      Rust Backend                               │
//! │  ──────                      ────────────                               │
//! │                                                                         │
//! │  session.change_quantity("D1", +1)                                      │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Service Method                                                  │  │
//! │  │  Result<T, PosError>                                             │  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Database Error? ─── DbError::QueryFailed("...") ──┐            │  │
//! │  │         │                (logged, generic message) │            │  │
//! │  │         ▼                                          ▼            │  │
//! │  │  Domain Error? ───── CoreError::StockConflict ─── PosError ────►│  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Success ──────────────────────────────────────────────────────►│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  { "code": "STOCK_CONFLICT",                                            │
//! │    "message": "Stock changed for D1 (primary): available 0, ..." }      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Domain errors keep their full message; they are what the operator acts
//! on. Infrastructure errors are logged here and replaced by a generic
//! message.

use serde::Serialize;
use pharma_core::{CoreError, ValidationError};
use pharma_db::DbError;

pub type PosResult<T> = Result<T, PosError>;

/// Error returned from every session and checkout operation.
///
/// ## Serialization
/// ```json
/// {
///   "code": "OUT_OF_STOCK",
///   "message": "Drug D1 is out of stock"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PosError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes, one per kind of failure the operator can see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Unknown drug, form or cart line
    NotFound,

    /// Input validation failed
    ValidationError,

    /// Zero stock when adding or switching form
    OutOfStock,

    /// Direct decrement larger than stock
    InsufficientStock,

    /// Stock moved under an open cart; checkout rejected
    StockConflict,

    /// Checkout of an empty cart
    EmptyCart,

    /// Database operation failed
    DatabaseError,

    /// Internal error
    Internal,
}

impl PosError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        PosError {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        PosError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        PosError::new(ErrorCode::ValidationError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        PosError::new(ErrorCode::Internal, message)
    }
}

impl From<CoreError> for PosError {
    fn from(err: CoreError) -> Self {
        let code = match &err {
            CoreError::Validation(_) => ErrorCode::ValidationError,
            CoreError::NotFound { .. } => ErrorCode::NotFound,
            CoreError::OutOfStock { .. } => ErrorCode::OutOfStock,
            CoreError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
            CoreError::StockConflict { .. } => ErrorCode::StockConflict,
            CoreError::EmptyCart => ErrorCode::EmptyCart,
        };
        PosError::new(code, err.to_string())
    }
}

impl From<ValidationError> for PosError {
    fn from(err: ValidationError) -> Self {
        PosError::from(CoreError::Validation(err))
    }
}

impl From<DbError> for PosError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Domain(core) => PosError::from(core),
            DbError::UniqueViolation { field, value } => PosError::new(
                ErrorCode::ValidationError,
                format!("{} '{}' already exists", field, value),
            ),
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                PosError::new(ErrorCode::ValidationError, "Invalid reference")
            }
            DbError::ConnectionFailed(e) => {
                tracing::error!("Database connection failed: {}", e);
                PosError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(e) => {
                tracing::error!("Database migration failed: {}", e);
                PosError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                // Log the actual error but return a generic message
                tracing::error!("Database query failed: {}", e);
                PosError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::TransactionFailed(e) => {
                tracing::error!("Transaction failed: {}", e);
                PosError::new(ErrorCode::DatabaseError, "Database transaction failed")
            }
            DbError::PoolExhausted => {
                PosError::new(ErrorCode::DatabaseError, "Database pool exhausted")
            }
            DbError::Corrupt { table, reason } => {
                tracing::error!(table = %table, "Corrupt row: {}", reason);
                PosError::new(ErrorCode::DatabaseError, "Stored data could not be read")
            }
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                PosError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

impl From<std::io::Error> for PosError {
    fn from(err: std::io::Error) -> Self {
        tracing::error!("I/O error: {}", err);
        PosError::internal(err.to_string())
    }
}

impl std::fmt::Display for PosError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for PosError {}
