//! # pharma-db: Database Layer for Pharma POS
//!
//! This crate provides database access for the Pharma POS system.
//! It uses SQLite for local storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Pharma POS Data Flow                             │
//! │                                                                         │
//! │  CartManager / SettlementService (pharma-pos)                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     pharma-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────────┐  ┌────────────┐  │   │
//! │  │   │   Database    │    │   Repositories     │  │ Migrations │  │   │
//! │  │   │   (pool.rs)   │    │                    │  │ (embedded) │  │   │
//! │  │   │               │    │ InventoryRepo      │  │            │  │   │
//! │  │   │ SqlitePool    │◄───│ CatalogRepo        │  │ 001_init   │  │   │
//! │  │   │               │    │ TransactionRepo    │  │            │  │   │
//! │  │   │               │    │ SettlementRepo     │  │            │  │   │
//! │  │   └───────────────┘    └────────────────────┘  └────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  pharmacy.db (WAL mode)                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`pool`] - Connection pool and [`Database`] handle
//! - [`migrations`] - Embedded schema migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pharma_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/pharmacy.db")).await?;
//!
//! let record = db.inventory().get("D1").await?;
//! let receipt_lines = db.settlement().commit(cart.lines(), "teller1").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::catalog::CatalogRepository;
pub use repository::inventory::{FlaggedRecord, InventoryRepository};
pub use repository::settlement::SettlementRepository;
pub use repository::transaction::TransactionRepository;
