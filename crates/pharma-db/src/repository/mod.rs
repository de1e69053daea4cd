//! # Repository Module
//!
//! Database repository implementations for Pharma POS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  pharma-pos service                                                     │
//! │       │                                                                 │
//! │       │  db.inventory().get("D1")                                       │
//! │       ▼                                                                 │
//! │  InventoryRepository                                                    │
//! │  ├── upsert / get / list_active / list_by_category / list_flagged      │
//! │  └── decrement_stock                                                    │
//! │       │                                                                 │
//! │       │  SQL                                                            │
//! │       ▼                                                                 │
//! │  SQLite Database                                                        │
//! │                                                                         │
//! │  SQL lives here and nowhere else.                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`InventoryRepository`](inventory::InventoryRepository) - Inventory records and alternate forms
//! - [`CatalogRepository`](catalog::CatalogRepository) - Drug identity lookup
//! - [`TransactionRepository`](transaction::TransactionRepository) - Ledger reads
//! - [`SettlementRepository`](settlement::SettlementRepository) - Atomic checkout

pub mod catalog;
pub mod inventory;
pub mod settlement;
pub mod transaction;
