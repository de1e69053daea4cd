//! # pharma-core: Pure Business Logic for Pharma POS
//!
//! Everything the pharmacy till decides without touching a database:
//! how a form is priced, how far a cart line may go, what a drug's stock
//! status is, and which inputs are acceptable.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Pharma POS Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    pharma-pos (session layer)                   │   │
//! │  │    CartManager ──► SettlementService ──► Receipt                │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ pharma-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐  ┌─────────┐  ┌─────────┐  ┌─────────┐  ┌──────┐ │   │
//! │  │   │  types  │  │  form   │  │  cart   │  │  stock  │  │money │ │   │
//! │  │   │ Record  │  │ resolve │  │  Cart   │  │ status  │  │Money │ │   │
//! │  │   └─────────┘  └─────────┘  └─────────┘  └─────────┘  └──────┘ │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    pharma-db (Database Layer)                   │   │
//! │  │     inventory store, catalog, ledger, atomic settlement         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Inventory records, alternate forms, transaction records
//! - [`form`] - Form Resolver (selector → price, label, stock ceiling)
//! - [`cart`] - Session cart with quantity clamping
//! - [`stock`] - Ok / OutOfStock / Expired classification
//! - [`money`] - Integer-cent money
//! - [`clock`] - Injectable time source
//! - [`validation`] - Input rules
//! - [`error`] - Domain error taxonomy
//!
//! ## Example Usage
//!
//! ```rust
//! use pharma_core::{Money, PLATFORM_FEE};
//!
//! let line_total = Money::from_cents(1000).multiply_quantity(5);
//! assert_eq!((line_total + PLATFORM_FEE).cents(), 5010);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod clock;
pub mod error;
pub mod form;
pub mod money;
pub mod stock;
pub mod types;
pub mod validation;

#[cfg(test)]
pub(crate) mod testing;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{Cart, CartLine, CartTotals};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{CoreError, CoreResult, ValidationError};
pub use form::{resolve, FormSelector, FormSnapshot, PRIMARY_SELECTOR};
pub use money::Money;
pub use stock::{stock_status, StockStatus};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Fixed fee added once to every cart total ($0.10).
pub const PLATFORM_FEE: Money = Money::from_cents(10);

/// Longest dosage note a cart line may carry.
pub const MAX_DOSAGE_NOTE_LEN: usize = 200;

/// Longest identifier accepted for drugs, suppliers and tellers.
pub const MAX_ID_LEN: usize = 64;

/// Highest price accepted for any form ($10,000,000.00).
pub const MAX_PRICE_CENTS: i64 = 1_000_000_000;

/// Highest stock count accepted for any form.
///
/// With [`MAX_PRICE_CENTS`] a single line tops out at 10^15 cents, so a cart
/// total stays far inside `i64`.
pub const MAX_QUANTITY: i64 = 1_000_000;
