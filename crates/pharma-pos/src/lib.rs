//! # pharma-pos: Till Sessions and Checkout
//!
//! The layer the POS screens call. Each terminal holds its own
//! [`CartManager`]; all terminals share one [`SettlementService`].
//!
//! ## Module Organization
//! ```text
//! src/
//! ├── lib.rs            ◄─── You are here (startup helpers)
//! ├── cart_manager.rs   ◄─── Per-terminal cart session
//! ├── settlement.rs     ◄─── Checkout, receipts, stock status
//! ├── config.rs         ◄─── PosConfig
//! └── error.rs          ◄─── PosError handed to the screens
//! ```
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Till Startup                                      │
//! │                                                                         │
//! │  1. init_tracing() ──── tracing-subscriber with env filter              │
//! │                                                                         │
//! │  2. PosConfig::from_env() ──── PHARMA_* overrides on defaults           │
//! │                                                                         │
//! │  3. open_database(&config) ──── SQLite with WAL, pending migrations     │
//! │                                                                         │
//! │  4. SettlementService::new(db.clone(), config)                          │
//! │     CartManager::new(db.clone())  (one per terminal)                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Session Isolation
//! A cart is a value owned by its session, never global state. Two
//! terminals only meet at the database, where settlement serializes them.

pub mod cart_manager;
pub mod config;
pub mod error;
pub mod settlement;

#[cfg(test)]
pub(crate) mod testing;

pub use cart_manager::CartManager;
pub use config::{PosConfig, MAX_CURRENCY_DECIMALS};
pub use error::{ErrorCode, PosError, PosResult};
pub use settlement::{Receipt, ReceiptLine, SettlementService};

use pharma_db::{Database, DbConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=pharma=trace` - Show trace for pharma crates only
/// - Default: `info,pharma=debug,sqlx=warn`
///
/// Calling it again after a subscriber is installed does nothing.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,pharma=debug,sqlx=warn"));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Opens the till database named by `config`, running migrations.
pub async fn open_database(config: &PosConfig) -> PosResult<Database> {
    let path = config.resolve_database_path()?;
    info!(path = %path.display(), "Opening till database");

    let db = Database::new(DbConfig::new(path)).await?;
    Ok(db)
}
