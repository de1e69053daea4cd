//! # Till Configuration
//!
//! Stores configuration loaded at startup.
//!
//! ## Configuration Sources (Priority Order)
//! 1. Environment variables (`PHARMA_*`)
//! 2. Defaults (this file)
//!
//! Configuration is read-only after startup and is cloned into each service.

use std::path::PathBuf;

use directories::ProjectDirs;
use pharma_core::Money;
use serde::{Deserialize, Serialize};

use crate::error::{PosError, PosResult};

/// Most decimal places `format_currency` renders; larger settings are clamped.
pub const MAX_CURRENCY_DECIMALS: u8 = 4;

/// Till configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PosConfig {
    /// Store name (printed on receipts)
    pub store_name: String,

    /// Database file. `None` means the platform data directory.
    pub database_path: Option<PathBuf>,

    /// Currency symbol (for display)
    pub currency_symbol: String,

    /// Number of decimal places for currency (at most [`MAX_CURRENCY_DECIMALS`])
    pub currency_decimals: u8,

    /// Teller stamped on a checkout when the screen does not pass one
    pub default_teller: Option<String>,
}

impl Default for PosConfig {
    /// ## Default Values
    /// - Store: "Pharma POS Dev Pharmacy"
    /// - Database: platform data directory
    /// - Currency: $ with 2 decimals
    /// - Teller: none, every checkout must name one
    fn default() -> Self {
        PosConfig {
            store_name: "Pharma POS Dev Pharmacy".to_string(),
            database_path: None,
            currency_symbol: "$".to_string(),
            currency_decimals: 2,
            default_teller: None,
        }
    }
}

impl PosConfig {
    /// Creates a PosConfig from environment variables and defaults.
    ///
    /// ## Environment Variables
    /// - `PHARMA_STORE_NAME`: Override store name
    /// - `PHARMA_DB_PATH`: Use a specific database file
    /// - `PHARMA_CURRENCY_SYMBOL`: Override currency symbol
    /// - `PHARMA_DEFAULT_TELLER`: Teller used when a checkout names none
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`PosConfig::from_env`] with a pluggable variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = PosConfig::default();

        if let Some(store_name) = lookup("PHARMA_STORE_NAME") {
            config.store_name = store_name;
        }

        if let Some(path) = lookup("PHARMA_DB_PATH").filter(|p| !p.trim().is_empty()) {
            config.database_path = Some(PathBuf::from(path));
        }

        if let Some(symbol) = lookup("PHARMA_CURRENCY_SYMBOL") {
            config.currency_symbol = symbol;
        }

        if let Some(teller) = lookup("PHARMA_DEFAULT_TELLER").filter(|t| !t.trim().is_empty()) {
            config.default_teller = Some(teller);
        }

        config
    }

    /// Resolves the database file, creating its directory.
    ///
    /// ## Platform-Specific Paths
    /// - **macOS**: `~/Library/Application Support/com.pharma.pos/pharmacy.db`
    /// - **Windows**: `%APPDATA%\pharma\pos\data\pharmacy.db`
    /// - **Linux**: `~/.local/share/pos/pharmacy.db`
    pub fn resolve_database_path(&self) -> PosResult<PathBuf> {
        let path = match &self.database_path {
            Some(path) => path.clone(),
            None => {
                let proj_dirs = ProjectDirs::from("com", "pharma", "pos")
                    .ok_or_else(|| PosError::internal("Could not determine app data directory"))?;
                proj_dirs.data_dir().join("pharmacy.db")
            }
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        Ok(path)
    }

    /// Formats a cent amount as a currency string.
    ///
    /// ## Example
    /// ```rust
    /// use pharma_pos::PosConfig;
    ///
    /// let config = PosConfig::default();
    /// assert_eq!(config.format_currency(1234), "$12.34");
    /// ```
    pub fn format_currency(&self, cents: i64) -> String {
        let decimals = self.currency_decimals.min(MAX_CURRENCY_DECIMALS);
        let divisor = 10_u64.pow(u32::from(decimals));
        let magnitude = cents.unsigned_abs();
        let sign = if cents < 0 { "-" } else { "" };

        if decimals == 0 {
            return format!("{}{}{}", sign, self.currency_symbol, magnitude);
        }

        format!(
            "{}{}{}.{:0width$}",
            sign,
            self.currency_symbol,
            magnitude / divisor,
            magnitude % divisor,
            width = usize::from(decimals)
        )
    }

    pub fn format_money(&self, amount: Money) -> String {
        self.format_currency(amount.cents())
    }
}
