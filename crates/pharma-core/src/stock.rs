//! # Stock Classification
//!
//! Read-only status used by the inventory panels.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  expiration_date (00:00 UTC) < now ? ───yes──► Expired                  │
//! │              │ no                                                       │
//! │              ▼                                                          │
//! │  primary qty == 0 AND no alternate form with qty > 0 ? ──yes──► OutOfStock
//! │              │ no                                                       │
//! │              ▼                                                          │
//! │             Ok                                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Expired wins over OutOfStock. The status never gates adding to a cart or
//! settling; only stock ceilings do.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::types::InventoryRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    Ok,
    OutOfStock,
    Expired,
}

impl StockStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            StockStatus::Ok => "ok",
            StockStatus::OutOfStock => "out_of_stock",
            StockStatus::Expired => "expired",
        }
    }

    /// True for the statuses shown on the "needs attention" panel.
    pub const fn is_flagged(&self) -> bool {
        !matches!(self, StockStatus::Ok)
    }
}

impl fmt::Display for StockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An expiration date lapses at the start of that day, UTC.
pub fn is_expired(expiration_date: NaiveDate, now: DateTime<Utc>) -> bool {
    expiration_date.and_time(NaiveTime::MIN).and_utc() < now
}

/// Classifies a record at instant `now`.
pub fn stock_status(record: &InventoryRecord, now: DateTime<Utc>) -> StockStatus {
    if is_expired(record.expiration_date, now) {
        StockStatus::Expired
    } else if record.primary_form.quantity <= 0 && !record.has_alternate_stock() {
        StockStatus::OutOfStock
    } else {
        StockStatus::Ok
    }
}

impl InventoryRecord {
    pub fn stock_status(&self, now: DateTime<Utc>) -> StockStatus {
        stock_status(self, now)
    }
}
