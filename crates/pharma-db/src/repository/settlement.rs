//! # Settlement Repository
//!
//! The checkout unit of work: every stock decrement and every ledger row of
//! one cart commit together or not at all.
//!
//! ## One Checkout, One Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │                                                                         │
//! │  for each cart line:                                                    │
//! │    1. UPDATE <form stock> SET q = q - n WHERE ... AND q >= n            │
//! │         │                                                               │
//! │         ├── 1 row  ──► INSERT INTO transactions (...)                   │
//! │         │                                                               │
//! │         └── 0 rows ──► re-read record, resolve the form                 │
//! │                          ├── drug/form gone  → NotFound                 │
//! │                          └── stock too low   → StockConflict            │
//! │                                 │                                       │
//! │                                 ▼                                       │
//! │                        return Err, tx dropped = ROLLBACK                │
//! │                                                                         │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The decrement is the first statement of each line, so the transaction
//! takes SQLite's write lock before it reads anything. Two tills settling
//! the same drug are serialized by that lock; the second one sees the
//! first one's decrement and fails its compare-and-swap.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::inventory::{fetch_record, try_decrement};
use crate::repository::transaction::insert_record;
use pharma_core::validation::validate_teller_id;
use pharma_core::{resolve, CartLine, CoreError, TransactionRecord, ValidationError};

/// Repository for the atomic checkout.
#[derive(Debug, Clone)]
pub struct SettlementRepository {
    pool: SqlitePool,
}

impl SettlementRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SettlementRepository { pool }
    }

    /// Decrements stock for every line and appends one ledger row per line.
    ///
    /// ## Errors
    /// - `EmptyCart` when `lines` is empty
    /// - `Validation` for a blank teller id or a line quantity below 1
    /// - `NotFound` when a line's drug or form no longer exists
    /// - `StockConflict` when a line's quantity exceeds the live stock
    ///
    /// On any error no stock moves and no ledger row exists.
    pub async fn commit(
        &self,
        lines: &[CartLine],
        teller_id: &str,
    ) -> DbResult<Vec<TransactionRecord>> {
        if lines.is_empty() {
            return Err(CoreError::EmptyCart.into());
        }
        let teller_id = validate_teller_id(teller_id)?;
        if let Some(line) = lines.iter().find(|l| l.quantity < 1) {
            return Err(ValidationError::InvalidFormat {
                field: "quantity".to_string(),
                reason: format!("line for {} has quantity {}", line.drug_identity_id, line.quantity),
            }
            .into());
        }

        debug!(lines = lines.len(), teller_id = %teller_id, "Committing settlement");

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        let mut records = Vec::with_capacity(lines.len());

        for line in lines {
            let decremented =
                try_decrement(&mut *tx, &line.drug_identity_id, &line.selector, line.quantity)
                    .await?;

            if !decremented {
                let record = fetch_record(&mut *tx, &line.drug_identity_id)
                    .await?
                    .ok_or_else(|| DbError::not_found("Inventory record", &line.drug_identity_id))?;
                let available = resolve(&record, &line.selector)?.stock_ceiling;

                warn!(
                    drug_id = %line.drug_identity_id,
                    form = %line.selector,
                    available,
                    requested = line.quantity,
                    "Stock conflict at settlement, rolling back"
                );
                return Err(CoreError::StockConflict {
                    drug_id: line.drug_identity_id.clone(),
                    form: line.selector.to_string(),
                    available,
                    requested: line.quantity,
                }
                .into());
            }

            let record = TransactionRecord {
                id: Uuid::new_v4().to_string(),
                drug_identity_id: line.drug_identity_id.clone(),
                total_amount: line.line_total(),
                quantity: line.quantity,
                dosage_note: line.dosage_note.clone(),
                teller_id: teller_id.clone(),
                created_at: now,
            };
            insert_record(&mut *tx, &record).await?;
            records.push(record);
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(
            teller_id = %teller_id,
            lines = records.len(),
            "Settlement committed"
        );

        Ok(records)
    }
}
