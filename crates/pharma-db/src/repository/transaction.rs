//! # Transaction Repository
//!
//! The append-only sales ledger. Rows are written only by the settlement
//! unit of work and are never updated afterwards, so this repository
//! exposes reads plus a crate-private insert.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use pharma_core::{Money, TransactionRecord};

#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: String,
    drug_identity_id: String,
    total_amount_cents: i64,
    quantity: i64,
    dosage_note: Option<String>,
    teller_id: String,
    created_at: DateTime<Utc>,
}

impl From<TransactionRow> for TransactionRecord {
    fn from(row: TransactionRow) -> Self {
        TransactionRecord {
            id: row.id,
            drug_identity_id: row.drug_identity_id,
            total_amount: Money::from_cents(row.total_amount_cents),
            quantity: row.quantity,
            dosage_note: row.dosage_note,
            teller_id: row.teller_id,
            created_at: row.created_at,
        }
    }
}

const COLUMNS: &str =
    "id, drug_identity_id, total_amount_cents, quantity, dosage_note, teller_id, created_at";

/// Repository for ledger reads.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    pool: SqlitePool,
}

impl TransactionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        TransactionRepository { pool }
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<TransactionRecord>> {
        let sql = format!("SELECT {} FROM transactions WHERE id = ?", COLUMNS);
        let row = sqlx::query_as::<_, TransactionRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(TransactionRecord::from))
    }

    /// Everything one teller rang up, oldest first.
    pub async fn list_by_teller(&self, teller_id: &str) -> DbResult<Vec<TransactionRecord>> {
        debug!(teller_id = %teller_id, "Listing transactions by teller");
        let sql = format!(
            "SELECT {} FROM transactions WHERE teller_id = ? ORDER BY rowid",
            COLUMNS
        );
        let rows = sqlx::query_as::<_, TransactionRow>(&sql)
            .bind(teller_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(TransactionRecord::from).collect())
    }

    /// Sales history of one drug, oldest first.
    pub async fn list_for_drug(&self, drug_identity_id: &str) -> DbResult<Vec<TransactionRecord>> {
        debug!(drug_id = %drug_identity_id, "Listing transactions for drug");
        let sql = format!(
            "SELECT {} FROM transactions WHERE drug_identity_id = ? ORDER BY rowid",
            COLUMNS
        );
        let rows = sqlx::query_as::<_, TransactionRow>(&sql)
            .bind(drug_identity_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(TransactionRecord::from).collect())
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transactions")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

/// Appends one ledger row on the caller's connection.
pub(crate) async fn insert_record(
    conn: &mut SqliteConnection,
    record: &TransactionRecord,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO transactions (
            id, drug_identity_id, total_amount_cents, quantity,
            dosage_note, teller_id, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&record.id)
    .bind(&record.drug_identity_id)
    .bind(record.total_amount.cents())
    .bind(record.quantity)
    .bind(&record.dosage_note)
    .bind(&record.teller_id)
    .bind(record.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}
