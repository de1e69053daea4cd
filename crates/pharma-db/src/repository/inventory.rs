//! # Inventory Repository
//!
//! The Inventory Record Store: one authoritative stock/price entry per drug,
//! with its alternate forms as owned children.
//!
//! ## Tables
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  inventory_records                        alternate_forms               │
//! │  ─────────────────                        ───────────────               │
//! │  id                 PK  ◄──────────────── inventory_record_id (CASCADE) │
//! │  drug_identity_id   UNIQUE                position  (insertion order)   │
//! │  supplier_id, category                    packaging_type                │
//! │  packaging_type     ┐                     selling_price_cents           │
//! │  cost_price_cents   │ primary form        quantity_in_base_units        │
//! │  selling_price_cents│                                                   │
//! │  quantity           ┘                                                   │
//! │  expiration_date, can_have_alternate_forms, created_at, updated_at     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Upsert and Alternate Forms
//! ```text
//! upsert(input)
//!   │
//!   ├── INSERT ... ON CONFLICT(drug_identity_id) DO UPDATE   (scalars)
//!   │
//!   ├── flag = false             → DELETE every alternate form
//!   ├── flag = true, forms = []  → leave existing forms as they are
//!   └── flag = true, forms = [..]→ DELETE all, INSERT the new list
//!
//!   all inside one transaction
//! ```
//!
//! ## Stock Decrement
//! A decrement is a single compare-and-swap statement:
//! `UPDATE ... SET q = q - n WHERE ... AND q >= n`. Zero affected rows means
//! the stock was short (or the row is missing), and nothing changed.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::HashMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use pharma_core::validation::{validate_decrement_amount, validate_id, validate_inventory_input};
use pharma_core::{
    resolve, stock_status, AlternateForm, CoreError, DrugCategory, FormSelector, InventoryInput,
    InventoryRecord, Money, PackagingType, PrimaryForm, StockStatus,
};

// =============================================================================
// Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct InventoryRow {
    id: String,
    drug_identity_id: String,
    supplier_id: String,
    category: DrugCategory,
    packaging_type: PackagingType,
    cost_price_cents: i64,
    selling_price_cents: i64,
    quantity: i64,
    expiration_date: NaiveDate,
    can_have_alternate_forms: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl InventoryRow {
    fn into_record(self, alternate_forms: Vec<AlternateForm>) -> InventoryRecord {
        InventoryRecord {
            id: self.id,
            drug_identity_id: self.drug_identity_id,
            supplier_id: self.supplier_id,
            category: self.category,
            primary_form: PrimaryForm {
                packaging_type: self.packaging_type,
                cost_price: Money::from_cents(self.cost_price_cents),
                selling_price: Money::from_cents(self.selling_price_cents),
                quantity: self.quantity,
            },
            expiration_date: self.expiration_date,
            can_have_alternate_forms: self.can_have_alternate_forms,
            alternate_forms,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AlternateFormRow {
    id: String,
    inventory_record_id: String,
    packaging_type: PackagingType,
    selling_price_cents: i64,
    quantity_in_base_units: i64,
}

impl From<AlternateFormRow> for AlternateForm {
    fn from(row: AlternateFormRow) -> Self {
        AlternateForm {
            id: row.id,
            inventory_record_id: row.inventory_record_id,
            packaging_type: row.packaging_type,
            selling_price: Money::from_cents(row.selling_price_cents),
            quantity_in_base_units: row.quantity_in_base_units,
        }
    }
}

const RECORD_COLUMNS: &str = r#"
    id, drug_identity_id, supplier_id, category, packaging_type,
    cost_price_cents, selling_price_cents, quantity, expiration_date,
    can_have_alternate_forms, created_at, updated_at
"#;

const FORM_COLUMNS: &str = r#"
    id, inventory_record_id, packaging_type, selling_price_cents, quantity_in_base_units
"#;

/// A record that needs attention, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlaggedRecord {
    pub record: InventoryRecord,
    pub status: StockStatus,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for inventory records and their alternate forms.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.inventory();
///
/// let record = repo.upsert(&input).await?;
/// let after = repo.decrement_stock("D1", &FormSelector::Primary, 2).await?;
/// ```
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
}

impl InventoryRepository {
    /// Creates a new InventoryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InventoryRepository { pool }
    }

    /// Creates or updates the single record for `input.drug_identity_id`.
    ///
    /// ## Errors
    /// - `Domain(Validation)` for negative prices or quantities, empty ids
    ///   or an unparseable expiration date. Nothing is written.
    ///
    /// Calling it twice with identical input leaves exactly one record.
    pub async fn upsert(&self, input: &InventoryInput) -> DbResult<InventoryRecord> {
        let valid = validate_inventory_input(input)?;

        debug!(
            drug_id = %valid.drug_identity_id,
            alternate_forms = valid.alternate_forms.len(),
            flag = valid.can_have_alternate_forms,
            "Upserting inventory record"
        );

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let record_id: String = sqlx::query_scalar(
            r#"
            INSERT INTO inventory_records (
                id, drug_identity_id, supplier_id, category, packaging_type,
                cost_price_cents, selling_price_cents, quantity, expiration_date,
                can_have_alternate_forms, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (drug_identity_id) DO UPDATE SET
                supplier_id = excluded.supplier_id,
                category = excluded.category,
                packaging_type = excluded.packaging_type,
                cost_price_cents = excluded.cost_price_cents,
                selling_price_cents = excluded.selling_price_cents,
                quantity = excluded.quantity,
                expiration_date = excluded.expiration_date,
                can_have_alternate_forms = excluded.can_have_alternate_forms,
                updated_at = excluded.updated_at
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&valid.drug_identity_id)
        .bind(&valid.supplier_id)
        .bind(valid.category)
        .bind(valid.primary_form.packaging_type)
        .bind(valid.primary_form.cost_price.cents())
        .bind(valid.primary_form.selling_price.cents())
        .bind(valid.primary_form.quantity)
        .bind(valid.expiration_date)
        .bind(valid.can_have_alternate_forms)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        let replace_forms = !valid.can_have_alternate_forms || !valid.alternate_forms.is_empty();
        if replace_forms {
            let removed = sqlx::query("DELETE FROM alternate_forms WHERE inventory_record_id = ?")
                .bind(&record_id)
                .execute(&mut *tx)
                .await?
                .rows_affected();
            debug!(record_id = %record_id, removed, "Cleared alternate forms");
        }

        if valid.can_have_alternate_forms {
            for (position, form) in valid.alternate_forms.iter().enumerate() {
                sqlx::query(
                    r#"
                    INSERT INTO alternate_forms (
                        id, inventory_record_id, position, packaging_type,
                        selling_price_cents, quantity_in_base_units
                    ) VALUES (?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(Uuid::new_v4().to_string())
                .bind(&record_id)
                .bind(position as i64)
                .bind(form.packaging_type)
                .bind(form.selling_price.cents())
                .bind(form.quantity)
                .execute(&mut *tx)
                .await?;
            }
        }

        let record = fetch_record(&mut *tx, &valid.drug_identity_id)
            .await?
            .ok_or_else(|| DbError::not_found("Inventory record", &valid.drug_identity_id))?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(
            drug_id = %record.drug_identity_id,
            record_id = %record.id,
            quantity = record.primary_form.quantity,
            alternate_forms = record.alternate_forms.len(),
            "Inventory record saved"
        );

        Ok(record)
    }

    /// Gets the record for a drug, or `None` if the drug is untracked.
    ///
    /// The id is trimmed the same way `upsert` trims it before storing.
    pub async fn get(&self, drug_identity_id: &str) -> DbResult<Option<InventoryRecord>> {
        let drug_identity_id = validate_id("drug_identity_id", drug_identity_id)?;
        debug!(drug_id = %drug_identity_id, "Fetching inventory record");
        let mut conn = self.pool.acquire().await?;
        fetch_record(&mut *conn, &drug_identity_id).await
    }

    /// All records in creation order, alternate forms attached.
    pub async fn list_active(&self) -> DbResult<Vec<InventoryRecord>> {
        let sql = format!(
            "SELECT {} FROM inventory_records ORDER BY rowid",
            RECORD_COLUMNS
        );
        let rows = sqlx::query_as::<_, InventoryRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        let form_sql = format!(
            "SELECT {} FROM alternate_forms ORDER BY inventory_record_id, position",
            FORM_COLUMNS
        );
        let forms = sqlx::query_as::<_, AlternateFormRow>(&form_sql)
            .fetch_all(&self.pool)
            .await?;

        let records = attach_forms(rows, forms);
        debug!(count = records.len(), "Listed inventory records");
        Ok(records)
    }

    /// Records of one category, in creation order.
    pub async fn list_by_category(&self, category: DrugCategory) -> DbResult<Vec<InventoryRecord>> {
        let sql = format!(
            "SELECT {} FROM inventory_records WHERE category = ? ORDER BY rowid",
            RECORD_COLUMNS
        );
        let rows = sqlx::query_as::<_, InventoryRow>(&sql)
            .bind(category)
            .fetch_all(&self.pool)
            .await?;

        let form_sql = format!(
            r#"
            SELECT {} FROM alternate_forms
            WHERE inventory_record_id IN (SELECT id FROM inventory_records WHERE category = ?)
            ORDER BY inventory_record_id, position
            "#,
            FORM_COLUMNS
        );
        let forms = sqlx::query_as::<_, AlternateFormRow>(&form_sql)
            .bind(category)
            .fetch_all(&self.pool)
            .await?;

        let records = attach_forms(rows, forms);
        debug!(category = %category, count = records.len(), "Listed records by category");
        Ok(records)
    }

    /// Records that are expired or out of stock at `now`.
    pub async fn list_flagged(&self, now: DateTime<Utc>) -> DbResult<Vec<FlaggedRecord>> {
        let flagged: Vec<FlaggedRecord> = self
            .list_active()
            .await?
            .into_iter()
            .filter_map(|record| {
                let status = stock_status(&record, now);
                status.is_flagged().then_some(FlaggedRecord { record, status })
            })
            .collect();

        debug!(count = flagged.len(), "Listed flagged records");
        Ok(flagged)
    }

    /// Atomically lowers one form's stock by `amount` and returns the record
    /// as it is afterwards.
    ///
    /// ## Errors
    /// - `Validation` when `amount` is negative
    /// - `NotFound` for an unknown drug or form
    /// - `InsufficientStock` when `amount` exceeds the stock; nothing changes
    ///
    /// An `amount` of zero changes nothing and still reports unknown drugs
    /// and forms.
    pub async fn decrement_stock(
        &self,
        drug_identity_id: &str,
        selector: &FormSelector,
        amount: i64,
    ) -> DbResult<InventoryRecord> {
        validate_decrement_amount(amount)?;
        let drug_identity_id = validate_id("drug_identity_id", drug_identity_id)?;

        debug!(drug_id = %drug_identity_id, form = %selector, amount, "Decrementing stock");

        let mut tx = self.pool.begin().await?;

        if amount > 0 && try_decrement(&mut *tx, &drug_identity_id, selector, amount).await? {
            let record = fetch_record(&mut *tx, &drug_identity_id)
                .await?
                .ok_or_else(|| DbError::not_found("Inventory record", &drug_identity_id))?;
            tx.commit()
                .await
                .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

            info!(drug_id = %drug_identity_id, form = %selector, amount, "Stock decremented");
            return Ok(record);
        }

        let record = fetch_record(&mut *tx, &drug_identity_id)
            .await?
            .ok_or_else(|| DbError::not_found("Inventory record", &drug_identity_id))?;
        let available = resolve(&record, selector)?.stock_ceiling;

        if amount == 0 {
            return Ok(record);
        }

        warn!(
            drug_id = %drug_identity_id,
            form = %selector,
            available,
            requested = amount,
            "Insufficient stock for decrement"
        );
        Err(CoreError::InsufficientStock {
            drug_id: drug_identity_id,
            form: selector.to_string(),
            available,
            requested: amount,
        }
        .into())
    }

    /// Counts inventory records (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM inventory_records")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Shared Helpers
// =============================================================================

/// Loads one record with its forms on an existing connection, so it can run
/// inside a caller's transaction.
pub(crate) async fn fetch_record(
    conn: &mut SqliteConnection,
    drug_identity_id: &str,
) -> DbResult<Option<InventoryRecord>> {
    let sql = format!(
        "SELECT {} FROM inventory_records WHERE drug_identity_id = ?",
        RECORD_COLUMNS
    );
    let Some(row) = sqlx::query_as::<_, InventoryRow>(&sql)
        .bind(drug_identity_id)
        .fetch_optional(&mut *conn)
        .await?
    else {
        return Ok(None);
    };

    let form_sql = format!(
        "SELECT {} FROM alternate_forms WHERE inventory_record_id = ? ORDER BY position",
        FORM_COLUMNS
    );
    let forms = sqlx::query_as::<_, AlternateFormRow>(&form_sql)
        .bind(&row.id)
        .fetch_all(&mut *conn)
        .await?
        .into_iter()
        .map(AlternateForm::from)
        .collect();

    Ok(Some(row.into_record(forms)))
}

/// Compare-and-swap decrement of one form's stock.
///
/// Returns `false` when no row qualified: the drug or form is missing, or
/// its stock is below `amount`. Nothing is written in that case.
pub(crate) async fn try_decrement(
    conn: &mut SqliteConnection,
    drug_identity_id: &str,
    selector: &FormSelector,
    amount: i64,
) -> DbResult<bool> {
    let now = Utc::now();

    let affected = match selector {
        FormSelector::Primary => sqlx::query(
            r#"
            UPDATE inventory_records
            SET quantity = quantity - ?, updated_at = ?
            WHERE drug_identity_id = ? AND quantity >= ?
            "#,
        )
        .bind(amount)
        .bind(now)
        .bind(drug_identity_id)
        .bind(amount)
        .execute(&mut *conn)
        .await?
        .rows_affected(),

        FormSelector::Alternate(form_id) => {
            let affected = sqlx::query(
                r#"
                UPDATE alternate_forms
                SET quantity_in_base_units = quantity_in_base_units - ?
                WHERE id = ?
                  AND inventory_record_id =
                      (SELECT id FROM inventory_records WHERE drug_identity_id = ?)
                  AND quantity_in_base_units >= ?
                "#,
            )
            .bind(amount)
            .bind(form_id)
            .bind(drug_identity_id)
            .bind(amount)
            .execute(&mut *conn)
            .await?
            .rows_affected();

            if affected > 0 {
                sqlx::query("UPDATE inventory_records SET updated_at = ? WHERE drug_identity_id = ?")
                    .bind(now)
                    .bind(drug_identity_id)
                    .execute(&mut *conn)
                    .await?;
            }
            affected
        }
    };

    Ok(affected == 1)
}

fn attach_forms(rows: Vec<InventoryRow>, forms: Vec<AlternateFormRow>) -> Vec<InventoryRecord> {
    let mut by_record: HashMap<String, Vec<AlternateForm>> = HashMap::new();
    for form in forms {
        by_record
            .entry(form.inventory_record_id.clone())
            .or_default()
            .push(form.into());
    }

    rows.into_iter()
        .map(|row| {
            let forms = by_record.remove(&row.id).unwrap_or_default();
            row.into_record(forms)
        })
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use chrono::TimeZone;
    use pharma_core::{AlternateFormInput, ValidationError};

    async fn repo() -> InventoryRepository {
        Database::new(DbConfig::in_memory()).await.unwrap().inventory()
    }

    fn input(drug_id: &str, price_cents: i64, qty: i64) -> InventoryInput {
        InventoryInput {
            drug_identity_id: drug_id.to_string(),
            supplier_id: "SUP-1".to_string(),
            category: DrugCategory::Analgesic,
            packaging_type: PackagingType::Carton,
            cost_price: Money::from_cents(price_cents / 2),
            selling_price: Money::from_cents(price_cents),
            quantity: qty,
            expiration_date: "2030-01-01".to_string(),
            can_have_alternate_forms: false,
            alternate_forms: Vec::new(),
        }
    }

    fn strip(price_cents: i64, qty: i64) -> AlternateFormInput {
        AlternateFormInput {
            packaging_type: PackagingType::Strip,
            selling_price: Money::from_cents(price_cents),
            quantity: qty,
        }
    }

    fn with_forms(mut input: InventoryInput, forms: Vec<AlternateFormInput>) -> InventoryInput {
        input.can_have_alternate_forms = true;
        input.alternate_forms = forms;
        input
    }

    #[tokio::test]
    async fn test_upsert_creates_and_reads_back() {
        let repo = repo().await;
        let saved = repo
            .upsert(&with_forms(input("D1", 1000, 5), vec![strip(250, 2), strip(300, 4)]))
            .await
            .unwrap();

        let fetched = repo.get("D1").await.unwrap().unwrap();
        assert_eq!(fetched, saved);
        assert_eq!(fetched.primary_form.selling_price, Money::from_cents(1000));
        assert_eq!(fetched.expiration_date, NaiveDate::from_ymd_opt(2030, 1, 1).unwrap());
        assert_eq!(fetched.alternate_forms.len(), 2);
        assert_eq!(fetched.alternate_forms[0].selling_price, Money::from_cents(250));
        assert_eq!(fetched.alternate_forms[1].quantity_in_base_units, 4);
        assert!(fetched
            .alternate_forms
            .iter()
            .all(|f| f.inventory_record_id == fetched.id));
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let repo = repo().await;
        let payload = with_forms(input("D1", 1000, 5), vec![strip(250, 2)]);

        let first = repo.upsert(&payload).await.unwrap();
        let second = repo.upsert(&payload).await.unwrap();

        assert_eq!(repo.count().await.unwrap(), 1);
        assert_eq!(first.id, second.id);
        assert_eq!(second.alternate_forms.len(), 1);
    }

    #[tokio::test]
    async fn test_upsert_updates_scalars_in_place() {
        let repo = repo().await;
        let created = repo.upsert(&input("D1", 1000, 5)).await.unwrap();

        let mut changed = input("D1", 1200, 9);
        changed.supplier_id = "SUP-2".to_string();
        changed.category = DrugCategory::Antibiotic;
        let updated = repo.upsert(&changed).await.unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(updated.supplier_id, "SUP-2");
        assert_eq!(updated.category, DrugCategory::Antibiotic);
        assert_eq!(updated.primary_form.quantity, 9);
    }

    #[tokio::test]
    async fn test_alternate_form_policy() {
        let repo = repo().await;
        repo.upsert(&with_forms(input("D1", 1000, 5), vec![strip(250, 2), strip(300, 4)]))
            .await
            .unwrap();

        // Flag on, new list: full replacement.
        let replaced = repo
            .upsert(&with_forms(input("D1", 1000, 5), vec![strip(500, 7)]))
            .await
            .unwrap();
        assert_eq!(replaced.alternate_forms.len(), 1);
        assert_eq!(replaced.alternate_forms[0].quantity_in_base_units, 7);

        // Flag on, empty list: forms untouched.
        let kept = repo
            .upsert(&with_forms(input("D1", 1000, 5), Vec::new()))
            .await
            .unwrap();
        assert_eq!(kept.alternate_forms, replaced.alternate_forms);

        // Flag off: everything goes, even if forms were sent along.
        let mut off = with_forms(input("D1", 1000, 5), vec![strip(100, 1)]);
        off.can_have_alternate_forms = false;
        let cleared = repo.upsert(&off).await.unwrap();
        assert!(cleared.alternate_forms.is_empty());
        assert!(!cleared.can_have_alternate_forms);
    }

    #[tokio::test]
    async fn test_upsert_rejects_invalid_input_without_writing() {
        let repo = repo().await;

        let mut bad = input("D1", 1000, 5);
        bad.selling_price = Money::from_cents(-1);
        let err = repo.upsert(&bad).await.unwrap_err();
        assert!(matches!(
            err.as_domain(),
            Some(CoreError::Validation(ValidationError::Negative { .. }))
        ));

        let mut bad = input("D1", 1000, 5);
        bad.expiration_date = "not a date".to_string();
        assert!(repo.upsert(&bad).await.is_err());

        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_get_trims_like_upsert() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.inventory();
        let mut padded = input("D1", 1000, 5);
        padded.drug_identity_id = "  D1 ".to_string();
        repo.upsert(&padded).await.unwrap();

        let record = repo.get(" D1\t").await.unwrap().unwrap();
        assert_eq!(record.drug_identity_id, "D1");
        assert!(matches!(
            repo.get("  ").await.unwrap_err().as_domain(),
            Some(CoreError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_get_untracked_is_none() {
        let repo = repo().await;
        assert!(repo.get("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_active_and_by_category() {
        let repo = repo().await;
        repo.upsert(&with_forms(input("D1", 1000, 5), vec![strip(250, 2)]))
            .await
            .unwrap();
        let mut antibiotic = input("D2", 800, 3);
        antibiotic.category = DrugCategory::Antibiotic;
        repo.upsert(&antibiotic).await.unwrap();
        repo.upsert(&input("D3", 300, 1)).await.unwrap();

        let all = repo.list_active().await.unwrap();
        let ids: Vec<_> = all.iter().map(|r| r.drug_identity_id.as_str()).collect();
        assert_eq!(ids, vec!["D1", "D2", "D3"]);
        assert_eq!(all[0].alternate_forms.len(), 1);
        assert!(all[1].alternate_forms.is_empty());

        let analgesics = repo.list_by_category(DrugCategory::Analgesic).await.unwrap();
        assert_eq!(analgesics.len(), 2);
        assert_eq!(analgesics[0].alternate_forms.len(), 1);

        let antibiotics = repo.list_by_category(DrugCategory::Antibiotic).await.unwrap();
        assert_eq!(antibiotics.len(), 1);
        assert_eq!(antibiotics[0].drug_identity_id, "D2");
    }

    #[tokio::test]
    async fn test_list_flagged() {
        let repo = repo().await;
        repo.upsert(&input("OK", 1000, 5)).await.unwrap();
        repo.upsert(&input("EMPTY", 1000, 0)).await.unwrap();
        let mut expired = input("OLD", 1000, 0);
        expired.expiration_date = "2024-01-01".to_string();
        repo.upsert(&expired).await.unwrap();
        repo.upsert(&with_forms(input("STRIPS", 1000, 0), vec![strip(100, 3)]))
            .await
            .unwrap();

        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let flagged = repo.list_flagged(now).await.unwrap();
        let summary: Vec<_> = flagged
            .iter()
            .map(|f| (f.record.drug_identity_id.as_str(), f.status))
            .collect();

        assert_eq!(
            summary,
            vec![("EMPTY", StockStatus::OutOfStock), ("OLD", StockStatus::Expired)]
        );
    }

    #[tokio::test]
    async fn test_decrement_round_trip() {
        let repo = repo().await;
        repo.upsert(&input("D1", 1000, 5)).await.unwrap();

        let after = repo
            .decrement_stock("D1", &FormSelector::Primary, 3)
            .await
            .unwrap();
        assert_eq!(after.primary_form.quantity, 2);

        let after = repo
            .decrement_stock("D1", &FormSelector::Primary, 2)
            .await
            .unwrap();
        assert_eq!(after.primary_form.quantity, 0);
    }

    #[tokio::test]
    async fn test_decrement_beyond_stock_changes_nothing() {
        let repo = repo().await;
        repo.upsert(&input("D1", 1000, 5)).await.unwrap();

        let err = repo
            .decrement_stock("D1", &FormSelector::Primary, 6)
            .await
            .unwrap_err();
        assert_eq!(
            err.as_domain(),
            Some(&CoreError::InsufficientStock {
                drug_id: "D1".to_string(),
                form: "primary".to_string(),
                available: 5,
                requested: 6,
            })
        );

        let record = repo.get("D1").await.unwrap().unwrap();
        assert_eq!(record.primary_form.quantity, 5);
    }

    #[tokio::test]
    async fn test_decrement_alternate_form_is_independent() {
        let repo = repo().await;
        let record = repo
            .upsert(&with_forms(input("D1", 1000, 5), vec![strip(250, 4)]))
            .await
            .unwrap();
        let form = FormSelector::alternate(record.alternate_forms[0].id.clone());

        let after = repo.decrement_stock("D1", &form, 3).await.unwrap();
        assert_eq!(after.alternate_forms[0].quantity_in_base_units, 1);
        assert_eq!(after.primary_form.quantity, 5);

        let err = repo.decrement_stock("D1", &form, 2).await.unwrap_err();
        assert!(matches!(
            err.as_domain(),
            Some(CoreError::InsufficientStock { available: 1, .. })
        ));
    }

    #[tokio::test]
    async fn test_decrement_edge_amounts_and_unknowns() {
        let repo = repo().await;
        repo.upsert(&input("D1", 1000, 5)).await.unwrap();

        let same = repo
            .decrement_stock("D1", &FormSelector::Primary, 0)
            .await
            .unwrap();
        assert_eq!(same.primary_form.quantity, 5);

        let err = repo
            .decrement_stock("D1", &FormSelector::Primary, -1)
            .await
            .unwrap_err();
        assert!(matches!(err.as_domain(), Some(CoreError::Validation(_))));

        let err = repo
            .decrement_stock("D404", &FormSelector::Primary, 1)
            .await
            .unwrap_err();
        assert!(matches!(err.as_domain(), Some(CoreError::NotFound { .. })));

        let err = repo
            .decrement_stock("D1", &FormSelector::alternate("F404"), 1)
            .await
            .unwrap_err();
        assert!(matches!(err.as_domain(), Some(CoreError::NotFound { .. })));
    }
}
