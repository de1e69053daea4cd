//! # Catalog Repository
//!
//! Read side of the drug catalog: names, images and usage tags the till
//! shows next to a stock line. The catalog service owns these rows; the
//! till never edits them. `insert` exists for seeding and tests.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use pharma_core::validation::{validate_id, validate_search_query};
use pharma_core::DrugIdentity;

#[derive(Debug, sqlx::FromRow)]
struct DrugIdentityRow {
    id: String,
    name: String,
    image_url: Option<String>,
    uses: String,
}

impl TryFrom<DrugIdentityRow> for DrugIdentity {
    type Error = DbError;

    fn try_from(row: DrugIdentityRow) -> Result<Self, Self::Error> {
        let uses: Vec<String> = serde_json::from_str(&row.uses)
            .map_err(|e| DbError::corrupt("drug_identities", format!("uses of {}: {}", row.id, e)))?;
        Ok(DrugIdentity {
            id: row.id,
            name: row.name,
            image_url: row.image_url,
            uses,
        })
    }
}

/// Repository for catalog lookups.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<DrugIdentity>> {
        let row = sqlx::query_as::<_, DrugIdentityRow>(
            "SELECT id, name, image_url, uses FROM drug_identities WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(DrugIdentity::try_from).transpose()
    }

    /// Case-insensitive substring search on the drug name, sorted by name.
    ///
    /// An empty term returns the first `limit` entries.
    pub async fn search(&self, term: &str, limit: u32) -> DbResult<Vec<DrugIdentity>> {
        let term = validate_search_query(term)?;
        debug!(term = %term, limit, "Searching catalog");

        let pattern = format!("%{}%", escape_like(&term));
        let rows = sqlx::query_as::<_, DrugIdentityRow>(
            r#"
            SELECT id, name, image_url, uses
            FROM drug_identities
            WHERE name LIKE ? ESCAPE '\'
            ORDER BY name COLLATE NOCASE
            LIMIT ?
            "#,
        )
        .bind(pattern)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        let found = rows
            .into_iter()
            .map(DrugIdentity::try_from)
            .collect::<DbResult<Vec<_>>>()?;
        debug!(count = found.len(), "Catalog search returned");
        Ok(found)
    }

    /// Adds a catalog entry.
    ///
    /// ## Errors
    /// `UniqueViolation` if the id already exists.
    pub async fn insert(&self, identity: &DrugIdentity) -> DbResult<()> {
        let id = validate_id("id", &identity.id)?;
        debug!(id = %id, name = %identity.name, "Inserting catalog entry");

        let uses = serde_json::to_string(&identity.uses)
            .map_err(|e| DbError::Internal(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO drug_identities (id, name, image_url, uses, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&identity.name)
        .bind(&identity.image_url)
        .bind(uses)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM drug_identities")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
