//! Shared fixtures for session and checkout tests.

use pharma_core::{
    AlternateFormInput, DrugCategory, DrugIdentity, InventoryInput, InventoryRecord, Money,
    PackagingType,
};
use pharma_db::{Database, DbConfig};

pub async fn test_db() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

/// Carton-packed drug expiring in 2030, no alternate forms.
pub fn carton(drug_id: &str, price_cents: i64, qty: i64) -> InventoryInput {
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

/// Adds one strip form to `input`.
pub fn with_strip(mut input: InventoryInput, price_cents: i64, qty: i64) -> InventoryInput {
    input.can_have_alternate_forms = true;
    input.alternate_forms.push(AlternateFormInput {
        packaging_type: PackagingType::Strip,
        selling_price: Money::from_cents(price_cents),
        quantity: qty,
    });
    input
}

pub async fn stock(db: &Database, input: InventoryInput) -> InventoryRecord {
    db.inventory().upsert(&input).await.unwrap()
}

pub async fn name(db: &Database, drug_id: &str, name: &str) {
    db.catalog()
        .insert(&DrugIdentity {
            id: drug_id.to_string(),
            name: name.to_string(),
            image_url: None,
            uses: vec!["pain".to_string()],
        })
        .await
        .unwrap();
}
