//! Record builders shared by the unit tests of this crate.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use crate::money::Money;
use crate::types::{AlternateForm, DrugCategory, InventoryRecord, PackagingType, PrimaryForm};

/// Fixed instant used for record and cart timestamps.
pub(crate) fn stamp() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap()
}

/// A record for `drug_id` sold by the carton, expiring in 2030, no alternate forms.
pub(crate) fn sample_record(drug_id: &str, price_cents: i64, qty: i64) -> InventoryRecord {
    let stamp = stamp();
    InventoryRecord {
        id: format!("INV-{}", drug_id),
        drug_identity_id: drug_id.to_string(),
        supplier_id: "SUP-1".to_string(),
        category: DrugCategory::Analgesic,
        primary_form: PrimaryForm {
            packaging_type: PackagingType::Carton,
            cost_price: Money::from_cents(price_cents / 2),
            selling_price: Money::from_cents(price_cents),
            quantity: qty,
        },
        expiration_date: NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
        can_have_alternate_forms: false,
        alternate_forms: Vec::new(),
        created_at: stamp,
        updated_at: stamp,
    }
}

/// Like [`sample_record`], plus strip-packaged alternate forms given as
/// `(form_id, price_cents, qty)`.
pub(crate) fn record_with_forms(
    drug_id: &str,
    price_cents: i64,
    qty: i64,
    forms: &[(&str, i64, i64)],
) -> InventoryRecord {
    let mut record = sample_record(drug_id, price_cents, qty);
    record.can_have_alternate_forms = true;
    record.alternate_forms = forms
        .iter()
        .map(|(id, price, stock)| AlternateForm {
            id: id.to_string(),
            inventory_record_id: record.id.clone(),
            packaging_type: PackagingType::Strip,
            selling_price: Money::from_cents(*price),
            quantity_in_base_units: *stock,
        })
        .collect();
    record
}
