//! # Cart
//!
//! The working cart of one POS session, as a plain value object.
//!
//! The cart never fetches anything. Every mutation that depends on stock
//! takes the freshly loaded [`InventoryRecord`] as an argument; the session
//! layer is responsible for reading it from the store right before the call.
//!
//! ## Line Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          CartLine States                                │
//! │                                                                         │
//! │   absent ──add_line──► present(q = 1)                                   │
//! │                              │                                          │
//! │         change_quantity(Δ)   │   q = clamp(q + Δ, 1, ceiling)           │
//! │         select_form(sel)     │   q = min(q, new ceiling)                │
//! │                              ▼                                          │
//! │                        present(1 ≤ q ≤ ceiling)                         │
//! │                              │                                          │
//! │      remove_line / settled   │                                          │
//! │                              ▼                                          │
//! │                           absent                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants
//! - At most one line per drug. Adding a drug that is already present is a no-op.
//! - Switching forms updates the existing line's snapshot, never adds a line.
//! - After every successful mutation `1 ≤ quantity ≤ ceiling` of the selected form.
//! - `total() == subtotal() + PLATFORM_FEE`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::form::{resolve, FormSelector, FormSnapshot};
use crate::money::Money;
use crate::types::{InventoryRecord, PackagingType};
use crate::validation::validate_dosage_note;
use crate::PLATFORM_FEE;

// =============================================================================
// Cart Line
// =============================================================================

/// One drug in the cart, priced by the form it currently represents.
///
/// ## Snapshot Fields
/// `unit_price`, `packaging_type` and `packaging_label` are frozen when the
/// form is selected. A later price edit in inventory does not reprice a line
/// that is already in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartLine {
    pub inventory_record_id: String,
    pub drug_identity_id: String,
    #[ts(type = "string")]
    pub selector: FormSelector,
    pub unit_price: Money,
    pub packaging_type: PackagingType,
    pub packaging_label: String,
    pub quantity: i64,
    pub dosage_note: Option<String>,
}

impl CartLine {
    fn from_snapshot(record: &InventoryRecord, snapshot: FormSnapshot, quantity: i64) -> Self {
        CartLine {
            inventory_record_id: record.id.clone(),
            drug_identity_id: record.drug_identity_id.clone(),
            selector: snapshot.selector,
            unit_price: snapshot.unit_price,
            packaging_type: snapshot.packaging_type,
            packaging_label: snapshot.packaging_label,
            quantity,
            dosage_note: None,
        }
    }

    fn apply_snapshot(&mut self, snapshot: FormSnapshot) {
        self.selector = snapshot.selector;
        self.unit_price = snapshot.unit_price;
        self.packaging_type = snapshot.packaging_type;
        self.packaging_label = snapshot.packaging_label;
    }

    /// unit price × quantity.
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Cart
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,

    /// When the cart was created or last cleared.
    pub created_at: DateTime<Utc>,
}

impl Cart {
    /// An empty cart opened at `created_at`.
    pub fn new(created_at: DateTime<Utc>) -> Self {
        Cart {
            lines: Vec::new(),
            created_at,
        }
    }

    /// Adds a drug at quantity 1 using its primary form.
    ///
    /// ## Behavior
    /// - Drug already in the cart: nothing changes, the existing line is returned
    /// - Primary stock is 0: `OutOfStock`, no line added
    ///
    /// Alternate stock does not make a drug addable; a line always starts on
    /// the primary form and moves with [`Cart::select_form`].
    pub fn add_line(&mut self, record: &InventoryRecord) -> CoreResult<&CartLine> {
        if let Some(index) = self.position(&record.drug_identity_id) {
            return Ok(&self.lines[index]);
        }

        let snapshot = resolve(record, &FormSelector::Primary)?;
        if snapshot.stock_ceiling == 0 {
            return Err(CoreError::OutOfStock {
                drug_id: record.drug_identity_id.clone(),
            });
        }

        self.lines.push(CartLine::from_snapshot(record, snapshot, 1));
        let index = self.lines.len() - 1;
        Ok(&self.lines[index])
    }

    /// Moves a line to another form of the same drug.
    ///
    /// The quantity is clamped down to the new form's ceiling and never
    /// raised. A form with no stock at all is refused with `OutOfStock`
    /// and the line is left as it was.
    pub fn select_form(
        &mut self,
        record: &InventoryRecord,
        selector: &FormSelector,
    ) -> CoreResult<&CartLine> {
        let index = self.require(&record.drug_identity_id)?;
        let snapshot = resolve(record, selector)?;
        if snapshot.stock_ceiling == 0 {
            return Err(CoreError::OutOfStock {
                drug_id: record.drug_identity_id.clone(),
            });
        }

        let line = &mut self.lines[index];
        line.quantity = line.quantity.min(snapshot.stock_ceiling);
        line.apply_snapshot(snapshot);
        Ok(&self.lines[index])
    }

    /// Steps a line's quantity by `delta`, clamped to `[1, ceiling]` where
    /// the ceiling is read from `record` for the line's current form.
    ///
    /// Over- and under-shoot are clamped, not rejected. When the live
    /// ceiling has dropped to zero there is no valid quantity left, so the
    /// call fails with `OutOfStock` and the line is untouched.
    pub fn change_quantity(
        &mut self,
        record: &InventoryRecord,
        delta: i64,
    ) -> CoreResult<&CartLine> {
        let index = self.require(&record.drug_identity_id)?;
        let ceiling = resolve(record, &self.lines[index].selector)?.stock_ceiling;
        if ceiling == 0 {
            return Err(CoreError::OutOfStock {
                drug_id: record.drug_identity_id.clone(),
            });
        }

        let line = &mut self.lines[index];
        line.quantity = line.quantity.saturating_add(delta).clamp(1, ceiling);
        Ok(&self.lines[index])
    }

    /// Removes a drug's line. Returns whether a line was removed.
    pub fn remove_line(&mut self, drug_identity_id: &str) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| l.drug_identity_id != drug_identity_id);
        self.lines.len() != before
    }

    /// Attaches a free-text dosage note to a line. Blank text clears it.
    pub fn set_dosage_note(&mut self, drug_identity_id: &str, note: Option<&str>) -> CoreResult<()> {
        let index = self.require(drug_identity_id)?;
        self.lines[index].dosage_note = validate_dosage_note(note)?;
        Ok(())
    }

    pub fn line(&self, drug_identity_id: &str) -> Option<&CartLine> {
        self.lines
            .iter()
            .find(|l| l.drug_identity_id == drug_identity_id)
    }

    /// Lines in the order they were added.
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Drops every line and restarts the cart at `now`.
    pub fn clear(&mut self, now: DateTime<Utc>) {
        self.lines.clear();
        self.created_at = now;
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn item_count(&self) -> usize {
        self.lines.len()
    }

    pub fn total_quantity(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    /// Sum of unit price × quantity over all lines.
    pub fn subtotal(&self) -> Money {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// Subtotal plus the fixed platform fee. The fee is charged once per
    /// cart, including an empty one.
    pub fn total(&self) -> Money {
        self.subtotal() + PLATFORM_FEE
    }

    fn position(&self, drug_identity_id: &str) -> Option<usize> {
        self.lines
            .iter()
            .position(|l| l.drug_identity_id == drug_identity_id)
    }

    fn require(&self, drug_identity_id: &str) -> CoreResult<usize> {
        self.position(drug_identity_id)
            .ok_or_else(|| CoreError::not_found("Cart line", drug_identity_id))
    }
}

// =============================================================================
// Cart Totals
// =============================================================================

/// Totals summary for the checkout panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartTotals {
    pub item_count: usize,
    pub total_quantity: i64,
    pub subtotal: Money,
    pub platform_fee: Money,
    pub total: Money,
}

impl From<&Cart> for CartTotals {
    fn from(cart: &Cart) -> Self {
        CartTotals {
            item_count: cart.item_count(),
            total_quantity: cart.total_quantity(),
            subtotal: cart.subtotal(),
            platform_fee: PLATFORM_FEE,
            total: cart.total(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{record_with_forms, sample_record, stamp};

    #[test]
    fn test_add_line_starts_at_one_on_primary() {
        let mut cart = Cart::new(stamp());
        let record = sample_record("D1", 1000, 5);

        let line = cart.add_line(&record).unwrap();
        assert_eq!(line.quantity, 1);
        assert!(line.selector.is_primary());
        assert_eq!(line.unit_price, Money::from_cents(1000));
        assert_eq!(line.packaging_label, "Carton");
    }

    #[test]
    fn test_add_line_twice_is_noop() {
        let mut cart = Cart::new(stamp());
        let record = sample_record("D1", 1000, 5);

        cart.add_line(&record).unwrap();
        cart.change_quantity(&record, 2).unwrap();
        cart.add_line(&record).unwrap();

        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.line("D1").unwrap().quantity, 3);
    }

    #[test]
    fn test_add_line_with_no_primary_stock_fails() {
        let mut cart = Cart::new(stamp());
        let record = record_with_forms("D1", 1000, 0, &[("F1", 250, 4)]);

        let err = cart.add_line(&record).unwrap_err();
        assert_eq!(
            err,
            CoreError::OutOfStock {
                drug_id: "D1".to_string()
            }
        );
        assert!(cart.is_empty());
    }

    #[test]
    fn test_change_quantity_clamps_both_ways() {
        let mut cart = Cart::new(stamp());
        let record = sample_record("D1", 1000, 5);
        cart.add_line(&record).unwrap();

        assert_eq!(cart.change_quantity(&record, 10).unwrap().quantity, 5);
        assert_eq!(cart.change_quantity(&record, -1).unwrap().quantity, 4);
        assert_eq!(cart.change_quantity(&record, -100).unwrap().quantity, 1);
        assert_eq!(cart.change_quantity(&record, i64::MAX).unwrap().quantity, 5);
    }

    #[test]
    fn test_change_quantity_uses_fresh_ceiling() {
        let mut cart = Cart::new(stamp());
        let record = sample_record("D1", 1000, 5);
        cart.add_line(&record).unwrap();
        cart.change_quantity(&record, 4).unwrap();

        // Someone else sold three in the meantime.
        let fresher = sample_record("D1", 1000, 2);
        assert_eq!(cart.change_quantity(&fresher, 0).unwrap().quantity, 2);
    }

    #[test]
    fn test_change_quantity_on_drained_stock_is_rejected() {
        let mut cart = Cart::new(stamp());
        cart.add_line(&sample_record("D1", 1000, 5)).unwrap();

        let drained = sample_record("D1", 1000, 0);
        let err = cart.change_quantity(&drained, 1).unwrap_err();
        assert!(matches!(err, CoreError::OutOfStock { .. }));
        assert_eq!(cart.line("D1").unwrap().quantity, 1);
    }

    #[test]
    fn test_change_quantity_for_absent_line_is_not_found() {
        let mut cart = Cart::new(stamp());
        let err = cart
            .change_quantity(&sample_record("D9", 1000, 5), 1)
            .unwrap_err();
        assert_eq!(err, CoreError::not_found("Cart line", "D9"));
    }

    #[test]
    fn test_select_form_clamps_and_reprices() {
        let mut cart = Cart::new(stamp());
        let record = record_with_forms("D1", 1000, 5, &[("F1", 250, 2)]);
        cart.add_line(&record).unwrap();
        cart.change_quantity(&record, 4).unwrap();

        let line = cart
            .select_form(&record, &FormSelector::alternate("F1"))
            .unwrap();
        assert_eq!(line.quantity, 2);
        assert_eq!(line.unit_price, Money::from_cents(250));
        assert_eq!(line.packaging_label, "Strip");
        assert_eq!(cart.item_count(), 1);
    }

    #[test]
    fn test_select_form_never_raises_quantity() {
        let mut cart = Cart::new(stamp());
        let record = record_with_forms("D1", 1000, 5, &[("F1", 250, 20)]);
        cart.add_line(&record).unwrap();
        cart.change_quantity(&record, 2).unwrap();

        let line = cart
            .select_form(&record, &FormSelector::alternate("F1"))
            .unwrap();
        assert_eq!(line.quantity, 3);

        let line = cart.select_form(&record, &FormSelector::Primary).unwrap();
        assert_eq!(line.quantity, 3);
        assert_eq!(line.unit_price, Money::from_cents(1000));
    }

    #[test]
    fn test_select_unknown_or_empty_form() {
        let mut cart = Cart::new(stamp());
        let record = record_with_forms("D1", 1000, 5, &[("F1", 250, 0)]);
        cart.add_line(&record).unwrap();

        let err = cart
            .select_form(&record, &FormSelector::alternate("F404"))
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));

        let err = cart
            .select_form(&record, &FormSelector::alternate("F1"))
            .unwrap_err();
        assert!(matches!(err, CoreError::OutOfStock { .. }));
        assert!(cart.line("D1").unwrap().selector.is_primary());
    }

    #[test]
    fn test_remove_line() {
        let mut cart = Cart::new(stamp());
        cart.add_line(&sample_record("D1", 1000, 5)).unwrap();

        assert!(cart.remove_line("D1"));
        assert!(!cart.remove_line("D1"));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_dosage_note() {
        let mut cart = Cart::new(stamp());
        cart.add_line(&sample_record("D1", 1000, 5)).unwrap();

        cart.set_dosage_note("D1", Some("  1 tablet twice daily ")).unwrap();
        assert_eq!(
            cart.line("D1").unwrap().dosage_note.as_deref(),
            Some("1 tablet twice daily")
        );

        cart.set_dosage_note("D1", Some("   ")).unwrap();
        assert_eq!(cart.line("D1").unwrap().dosage_note, None);

        let too_long = "x".repeat(crate::MAX_DOSAGE_NOTE_LEN + 1);
        assert!(cart.set_dosage_note("D1", Some(&too_long)).is_err());
        assert!(cart.set_dosage_note("D2", Some("note")).is_err());
    }

    #[test]
    fn test_totals() {
        let mut cart = Cart::new(stamp());
        let d1 = sample_record("D1", 1000, 5);
        let d2 = record_with_forms("D2", 800, 3, &[("F1", 150, 10)]);

        cart.add_line(&d1).unwrap();
        cart.change_quantity(&d1, 2).unwrap();
        cart.add_line(&d2).unwrap();
        cart.select_form(&d2, &FormSelector::alternate("F1")).unwrap();
        cart.change_quantity(&d2, 1).unwrap();

        assert_eq!(cart.subtotal(), Money::from_cents(3000 + 300));
        assert_eq!(cart.total(), cart.subtotal() + PLATFORM_FEE);

        let totals = CartTotals::from(&cart);
        assert_eq!(totals.item_count, 2);
        assert_eq!(totals.total_quantity, 5);
        assert_eq!(totals.total, Money::from_cents(3310));
    }

    #[test]
    fn test_empty_cart_total_is_fee() {
        let cart = Cart::new(stamp());
        assert_eq!(cart.subtotal(), Money::zero());
        assert_eq!(cart.total(), PLATFORM_FEE);
    }

    #[test]
    fn test_clear_restarts_at_given_time() {
        let mut cart = Cart::new(stamp());
        assert_eq!(cart.created_at, stamp());
        cart.add_line(&sample_record("D1", 1000, 5)).unwrap();

        let later = stamp() + chrono::Duration::minutes(15);
        cart.clear(later);

        assert!(cart.is_empty());
        assert_eq!(cart.created_at, later);
    }

    #[test]
    fn test_totals_at_price_and_stock_ceilings() {
        use crate::{MAX_PRICE_CENTS, MAX_QUANTITY};

        let mut cart = Cart::new(stamp());
        for drug in ["D1", "D2", "D3"] {
            cart.add_line(&sample_record(drug, MAX_PRICE_CENTS, MAX_QUANTITY))
                .unwrap();
            cart.change_quantity(&sample_record(drug, MAX_PRICE_CENTS, MAX_QUANTITY), i64::MAX)
                .unwrap();
        }

        let line_max = MAX_PRICE_CENTS * MAX_QUANTITY;
        assert_eq!(cart.line("D1").unwrap().quantity, MAX_QUANTITY);
        assert_eq!(cart.subtotal(), Money::from_cents(3 * line_max));
        assert_eq!(cart.total(), Money::from_cents(3 * line_max + 10));
        assert!(!cart.total().is_negative());
    }
}
