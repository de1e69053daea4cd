//! # Cart Manager
//!
//! One terminal's working cart.
//!
//! ## Fresh Stock on Every Edit
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Session Operations                              │
//! │                                                                         │
//! │  Screen Action        CartManager              Store / Cart             │
//! │  ─────────────        ───────────              ────────────             │
//! │                                                                         │
//! │  Click drug ────────► add_line("D1") ────────► inventory().get("D1")   │
//! │                                                 cart.add_line(record)   │
//! │                                                                         │
//! │  Pick "Strip" ──────► select_form("D1", F) ──► inventory().get("D1")   │
//! │                                                 cart.select_form(...)   │
//! │                                                                         │
//! │  Press "+" ─────────► change_quantity(+1) ───► inventory().get("D1")   │
//! │                                                 cart.change_quantity()  │
//! │                                                                         │
//! │  Click remove ──────► remove_line("D1") ─────► (cart only)             │
//! │                                                                         │
//! │  Every stock-bounded edit re-reads the record. A ceiling cached from    │
//! │  an earlier edit is never trusted.                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Per line: `absent → present(1) → present(n), 1 ≤ n ≤ ceiling → absent`.

use std::sync::Arc;

use pharma_core::validation::validate_id;
use pharma_core::{
    Cart, CartLine, CartTotals, Clock, FormSelector, InventoryRecord, Money, SystemClock,
};
use pharma_db::Database;
use tracing::debug;

use crate::error::{PosError, PosResult};

/// A terminal's cart session.
///
/// Owned by the session, not shared. Hand it to
/// [`SettlementService::checkout`](crate::SettlementService::checkout) to
/// settle it.
#[derive(Clone)]
pub struct CartManager {
    db: Database,
    cart: Cart,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for CartManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartManager")
            .field("db", &self.db)
            .field("cart", &self.cart)
            .finish_non_exhaustive()
    }
}

impl CartManager {
    pub fn new(db: Database) -> Self {
        Self::with_clock(db, SystemClock)
    }

    /// A session whose cart timestamps come from `clock`.
    pub fn with_clock(db: Database, clock: impl Clock + 'static) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(clock);
        CartManager {
            db,
            cart: Cart::new(clock.now()),
            clock,
        }
    }

    /// Adds a drug at quantity 1 on its primary form.
    ///
    /// A drug already in the cart is left as it is and its line returned,
    /// without touching the store.
    ///
    /// ## Errors
    /// - `NotFound` when the drug has no inventory record
    /// - `OutOfStock` when the primary stock is 0
    pub async fn add_line(&mut self, drug_identity_id: &str) -> PosResult<CartLine> {
        let drug_identity_id = validate_id("drug_identity_id", drug_identity_id)?;
        let drug_identity_id = drug_identity_id.as_str();
        if let Some(line) = self.cart.line(drug_identity_id) {
            debug!(drug_id = %drug_identity_id, "Drug already in cart");
            return Ok(line.clone());
        }

        let record = self.fetch(drug_identity_id).await?;
        let line = self.cart.add_line(&record)?.clone();

        debug!(drug_id = %drug_identity_id, unit_price = %line.unit_price, "Line added");
        Ok(line)
    }

    /// Moves a line to another form, clamping its quantity to that form's
    /// live stock.
    pub async fn select_form(
        &mut self,
        drug_identity_id: &str,
        selector: impl Into<FormSelector>,
    ) -> PosResult<CartLine> {
        let selector = selector.into();
        let drug_identity_id = self.require_line(drug_identity_id)?;
        let drug_identity_id = drug_identity_id.as_str();

        let record = self.fetch(drug_identity_id).await?;
        let line = self.cart.select_form(&record, &selector)?.clone();

        debug!(
            drug_id = %drug_identity_id,
            form = %selector,
            quantity = line.quantity,
            "Form selected"
        );
        Ok(line)
    }

    /// Steps a line's quantity, clamped to `[1, live ceiling]`.
    pub async fn change_quantity(
        &mut self,
        drug_identity_id: &str,
        delta: i64,
    ) -> PosResult<CartLine> {
        let drug_identity_id = self.require_line(drug_identity_id)?;
        let drug_identity_id = drug_identity_id.as_str();

        let record = self.fetch(drug_identity_id).await?;
        let line = self.cart.change_quantity(&record, delta)?.clone();

        debug!(drug_id = %drug_identity_id, delta, quantity = line.quantity, "Quantity changed");
        Ok(line)
    }

    /// Removes a drug's line. Returns whether there was one.
    pub fn remove_line(&mut self, drug_identity_id: &str) -> bool {
        let drug_identity_id = drug_identity_id.trim();
        let removed = self.cart.remove_line(drug_identity_id);
        debug!(drug_id = %drug_identity_id, removed, "Line removed");
        removed
    }

    /// Sets or clears (with `None` or blank text) a line's dosage note.
    pub fn set_dosage_note(&mut self, drug_identity_id: &str, note: Option<&str>) -> PosResult<()> {
        self.cart.set_dosage_note(drug_identity_id.trim(), note)?;
        Ok(())
    }

    pub fn clear(&mut self) {
        self.cart.clear(self.clock.now());
    }

    pub fn subtotal(&self) -> Money {
        self.cart.subtotal()
    }

    pub fn total(&self) -> Money {
        self.cart.total()
    }

    pub fn totals(&self) -> CartTotals {
        CartTotals::from(&self.cart)
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn lines(&self) -> &[CartLine] {
        self.cart.lines()
    }

    pub fn line(&self, drug_identity_id: &str) -> Option<&CartLine> {
        self.cart.line(drug_identity_id.trim())
    }

    pub fn is_empty(&self) -> bool {
        self.cart.is_empty()
    }

    async fn fetch(&self, drug_identity_id: &str) -> PosResult<InventoryRecord> {
        self.db
            .inventory()
            .get(drug_identity_id)
            .await?
            .ok_or_else(|| PosError::not_found("Inventory record", drug_identity_id))
    }

    /// Normalizes `drug_identity_id` and checks the cart has a line for it.
    fn require_line(&self, drug_identity_id: &str) -> PosResult<String> {
        let drug_identity_id = validate_id("drug_identity_id", drug_identity_id)?;
        match self.cart.line(&drug_identity_id) {
            Some(_) => Ok(drug_identity_id),
            None => Err(PosError::not_found("Cart line", &drug_identity_id)),
        }
    }
}
