//! # Settlement Service
//!
//! Turns a terminal's cart into ledger rows and a receipt.
//!
//! ## Checkout Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       checkout(session, teller)                         │
//! │                                                                         │
//! │  1. Preconditions ──── cart non-empty, teller named (or config default) │
//! │                                                                         │
//! │  2. db.settlement().commit(lines, teller) ──── ONE SQLite transaction   │
//! │       per line: CAS decrement + ledger insert                           │
//! │       any shortfall → StockConflict, everything rolled back             │
//! │                                                                         │
//! │  3. Receipt ──── catalog names, subtotal, platform fee, total           │
//! │                                                                         │
//! │  4. session.clear() ──── only after step 2 committed                    │
//! │                                                                         │
//! │  On any error the cart is left exactly as it was, ready for retry.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use pharma_core::validation::validate_teller_id;
use pharma_core::{
    Cart, CartLine, Clock, CoreError, Money, StockStatus, SystemClock, TransactionRecord,
    PLATFORM_FEE,
};
use pharma_db::{Database, FlaggedRecord};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cart_manager::CartManager;
use crate::config::PosConfig;
use crate::error::{PosError, PosResult};

// =============================================================================
// Receipt
// =============================================================================

/// One printed line, pairing a cart line with the ledger row it became.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptLine {
    pub transaction_id: String,
    pub drug_identity_id: String,
    /// Catalog name, or the drug id when the catalog has no entry.
    pub name: String,
    pub packaging_label: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub line_total: Money,
    pub dosage_note: Option<String>,
}

/// What the checkout screen prints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub store_name: String,
    pub teller_id: String,
    pub issued_at: DateTime<Utc>,
    pub lines: Vec<ReceiptLine>,
    pub subtotal: Money,
    pub platform_fee: Money,
    pub total: Money,
    /// `total` formatted with the configured currency.
    pub total_display: String,
}

impl Receipt {
    /// Plain-text rendering for a receipt printer.
    pub fn render(&self, config: &PosConfig) -> String {
        let mut out = Vec::with_capacity(self.lines.len() + 6);
        out.push(self.store_name.clone());
        out.push(format!(
            "{}  teller {}",
            self.issued_at.format("%Y-%m-%d %H:%M"),
            self.teller_id
        ));

        for line in &self.lines {
            out.push(format!(
                "{} x{} {} @ {} = {}",
                line.name,
                line.quantity,
                line.packaging_label,
                config.format_money(line.unit_price),
                config.format_money(line.line_total)
            ));
            if let Some(note) = &line.dosage_note {
                out.push(format!("  {}", note));
            }
        }

        out.push(format!("Subtotal {}", config.format_money(self.subtotal)));
        out.push(format!("Platform fee {}", config.format_money(self.platform_fee)));
        out.push(format!("Total {}", self.total_display));
        out.join("\n")
    }
}

// =============================================================================
// Service
// =============================================================================

/// Checkout and stock reporting, shared by all terminals.
#[derive(Clone)]
pub struct SettlementService {
    db: Database,
    config: PosConfig,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for SettlementService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettlementService")
            .field("db", &self.db)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SettlementService {
    pub fn new(db: Database, config: PosConfig) -> Self {
        Self::with_clock(db, config, SystemClock)
    }

    pub fn with_clock(db: Database, config: PosConfig, clock: impl Clock + 'static) -> Self {
        SettlementService {
            db,
            config,
            clock: Arc::new(clock),
        }
    }

    pub fn config(&self) -> &PosConfig {
        &self.config
    }

    /// Commits `cart` and returns one ledger row per line, in line order.
    ///
    /// The cart is not touched; clearing it is up to the caller.
    ///
    /// ## Errors
    /// - `EmptyCart` for a cart without lines
    /// - `ValidationError` for a blank teller
    /// - `StockConflict` when live stock no longer covers a line
    /// - `NotFound` when a line's drug or form is gone
    pub async fn settle(&self, cart: &Cart, teller_id: &str) -> PosResult<Vec<TransactionRecord>> {
        if cart.is_empty() {
            return Err(CoreError::EmptyCart.into());
        }

        debug!(lines = cart.item_count(), teller_id = %teller_id, "Settling cart");

        match self.db.settlement().commit(cart.lines(), teller_id).await {
            Ok(records) => Ok(records),
            Err(err) => {
                warn!(teller_id = %teller_id, error = %err, "Settlement rejected");
                Err(err.into())
            }
        }
    }

    /// Settles a session's cart, clears it, and builds the receipt.
    ///
    /// `teller_id` falls back to the configured default teller. On error
    /// the session keeps its cart.
    pub async fn checkout(
        &self,
        session: &mut CartManager,
        teller_id: Option<&str>,
    ) -> PosResult<Receipt> {
        let teller_id = self.teller(teller_id)?;

        let records = self.settle(session.cart(), &teller_id).await?;
        let receipt = self.build_receipt(session.lines(), &records, &teller_id).await?;
        session.clear();

        info!(
            teller_id = %teller_id,
            lines = receipt.lines.len(),
            total = %receipt.total,
            "Checkout complete"
        );

        Ok(receipt)
    }

    /// Expiry/stock classification of one drug at the service clock's now.
    pub async fn stock_status(&self, drug_identity_id: &str) -> PosResult<StockStatus> {
        let record = self
            .db
            .inventory()
            .get(drug_identity_id)
            .await?
            .ok_or_else(|| PosError::not_found("Inventory record", drug_identity_id))?;
        Ok(record.stock_status(self.clock.now()))
    }

    /// Every expired or empty record, for the attention panel.
    pub async fn flagged(&self) -> PosResult<Vec<FlaggedRecord>> {
        Ok(self.db.inventory().list_flagged(self.clock.now()).await?)
    }

    fn teller(&self, teller_id: Option<&str>) -> PosResult<String> {
        let given = teller_id.filter(|t| !t.trim().is_empty());
        let chosen = given
            .or(self.config.default_teller.as_deref())
            .unwrap_or_default();
        Ok(validate_teller_id(chosen)?)
    }

    async fn build_receipt(
        &self,
        lines: &[CartLine],
        records: &[TransactionRecord],
        teller_id: &str,
    ) -> PosResult<Receipt> {
        let mut receipt_lines = Vec::with_capacity(records.len());

        for (line, record) in lines.iter().zip(records) {
            // The sale is already committed; a missing catalog entry only
            // costs the receipt its display name.
            let name = match self.db.catalog().get(&line.drug_identity_id).await {
                Ok(Some(identity)) => identity.name,
                Ok(None) => line.drug_identity_id.clone(),
                Err(err) => {
                    warn!(drug_id = %line.drug_identity_id, error = %err, "Catalog lookup failed");
                    line.drug_identity_id.clone()
                }
            };

            receipt_lines.push(ReceiptLine {
                transaction_id: record.id.clone(),
                drug_identity_id: record.drug_identity_id.clone(),
                name,
                packaging_label: line.packaging_label.clone(),
                quantity: record.quantity,
                unit_price: line.unit_price,
                line_total: record.total_amount,
                dosage_note: record.dosage_note.clone(),
            });
        }

        let subtotal: Money = records.iter().map(|r| r.total_amount).sum();
        let total = subtotal + PLATFORM_FEE;

        Ok(Receipt {
            store_name: self.config.store_name.clone(),
            teller_id: teller_id.to_string(),
            issued_at: self.clock.now(),
            lines: receipt_lines,
            subtotal,
            platform_fee: PLATFORM_FEE,
            total,
            total_display: self.config.format_money(total),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::testing::{carton, name, stock, test_db, with_strip};
    use chrono::TimeZone;
    use pharma_core::FixedClock;

    fn service(db: &Database) -> SettlementService {
        SettlementService::new(db.clone(), PosConfig::default())
    }

    async fn primary_qty(db: &Database, drug_id: &str) -> i64 {
        db.inventory()
            .get(drug_id)
            .await
            .unwrap()
            .unwrap()
            .primary_form
            .quantity
    }

    #[tokio::test]
    async fn test_add_and_checkout() {
        let db = test_db().await;
        stock(&db, carton("D1", 1000, 5)).await;
        name(&db, "D1", "Paracetamol 500mg").await;
        let svc = service(&db);
        let mut session = CartManager::new(db.clone());

        assert_eq!(session.add_line("D1").await.unwrap().quantity, 1);
        assert_eq!(session.change_quantity("D1", 10).await.unwrap().quantity, 5);

        let receipt = svc.checkout(&mut session, Some("teller1")).await.unwrap();

        assert_eq!(receipt.lines.len(), 1);
        assert_eq!(receipt.lines[0].line_total, Money::from_cents(5000));
        assert_eq!(receipt.lines[0].quantity, 5);
        assert_eq!(receipt.lines[0].name, "Paracetamol 500mg");
        assert_eq!(receipt.subtotal, Money::from_cents(5000));
        assert_eq!(receipt.total, Money::from_cents(5010));
        assert_eq!(receipt.total_display, "$50.10");

        assert_eq!(primary_qty(&db, "D1").await, 0);
        assert!(session.is_empty());

        let ledger = db.transactions().list_by_teller("teller1").await.unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].total_amount, Money::from_cents(5000));
        assert_eq!(ledger[0].quantity, 5);
    }

    #[tokio::test]
    async fn test_conflicting_checkout() {
        let db = test_db().await;
        stock(&db, carton("D1", 1000, 5)).await;
        let svc = service(&db);

        let mut first = CartManager::new(db.clone());
        let mut second = CartManager::new(db.clone());
        for session in [&mut first, &mut second] {
            session.add_line("D1").await.unwrap();
            session.change_quantity("D1", 10).await.unwrap();
        }

        svc.checkout(&mut first, Some("teller1")).await.unwrap();
        let err = svc.checkout(&mut second, Some("teller2")).await.unwrap_err();

        assert_eq!(err.code, ErrorCode::StockConflict);
        assert_eq!(primary_qty(&db, "D1").await, 0);
        assert_eq!(db.transactions().count().await.unwrap(), 1);
        // Left intact for retry
        assert_eq!(second.line("D1").unwrap().quantity, 5);
    }

    #[tokio::test]
    async fn test_simultaneous_checkouts_only_one_wins() {
        let db = test_db().await;
        stock(&db, carton("D1", 1000, 5)).await;
        let svc = service(&db);

        let mut first = CartManager::new(db.clone());
        let mut second = CartManager::new(db.clone());
        for session in [&mut first, &mut second] {
            session.add_line("D1").await.unwrap();
            session.change_quantity("D1", 3).await.unwrap();
        }

        let (a, b) = tokio::join!(
            svc.checkout(&mut first, Some("teller1")),
            svc.checkout(&mut second, Some("teller2"))
        );

        assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
        let err = a.err().or(b.err()).unwrap();
        assert_eq!(err.code, ErrorCode::StockConflict);
        assert_eq!(primary_qty(&db, "D1").await, 1);
        assert_eq!(db.transactions().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_checkout_is_all_or_nothing() {
        let db = test_db().await;
        stock(&db, carton("D1", 1000, 5)).await;
        let record = stock(&db, with_strip(carton("D2", 800, 4), 200, 6)).await;
        let strip_id = record.alternate_forms[0].id.clone();
        let svc = service(&db);

        let mut session = CartManager::new(db.clone());
        session.add_line("D1").await.unwrap();
        session.change_quantity("D1", 2).await.unwrap();
        session.add_line("D2").await.unwrap();
        session.select_form("D2", strip_id.as_str()).await.unwrap();
        session.change_quantity("D2", 5).await.unwrap();

        // Strip stock drops under the open cart
        stock(&db, with_strip(carton("D2", 800, 4), 200, 1)).await;

        let err = svc.checkout(&mut session, Some("teller1")).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);

        // Re-upsert replaced the strip form under a new id; re-pick it
        let fresh = db.inventory().get("D2").await.unwrap().unwrap();
        let new_strip = fresh.alternate_forms[0].id.clone();
        session.select_form("D2", new_strip.as_str()).await.unwrap();
        assert_eq!(session.line("D2").unwrap().quantity, 1);

        // A second terminal takes the last strip first
        let mut other = CartManager::new(db.clone());
        other.add_line("D2").await.unwrap();
        other.select_form("D2", new_strip.as_str()).await.unwrap();
        svc.checkout(&mut other, Some("teller2")).await.unwrap();

        let err = svc.checkout(&mut session, Some("teller1")).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::StockConflict);
        assert_eq!(primary_qty(&db, "D1").await, 5);
        assert_eq!(db.transactions().list_by_teller("teller1").await.unwrap().len(), 0);
        assert_eq!(session.lines().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_cart_and_missing_teller() {
        let db = test_db().await;
        stock(&db, carton("D1", 1000, 5)).await;
        let svc = service(&db);
        let mut session = CartManager::new(db.clone());

        let err = svc.checkout(&mut session, Some("teller1")).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::EmptyCart);

        session.add_line("D1").await.unwrap();
        let err = svc.checkout(&mut session, None).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(session.lines().len(), 1);
    }

    #[tokio::test]
    async fn test_default_teller_and_receipt_rendering() {
        let db = test_db().await;
        stock(&db, carton("D1", 1000, 5)).await;
        let config = PosConfig {
            store_name: "Corner Chemist".to_string(),
            default_teller: Some("night-shift".to_string()),
            ..PosConfig::default()
        };
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 18, 30, 0).unwrap();
        let svc = SettlementService::with_clock(db.clone(), config, FixedClock::new(at));

        let mut session = CartManager::new(db.clone());
        session.add_line("D1").await.unwrap();
        session.set_dosage_note("D1", Some("2x daily")).unwrap();

        let receipt = svc.checkout(&mut session, Some("   ")).await.unwrap();
        assert_eq!(receipt.teller_id, "night-shift");
        assert_eq!(receipt.issued_at, at);
        // No catalog entry: the id stands in for the name
        assert_eq!(receipt.lines[0].name, "D1");

        let text = receipt.render(svc.config());
        assert!(text.starts_with("Corner Chemist\n2026-03-01 18:30  teller night-shift"));
        assert!(text.contains("D1 x1 Carton @ $10.00 = $10.00"));
        assert!(text.contains("  2x daily"));
        assert!(text.ends_with("Total $10.10"));
    }

    #[tokio::test]
    async fn test_settle_leaves_cart_to_caller() {
        let db = test_db().await;
        stock(&db, carton("D1", 1000, 5)).await;
        let svc = service(&db);
        let mut session = CartManager::new(db.clone());
        session.add_line("D1").await.unwrap();

        let records = svc.settle(session.cart(), "teller1").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(session.lines().len(), 1);
    }

    #[tokio::test]
    async fn test_expired_beats_out_of_stock() {
        let db = test_db().await;
        let mut input = carton("D1", 1000, 0);
        input.expiration_date = "2020-01-01".to_string();
        stock(&db, input).await;
        stock(&db, carton("D2", 1000, 0)).await;
        stock(&db, carton("D3", 1000, 3)).await;

        let now = Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap();
        let svc = SettlementService::with_clock(db.clone(), PosConfig::default(), FixedClock::new(now));

        assert_eq!(svc.stock_status("D1").await.unwrap(), StockStatus::Expired);
        assert_eq!(svc.stock_status("D2").await.unwrap(), StockStatus::OutOfStock);
        assert_eq!(svc.stock_status("D3").await.unwrap(), StockStatus::Ok);
        assert_eq!(svc.stock_status("D9").await.unwrap_err().code, ErrorCode::NotFound);

        let flagged: Vec<_> = svc
            .flagged()
            .await
            .unwrap()
            .into_iter()
            .map(|f| (f.record.drug_identity_id, f.status))
            .collect();
        assert_eq!(
            flagged,
            vec![
                ("D1".to_string(), StockStatus::Expired),
                ("D2".to_string(), StockStatus::OutOfStock),
            ]
        );
    }

    #[tokio::test]
    async fn test_expired_drug_with_stock_can_still_be_sold() {
        let db = test_db().await;
        let mut input = carton("D1", 1000, 2);
        input.expiration_date = "2020-01-01".to_string();
        stock(&db, input).await;
        let svc = service(&db);

        let mut session = CartManager::new(db.clone());
        session.add_line("D1").await.unwrap();
        svc.checkout(&mut session, Some("teller1")).await.unwrap();

        assert_eq!(primary_qty(&db, "D1").await, 1);
    }
}
