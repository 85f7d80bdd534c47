//! # Purchase Workflows
//!
//! ```text
//! create_purchase(status)
//!   ├─ PENDING              → document + party entries, no stock
//!   ├─ RECEIVED/COMPLETED   → document + party entries + PURCHASE +q
//!   │
//!   ├─ party CREDIT total   (business owes the supplier more)
//!   └─ party DEBIT  paid    (business owes the supplier less)
//!        └─ account named → Payment(direction=paid) + account −paid
//!
//! receive_purchase: PENDING → RECEIVED, stock moves now
//! ```

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use super::{Orchestrator, PartyPosting};
use crate::error::DbResult;
use tradebook_core::ledger::{checked_sum, line_total, Settlement};
use tradebook_core::requests::CreatePurchaseRequest;
use tradebook_core::{
    Actor, CoreError, CoreResult, EntrySource, Money, PartyEntryType, PartyKind, Payment,
    PaymentDirection, PaymentMethod, Purchase, PurchaseDetail, PurchaseItem, PurchaseStatus,
    StockEntryType, StockKey,
};

impl Orchestrator {
    /// Records a supplier purchase.
    ///
    /// ## Errors
    /// - `PartyNotFound` / `PartyKindMismatch` for a missing or customer party
    /// - `WarehouseNotFound`, `ProductNotFound`, `VariantNotFound`
    /// - `Overpayment` when `paid` exceeds the total
    pub async fn create_purchase(
        &self,
        actor: &Actor,
        request: &CreatePurchaseRequest,
    ) -> DbResult<PurchaseDetail> {
        request.validate().map_err(CoreError::from)?;
        let warehouse_id = self
            .resolve_warehouse(request.warehouse_id.as_deref())
            .to_string();

        let mut tx = self.db.begin_write().await?;

        self.db
            .parties()
            .require_in(&mut tx, &request.party_id, Some(PartyKind::Supplier))
            .await?;
        self.db
            .catalog()
            .require_warehouse_in(&mut tx, &warehouse_id)
            .await?;
        for line in &request.items {
            self.ensure_catalog_item(&mut tx, &line.product_id, line.variant_id.as_deref())
                .await?;
        }
        if let Some(account_id) = &request.account_id {
            self.db.accounts().require_in(&mut tx, account_id).await?;
        }

        let purchase_id = Uuid::new_v4().to_string();
        let items = request
            .items
            .iter()
            .map(|line| {
                let total = line_total(
                    Money::from_cents(line.unit_cost_cents),
                    line.quantity,
                    Money::zero(),
                )?;
                Ok(PurchaseItem {
                    id: Uuid::new_v4().to_string(),
                    purchase_id: purchase_id.clone(),
                    product_id: line.product_id.clone(),
                    variant_id: line.variant_id.clone(),
                    quantity: line.quantity,
                    unit_cost_cents: line.unit_cost_cents,
                    line_total_cents: total.cents(),
                })
            })
            .collect::<CoreResult<Vec<PurchaseItem>>>()?;

        let total = checked_sum(
            "purchase total",
            items.iter().map(|item| Money::from_cents(item.line_total_cents)),
        )?;
        let paid = Money::from_cents(request.paid_cents);
        if paid > total {
            return Err(CoreError::Overpayment {
                amount_cents: paid.cents(),
                balance_cents: total.cents(),
            }
            .into());
        }
        let settlement = Settlement::new(total, paid);

        let now = Utc::now();
        let purchase = Purchase {
            id: purchase_id.clone(),
            party_id: request.party_id.clone(),
            warehouse_id: warehouse_id.clone(),
            status: request.status,
            payment_status: settlement.payment_status,
            total_cents: total.cents(),
            paid_cents: settlement.paid.cents(),
            balance_cents: settlement.balance.cents(),
            supplier_reference: request.supplier_reference.clone(),
            actor_id: actor.user_id.clone(),
            notes: request.notes.clone(),
            created_at: now,
            updated_at: now,
            received_at: request.status.moves_stock().then_some(now),
        };

        let purchases = self.db.purchases();
        purchases.insert_in(&mut tx, &purchase).await?;
        for item in &items {
            purchases.insert_item_in(&mut tx, item).await?;
            if purchase.status.moves_stock() {
                self.record_stock(
                    &mut tx,
                    StockKey::new(&item.product_id, item.variant_id.clone(), &warehouse_id),
                    item.quantity,
                    StockEntryType::Purchase,
                    &purchase_id,
                    actor,
                )
                .await?;
            }
        }

        self.post_party(
            &mut tx,
            PartyPosting {
                party_id: &purchase.party_id,
                entry_type: PartyEntryType::Credit,
                amount: total,
                description: format!("Purchase {}", purchase_id),
                source: EntrySource::Purchase,
                payment_id: None,
                transaction_id: Some(&purchase_id),
                actor,
            },
        )
        .await?;

        let payment = match (&request.account_id, paid.is_positive()) {
            (Some(account_id), true) => {
                let payment = Payment {
                    id: Uuid::new_v4().to_string(),
                    party_id: purchase.party_id.clone(),
                    direction: PaymentDirection::Paid,
                    method: request.method.unwrap_or(PaymentMethod::Cash),
                    amount_cents: paid.cents(),
                    account_id: Some(account_id.clone()),
                    sale_id: None,
                    purchase_id: Some(purchase_id.clone()),
                    sales_return_id: None,
                    reference: request.supplier_reference.clone(),
                    notes: None,
                    actor_id: actor.user_id.clone(),
                    created_at: now,
                };
                self.db.payments().insert_in(&mut tx, &payment).await?;
                self.db
                    .accounts()
                    .adjust_balance_in(&mut tx, account_id, -paid)
                    .await?;
                Some(payment)
            }
            _ => None,
        };

        self.post_party(
            &mut tx,
            PartyPosting {
                party_id: &purchase.party_id,
                entry_type: PartyEntryType::Debit,
                amount: paid,
                description: format!("Payment on purchase {}", purchase_id),
                source: EntrySource::PurchasePayment,
                payment_id: payment.as_ref().map(|p| p.id.as_str()),
                transaction_id: Some(&purchase_id),
                actor,
            },
        )
        .await?;

        tx.commit().await?;

        info!(
            purchase_id = %purchase.id,
            party_id = %purchase.party_id,
            status = purchase.status.as_str(),
            total = purchase.total_cents,
            paid = purchase.paid_cents,
            "Purchase created"
        );

        Ok(PurchaseDetail {
            purchase,
            items,
            payment,
        })
    }

    /// Marks a pending purchase received and brings its goods into stock.
    ///
    /// ## Errors
    /// - `PurchaseNotFound`
    /// - `InvalidPurchaseStatus` unless the purchase is pending
    pub async fn receive_purchase(&self, actor: &Actor, purchase_id: &str) -> DbResult<Purchase> {
        let mut tx = self.db.begin_write().await?;

        let purchases = self.db.purchases();
        let purchase = purchases.require_in(&mut tx, purchase_id).await?;
        if purchase.status != PurchaseStatus::Pending
            || !purchases.mark_received_in(&mut tx, purchase_id).await?
        {
            warn!(purchase_id = %purchase_id, status = purchase.status.as_str(), "Purchase not pending");
            return Err(CoreError::InvalidPurchaseStatus {
                purchase_id: purchase_id.to_string(),
                current_status: purchase.status.as_str().to_string(),
                expected: PurchaseStatus::Pending.as_str().to_string(),
            }
            .into());
        }

        let items = purchases.items_in(&mut tx, purchase_id).await?;
        for item in &items {
            self.record_stock(
                &mut tx,
                StockKey::new(&item.product_id, item.variant_id.clone(), &purchase.warehouse_id),
                item.quantity,
                StockEntryType::Purchase,
                purchase_id,
                actor,
            )
            .await?;
        }

        let received = purchases.require_in(&mut tx, purchase_id).await?;
        tx.commit().await?;

        info!(purchase_id = %purchase_id, lines = items.len(), "Purchase received");
        Ok(received)
    }
}
