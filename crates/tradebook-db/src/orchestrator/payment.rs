//! # Payment Workflows
//!
//! ```text
//! direction   party entry   account
//! ─────────   ───────────   ───────
//! received    CREDIT        +amount   (customer settles, supplier refunds)
//! paid        DEBIT         −amount   (business pays supplier, refunds customer)
//! ```
//!
//! ## Deleting a Payment
//! The one place ledger rows are removed. It exists for administrative
//! correction of mistaken entries and undoes everything the payment did:
//!
//! 1. account effect reverted
//! 2. linked sale/purchase `paid/balance/payment_status` reverted, or the
//!    linked return's refund cleared and added back to its sale's paid
//! 3. the payment's party entries deleted, then the payment itself
//! 4. the party's remaining entries replayed so snapshots stay consistent

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use super::{Orchestrator, PartyPosting};
use crate::error::DbResult;
use tradebook_core::ledger::Settlement;
use tradebook_core::requests::ProcessPaymentRequest;
use tradebook_core::{Actor, CoreError, EntrySource, Money, Payment, PaymentDirection};

impl Orchestrator {
    /// Records a standalone payment from or to a party.
    pub async fn process_payment(
        &self,
        actor: &Actor,
        request: &ProcessPaymentRequest,
    ) -> DbResult<Payment> {
        request.validate().map_err(CoreError::from)?;

        let mut tx = self.db.begin_write().await?;

        let party = self
            .db
            .parties()
            .require_in(&mut tx, &request.party_id, None)
            .await?;
        if let Some(account_id) = &request.account_id {
            self.db.accounts().require_in(&mut tx, account_id).await?;
        }

        let amount = Money::from_cents(request.amount_cents);
        let payment = Payment {
            id: Uuid::new_v4().to_string(),
            party_id: party.id.clone(),
            direction: request.direction,
            method: request.method,
            amount_cents: amount.cents(),
            account_id: request.account_id.clone(),
            sale_id: None,
            purchase_id: None,
            sales_return_id: None,
            reference: request.reference.clone(),
            notes: request.notes.clone(),
            actor_id: actor.user_id.clone(),
            created_at: Utc::now(),
        };
        self.db.payments().insert_in(&mut tx, &payment).await?;

        let description = match payment.direction {
            PaymentDirection::Received => format!("Payment received from {}", party.name),
            PaymentDirection::Paid => format!("Payment made to {}", party.name),
        };
        self.post_party(
            &mut tx,
            PartyPosting {
                party_id: &party.id,
                entry_type: payment.direction.entry_type(),
                amount,
                description,
                source: EntrySource::Payment,
                payment_id: Some(&payment.id),
                transaction_id: None,
                actor,
            },
        )
        .await?;
        if let Some(account_id) = &payment.account_id {
            self.db
                .accounts()
                .adjust_balance_in(&mut tx, account_id, payment.direction.account_delta(amount))
                .await?;
        }

        tx.commit().await?;

        info!(
            payment_id = %payment.id,
            party_id = %party.id,
            direction = ?payment.direction,
            amount = amount.cents(),
            "Payment processed"
        );

        Ok(payment)
    }

    /// Deletes a payment and every trace of it, then replays the party's
    /// ledger. Returns the deleted payment.
    pub async fn delete_payment(&self, actor: &Actor, payment_id: &str) -> DbResult<Payment> {
        let mut tx = self.db.begin_write().await?;

        let payment = self.db.payments().require_in(&mut tx, payment_id).await?;
        let amount = payment.amount();

        if let Some(account_id) = &payment.account_id {
            self.db
                .accounts()
                .adjust_balance_in(&mut tx, account_id, -payment.direction.account_delta(amount))
                .await?;
        }

        if let Some(sale_id) = &payment.sale_id {
            let sales = self.db.sales();
            let sale = sales.require_in(&mut tx, sale_id).await?;
            let settlement = Settlement::new(sale.settlement_total(), sale.paid() - amount);
            sales
                .update_settlement_in(&mut tx, sale_id, &settlement)
                .await?;
        }
        if let Some(purchase_id) = &payment.purchase_id {
            let purchases = self.db.purchases();
            let purchase = purchases.require_in(&mut tx, purchase_id).await?;
            let settlement = Settlement::new(
                Money::from_cents(purchase.total_cents),
                Money::from_cents(purchase.paid_cents) - amount,
            );
            purchases
                .update_settlement_in(&mut tx, purchase_id, &settlement)
                .await?;
        }
        if let Some(return_id) = &payment.sales_return_id {
            let returns = self.db.sales_returns();
            returns.clear_refund_in(&mut tx, return_id).await?;
            if let Some(sales_return) = returns.find_in(&mut tx, return_id).await? {
                let sales = self.db.sales();
                let sale = sales.require_in(&mut tx, &sales_return.sale_id).await?;
                let settlement = Settlement::new(sale.settlement_total(), sale.paid() + amount);
                sales
                    .update_settlement_in(&mut tx, &sale.id, &settlement)
                    .await?;
            }
        }

        let party_ledger = self.db.party_ledger();
        let removed = party_ledger
            .delete_for_payment_in(&mut tx, payment_id)
            .await?;
        self.db.payments().delete_in(&mut tx, payment_id).await?;
        let balance = party_ledger
            .recompute_in(&mut tx, &payment.party_id)
            .await?;

        tx.commit().await?;

        warn!(
            payment_id = %payment_id,
            party_id = %payment.party_id,
            actor_id = %actor.user_id,
            removed_entries = removed,
            balance = balance.cents(),
            "Payment deleted"
        );

        Ok(payment)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::Fixture;
    use tradebook_core::requests::{
        CreatePurchaseRequest, ProcessPaymentRequest, PurchaseLineRequest,
    };
    use tradebook_core::{
        CoreError, PaymentDirection, PaymentMethod, PaymentStatus, PurchaseStatus,
    };

    fn payment(party_id: &str, direction: PaymentDirection, amount_cents: i64, account: &str) -> ProcessPaymentRequest {
        ProcessPaymentRequest {
            party_id: party_id.to_string(),
            amount_cents,
            direction,
            method: PaymentMethod::Cash,
            account_id: Some(account.to_string()),
            reference: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_payment_directions() {
        let fx = Fixture::new().await;

        fx.orchestrator
            .process_payment(
                &fx.manager,
                &payment(&fx.customer.id, PaymentDirection::Received, 700, &fx.till.id),
            )
            .await
            .unwrap();
        assert_eq!(fx.balance(&fx.customer.id).await, -700);
        assert_eq!(fx.account_balance(&fx.till.id).await, 700);

        fx.orchestrator
            .process_payment(
                &fx.manager,
                &payment(&fx.supplier.id, PaymentDirection::Paid, 300, &fx.till.id),
            )
            .await
            .unwrap();
        assert_eq!(fx.balance(&fx.supplier.id).await, 300);
        assert_eq!(fx.account_balance(&fx.till.id).await, 400);
    }

    #[tokio::test]
    async fn test_delete_payment_replays_later_entries() {
        let fx = Fixture::new().await;
        let first = fx
            .orchestrator
            .process_payment(
                &fx.manager,
                &payment(&fx.customer.id, PaymentDirection::Received, 500, &fx.till.id),
            )
            .await
            .unwrap();
        fx.orchestrator
            .process_payment(
                &fx.manager,
                &payment(&fx.customer.id, PaymentDirection::Received, 200, &fx.till.id),
            )
            .await
            .unwrap();

        fx.orchestrator
            .delete_payment(&fx.manager, &first.id)
            .await
            .unwrap();

        assert_eq!(fx.balance(&fx.customer.id).await, -200);
        assert_eq!(fx.account_balance(&fx.till.id).await, 200);
        let entries = fx.db.party_ledger().entries(&fx.customer.id).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].running_balance_cents, -200);
        assert!(fx.db.payments().find(&first.id).await.unwrap().is_none());
        fx.assert_reconciled(&fx.customer.id).await;

        let err = fx
            .orchestrator
            .delete_payment(&fx.manager, &first.id)
            .await
            .unwrap_err();
        assert!(matches!(err.as_domain(), Some(CoreError::PaymentNotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_purchase_payment_reverts_document() {
        let fx = Fixture::new().await;
        let detail = fx
            .orchestrator
            .create_purchase(
                &fx.manager,
                &CreatePurchaseRequest {
                    party_id: fx.supplier.id.clone(),
                    warehouse_id: None,
                    items: vec![PurchaseLineRequest {
                        product_id: fx.product.id.clone(),
                        variant_id: None,
                        quantity: 10,
                        unit_cost_cents: 100,
                    }],
                    status: PurchaseStatus::Received,
                    paid_cents: 1000,
                    account_id: Some(fx.till.id.clone()),
                    method: None,
                    supplier_reference: None,
                    notes: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(detail.purchase.payment_status, PaymentStatus::Paid);
        assert_eq!(fx.balance(&fx.supplier.id).await, 0);

        let payment = detail.payment.unwrap();
        fx.orchestrator
            .delete_payment(&fx.manager, &payment.id)
            .await
            .unwrap();

        let purchase = fx
            .db
            .purchases()
            .get_detail(&detail.purchase.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(purchase.purchase.paid_cents, 0);
        assert_eq!(purchase.purchase.balance_cents, 1000);
        assert_eq!(purchase.purchase.payment_status, PaymentStatus::Unpaid);
        assert!(purchase.payment.is_none());
        assert_eq!(fx.balance(&fx.supplier.id).await, -1000);
        assert_eq!(fx.account_balance(&fx.till.id).await, 0);
        fx.assert_reconciled(&fx.supplier.id).await;
    }
}
