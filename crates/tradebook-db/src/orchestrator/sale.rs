//! # Sale Workflows
//!
//! ## Create Sale
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Acme buys 5 × $10, pays $20 at the counter                             │
//! │                                                                         │
//! │  stock_ledger   SALE      −5   (COLA @ MAIN)                            │
//! │  party_ledger   DEBIT    $50   sale           balance  $50              │
//! │  party_ledger   CREDIT   $20   sale_payment   balance  $30              │
//! │  accounts       Till     +$20                                           │
//! │  sales          net $50, paid $20, balance $30, PARTIAL                 │
//! │  invoices       INV-20261018-XXXXXXXX                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Settlement
//! A sale's balance always matches what it contributes to the party ledger:
//! `balance = net − returned − paid`, where `returned` is the value credited
//! by sales returns and `paid` is what was received less refunds.
//!
//! ## Cancel Sale
//! Reverses only what is still in effect:
//! - stock: `quantity − returned_quantity` per line comes back
//! - party: CREDIT the sale DEBIT less what returns already credited,
//!   DEBIT the at-sale payment less what returns already refunded
//!
//! Payments recorded later through [`Orchestrator::update_sale_payment`]
//! are not reversed; they stay on the customer's account as credit, and
//! the cancelled sale's balance shows them as a negative amount.

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use super::{Orchestrator, PartyPosting};
use crate::error::DbResult;
use crate::repository::generate_invoice_number;
use tradebook_core::ledger::{
    aggregate_demand, cancellation_credit, cancellation_refund, line_total, SaleTotals, Settlement,
};
use tradebook_core::requests::{CreateSaleRequest, UpdateSalePaymentRequest};
use tradebook_core::{
    Actor, CoreError, EntrySource, Invoice, Money, PartyEntryType, PartyKind, Payment,
    PaymentDirection, Sale, SaleDetail, SaleItem, SaleStatus, StockEntryType, StockKey,
    ValidationError,
};

impl Orchestrator {
    /// Records a completed sale with its stock deductions, party entries,
    /// at-sale payment and invoice.
    ///
    /// ## Errors
    /// - `PartyNotFound` / `PartyKindMismatch` for a missing or supplier party
    /// - `WarehouseNotFound`, `ProductNotFound`, `VariantNotFound`
    /// - `InsufficientStock` when any key lacks stock; lines for the same
    ///   key are checked together
    /// - `Conflict` when the write lock could not be taken in time
    pub async fn create_sale(&self, actor: &Actor, request: &CreateSaleRequest) -> DbResult<SaleDetail> {
        request.validate().map_err(CoreError::from)?;
        let warehouse_id = self
            .resolve_warehouse(request.warehouse_id.as_deref())
            .to_string();

        let mut tx = self.db.begin_write().await?;

        self.db
            .parties()
            .require_in(&mut tx, &request.party_id, Some(PartyKind::Customer))
            .await?;
        self.db
            .catalog()
            .require_warehouse_in(&mut tx, &warehouse_id)
            .await?;
        if let Some(account_id) = &request.account_id {
            self.db.accounts().require_in(&mut tx, account_id).await?;
        }

        let demand = aggregate_demand(request.items.iter().map(|line| {
            (
                line.product_id.as_str(),
                line.variant_id.as_deref(),
                line.quantity,
            )
        }));
        if let Err(err) = self.ensure_available(&mut tx, &warehouse_id, &demand).await {
            warn!(party_id = %request.party_id, error = %err, "Sale rejected");
            return Err(err);
        }

        let sale_id = Uuid::new_v4().to_string();
        let mut items = Vec::with_capacity(request.items.len());
        for line in &request.items {
            let unit_price = match line.unit_price_cents {
                Some(cents) => Money::from_cents(cents),
                None => {
                    self.db
                        .catalog()
                        .list_price_in(&mut tx, &line.product_id, line.variant_id.as_deref())
                        .await?
                }
            };
            let total = line_total(unit_price, line.quantity, Money::from_cents(line.discount_cents))?;
            if total.is_negative() {
                return Err(CoreError::from(ValidationError::MustNotBeNegative {
                    field: "line total".to_string(),
                })
                .into());
            }

            items.push(SaleItem {
                id: Uuid::new_v4().to_string(),
                sale_id: sale_id.clone(),
                product_id: line.product_id.clone(),
                variant_id: line.variant_id.clone(),
                quantity: line.quantity,
                returned_quantity: 0,
                unit_price_cents: unit_price.cents(),
                discount_cents: line.discount_cents,
                line_total_cents: total.cents(),
            });
        }

        let totals = SaleTotals::compute(
            items.iter().map(SaleItem::line_total),
            Money::from_cents(request.discount_cents),
            Money::from_cents(request.tax_cents),
            Money::from_cents(request.paid_cents),
        )?;
        if totals.net.is_negative() {
            return Err(CoreError::from(ValidationError::MustNotBeNegative {
                field: "net total".to_string(),
            })
            .into());
        }

        let now = Utc::now();
        let sale = Sale {
            id: sale_id.clone(),
            party_id: request.party_id.clone(),
            warehouse_id: warehouse_id.clone(),
            status: SaleStatus::Completed,
            payment_status: totals.payment_status,
            subtotal_cents: totals.subtotal.cents(),
            discount_cents: totals.discount.cents(),
            tax_cents: totals.tax.cents(),
            net_cents: totals.net.cents(),
            returned_cents: 0,
            paid_cents: totals.paid.cents(),
            balance_cents: totals.balance.cents(),
            account_id: request.account_id.clone(),
            actor_id: actor.user_id.clone(),
            notes: request.notes.clone(),
            created_at: now,
            updated_at: now,
            cancelled_at: None,
        };

        let sales = self.db.sales();
        sales.insert_in(&mut tx, &sale).await?;
        for item in &items {
            sales.insert_item_in(&mut tx, item).await?;
            self.record_stock(
                &mut tx,
                StockKey::new(&item.product_id, item.variant_id.clone(), &warehouse_id),
                -item.quantity,
                StockEntryType::Sale,
                &sale_id,
                actor,
            )
            .await?;
        }

        self.post_party(
            &mut tx,
            PartyPosting {
                party_id: &sale.party_id,
                entry_type: PartyEntryType::Debit,
                amount: totals.net,
                description: format!("Sale {}", sale_id),
                source: EntrySource::Sale,
                payment_id: None,
                transaction_id: Some(&sale_id),
                actor,
            },
        )
        .await?;
        self.post_party(
            &mut tx,
            PartyPosting {
                party_id: &sale.party_id,
                entry_type: PartyEntryType::Credit,
                amount: totals.paid,
                description: format!("Payment at sale {}", sale_id),
                source: EntrySource::SalePayment,
                payment_id: None,
                transaction_id: Some(&sale_id),
                actor,
            },
        )
        .await?;
        if let Some(account_id) = &sale.account_id {
            self.db
                .accounts()
                .adjust_balance_in(&mut tx, account_id, totals.paid)
                .await?;
        }

        let invoice = Invoice {
            id: Uuid::new_v4().to_string(),
            invoice_number: generate_invoice_number(),
            sale_id: sale_id.clone(),
            party_id: sale.party_id.clone(),
            total_cents: sale.net_cents,
            issued_at: now,
        };
        sales.insert_invoice_in(&mut tx, &invoice).await?;

        tx.commit().await?;

        info!(
            sale_id = %sale.id,
            party_id = %sale.party_id,
            net = sale.net_cents,
            paid = sale.paid_cents,
            lines = items.len(),
            invoice = %invoice.invoice_number,
            "Sale created"
        );

        Ok(SaleDetail {
            sale,
            items,
            invoice: Some(invoice),
        })
    }

    /// Cancels a completed sale, appending compensating entries.
    ///
    /// ## Errors
    /// - `SaleNotFound`
    /// - `SaleAlreadyCancelled` (nothing is written)
    pub async fn cancel_sale(&self, actor: &Actor, sale_id: &str) -> DbResult<Sale> {
        let mut tx = self.db.begin_write().await?;

        let sales = self.db.sales();
        let sale = sales.require_in(&mut tx, sale_id).await?;
        if sale.is_cancelled() {
            warn!(sale_id = %sale_id, "Sale already cancelled");
            return Err(CoreError::SaleAlreadyCancelled(sale_id.to_string()).into());
        }

        let items = sales.items_in(&mut tx, sale_id).await?;
        sales.mark_cancelled_in(&mut tx, sale_id).await?;

        for item in &items {
            self.record_stock(
                &mut tx,
                StockKey::new(&item.product_id, item.variant_id.clone(), &sale.warehouse_id),
                item.remaining_quantity(),
                StockEntryType::Return,
                sale_id,
                actor,
            )
            .await?;
        }

        let refunded = self
            .db
            .sales_returns()
            .refunded_for_sale_in(&mut tx, sale_id)
            .await?;
        let at_sale_paid = self
            .db
            .party_ledger()
            .sum_for_transaction_in(&mut tx, sale_id, EntrySource::SalePayment, true)
            .await?;
        let credit = cancellation_credit(sale.net(), sale.returned());
        let refund = cancellation_refund(at_sale_paid, refunded);

        self.post_party(
            &mut tx,
            PartyPosting {
                party_id: &sale.party_id,
                entry_type: PartyEntryType::Credit,
                amount: credit,
                description: format!("Cancellation of sale {}", sale_id),
                source: EntrySource::SaleCancellation,
                payment_id: None,
                transaction_id: Some(sale_id),
                actor,
            },
        )
        .await?;
        self.post_party(
            &mut tx,
            PartyPosting {
                party_id: &sale.party_id,
                entry_type: PartyEntryType::Debit,
                amount: refund,
                description: format!("Payment returned on cancellation of sale {}", sale_id),
                source: EntrySource::SaleCancellation,
                payment_id: None,
                transaction_id: Some(sale_id),
                actor,
            },
        )
        .await?;
        if let Some(account_id) = &sale.account_id {
            self.db
                .accounts()
                .adjust_balance_in(&mut tx, account_id, -refund)
                .await?;
        }

        let settlement = Settlement::new(Money::zero(), sale.paid() - refund);
        sales
            .update_settlement_in(&mut tx, sale_id, &settlement)
            .await?;

        let cancelled = sales.require_in(&mut tx, sale_id).await?;
        tx.commit().await?;

        info!(
            sale_id = %sale_id,
            credited = credit.cents(),
            refunded = refund.cents(),
            "Sale cancelled"
        );

        Ok(cancelled)
    }

    /// Records a payment against a sale's outstanding balance.
    ///
    /// The balance already excludes value credited by sales returns.
    ///
    /// ## Errors
    /// - `SaleNotFound`, `SaleCancelled`
    /// - `Overpayment` when the amount exceeds the balance
    pub async fn update_sale_payment(
        &self,
        actor: &Actor,
        request: &UpdateSalePaymentRequest,
    ) -> DbResult<Payment> {
        request.validate().map_err(CoreError::from)?;

        let mut tx = self.db.begin_write().await?;

        let sales = self.db.sales();
        let sale = sales.require_in(&mut tx, &request.sale_id).await?;
        if sale.is_cancelled() {
            return Err(CoreError::SaleCancelled(sale.id).into());
        }

        let amount = Money::from_cents(request.amount_cents);
        if amount > sale.balance() {
            warn!(sale_id = %sale.id, amount = amount.cents(), "Sale payment exceeds balance");
            return Err(CoreError::Overpayment {
                amount_cents: amount.cents(),
                balance_cents: sale.balance_cents,
            }
            .into());
        }
        if let Some(account_id) = &request.account_id {
            self.db.accounts().require_in(&mut tx, account_id).await?;
        }

        let payment = Payment {
            id: Uuid::new_v4().to_string(),
            party_id: sale.party_id.clone(),
            direction: PaymentDirection::Received,
            method: request.method,
            amount_cents: amount.cents(),
            account_id: request.account_id.clone(),
            sale_id: Some(sale.id.clone()),
            purchase_id: None,
            sales_return_id: None,
            reference: request.reference.clone(),
            notes: None,
            actor_id: actor.user_id.clone(),
            created_at: Utc::now(),
        };
        self.db.payments().insert_in(&mut tx, &payment).await?;

        self.post_party(
            &mut tx,
            PartyPosting {
                party_id: &sale.party_id,
                entry_type: PartyEntryType::Credit,
                amount,
                description: format!("Payment on sale {}", sale.id),
                source: EntrySource::SalePayment,
                payment_id: Some(&payment.id),
                transaction_id: Some(&sale.id),
                actor,
            },
        )
        .await?;
        if let Some(account_id) = &payment.account_id {
            self.db
                .accounts()
                .adjust_balance_in(&mut tx, account_id, amount)
                .await?;
        }

        let settlement = Settlement::new(sale.settlement_total(), sale.paid() + amount);
        sales
            .update_settlement_in(&mut tx, &sale.id, &settlement)
            .await?;

        tx.commit().await?;

        info!(
            sale_id = %sale.id,
            payment_id = %payment.id,
            amount = amount.cents(),
            status = ?settlement.payment_status,
            "Sale payment recorded"
        );

        Ok(payment)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::Fixture;
    use tradebook_core::requests::{CreateSaleRequest, SaleLineRequest, UpdateSalePaymentRequest};
    use tradebook_core::{
        CoreError, PaymentMethod, PaymentStatus, SaleStatus, ValidationError, MAX_AMOUNT_CENTS,
    };

    fn acme_sale(fx: &Fixture, quantity: i64, paid_cents: i64) -> CreateSaleRequest {
        CreateSaleRequest {
            party_id: fx.customer.id.clone(),
            warehouse_id: None,
            items: vec![SaleLineRequest {
                product_id: fx.product.id.clone(),
                variant_id: None,
                quantity,
                unit_price_cents: Some(1000),
                discount_cents: 0,
            }],
            discount_cents: 0,
            tax_cents: 0,
            paid_cents,
            account_id: Some(fx.till.id.clone()),
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_partial_sale_then_cancel_restores_everything() {
        let fx = Fixture::new().await;
        fx.stock(&fx.main.id, 10).await;

        let detail = fx
            .orchestrator
            .create_sale(&fx.manager, &acme_sale(&fx, 5, 2000))
            .await
            .unwrap();

        assert_eq!(detail.sale.net_cents, 5000);
        assert_eq!(detail.sale.balance_cents, 3000);
        assert_eq!(detail.sale.payment_status, PaymentStatus::Partial);
        assert!(detail.invoice.is_some());
        assert_eq!(fx.on_hand(&fx.main.id).await, 5);
        assert_eq!(fx.balance(&fx.customer.id).await, 3000);
        assert_eq!(fx.account_balance(&fx.till.id).await, 2000);

        let cancelled = fx
            .orchestrator
            .cancel_sale(&fx.manager, &detail.sale.id)
            .await
            .unwrap();

        assert_eq!(cancelled.status, SaleStatus::Cancelled);
        assert!(cancelled.cancelled_at.is_some());
        assert_eq!(fx.on_hand(&fx.main.id).await, 10);
        assert_eq!(fx.balance(&fx.customer.id).await, 0);
        assert_eq!(fx.account_balance(&fx.till.id).await, 0);
        fx.assert_reconciled(&fx.customer.id).await;
    }

    #[tokio::test]
    async fn test_insufficient_stock_writes_nothing() {
        let fx = Fixture::new().await;
        fx.stock(&fx.main.id, 3).await;

        let err = fx
            .orchestrator
            .create_sale(&fx.manager, &acme_sale(&fx, 5, 0))
            .await
            .unwrap_err();

        match err.as_domain() {
            Some(CoreError::InsufficientStock {
                sku,
                available,
                requested,
            }) => {
                assert_eq!(sku, "COLA-330");
                assert_eq!(*available, 3);
                assert_eq!(*requested, 5);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }
        assert_eq!(fx.on_hand(&fx.main.id).await, 3);
        assert_eq!(fx.balance(&fx.customer.id).await, 0);
        assert!(fx
            .db
            .sales()
            .list_for_party(&fx.customer.id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_lines_for_same_key_are_checked_together() {
        let fx = Fixture::new().await;
        fx.stock(&fx.main.id, 4).await;

        let mut request = acme_sale(&fx, 3, 0);
        request.items.push(request.items[0].clone());

        let err = fx
            .orchestrator
            .create_sale(&fx.manager, &request)
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_domain(),
            Some(CoreError::InsufficientStock { requested: 6, .. })
        ));
        assert_eq!(fx.on_hand(&fx.main.id).await, 4);
    }

    #[tokio::test]
    async fn test_oversized_amounts_rejected_before_any_write() {
        let fx = Fixture::new().await;
        fx.stock(&fx.main.id, 10).await;

        let mut request = acme_sale(&fx, 3, 0);
        request.items[0].unit_price_cents = Some(i64::MAX / 2);
        let err = fx
            .orchestrator
            .create_sale(&fx.manager, &request)
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_domain(),
            Some(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));

        // largest valid amounts still total without overflow
        let mut request = acme_sale(&fx, 10, 0);
        request.items[0].unit_price_cents = Some(MAX_AMOUNT_CENTS);
        request.tax_cents = MAX_AMOUNT_CENTS;
        let detail = fx
            .orchestrator
            .create_sale(&fx.manager, &request)
            .await
            .unwrap();
        assert_eq!(detail.sale.net_cents, MAX_AMOUNT_CENTS * 11);
        assert_eq!(fx.on_hand(&fx.main.id).await, 0);
        fx.assert_reconciled(&fx.customer.id).await;
    }

    #[tokio::test]
    async fn test_double_cancel_rejected_without_writes() {
        let fx = Fixture::new().await;
        fx.stock(&fx.main.id, 10).await;
        let detail = fx
            .orchestrator
            .create_sale(&fx.manager, &acme_sale(&fx, 5, 0))
            .await
            .unwrap();
        fx.orchestrator
            .cancel_sale(&fx.manager, &detail.sale.id)
            .await
            .unwrap();

        let entries_before = fx.db.party_ledger().entries(&fx.customer.id).await.unwrap();
        let err = fx
            .orchestrator
            .cancel_sale(&fx.manager, &detail.sale.id)
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_domain(),
            Some(CoreError::SaleAlreadyCancelled(_))
        ));
        let entries_after = fx.db.party_ledger().entries(&fx.customer.id).await.unwrap();
        assert_eq!(entries_before, entries_after);
        assert_eq!(fx.on_hand(&fx.main.id).await, 10);
    }

    #[tokio::test]
    async fn test_supplier_cannot_buy() {
        let fx = Fixture::new().await;
        fx.stock(&fx.main.id, 10).await;
        let mut request = acme_sale(&fx, 1, 0);
        request.party_id = fx.supplier.id.clone();

        let err = fx
            .orchestrator
            .create_sale(&fx.manager, &request)
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_domain(),
            Some(CoreError::PartyKindMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_list_price_used_when_no_override() {
        let fx = Fixture::new().await;
        fx.stock(&fx.main.id, 10).await;
        let mut request = acme_sale(&fx, 2, 0);
        request.items[0].unit_price_cents = None;
        request.tax_cents = 30;
        request.discount_cents = 10;

        let detail = fx
            .orchestrator
            .create_sale(&fx.manager, &request)
            .await
            .unwrap();

        assert_eq!(detail.items[0].unit_price_cents, 150);
        assert_eq!(detail.sale.subtotal_cents, 300);
        assert_eq!(detail.sale.net_cents, 320);
        assert_eq!(detail.sale.payment_status, PaymentStatus::Unpaid);
    }

    #[tokio::test]
    async fn test_update_sale_payment_settles_balance() {
        let fx = Fixture::new().await;
        fx.stock(&fx.main.id, 10).await;
        let detail = fx
            .orchestrator
            .create_sale(&fx.manager, &acme_sale(&fx, 5, 2000))
            .await
            .unwrap();

        let pay = |amount_cents| UpdateSalePaymentRequest {
            sale_id: detail.sale.id.clone(),
            amount_cents,
            method: PaymentMethod::Card,
            account_id: Some(fx.till.id.clone()),
            reference: None,
        };

        let err = fx
            .orchestrator
            .update_sale_payment(&fx.manager, &pay(3001))
            .await
            .unwrap_err();
        assert!(matches!(err.as_domain(), Some(CoreError::Overpayment { .. })));

        let payment = fx
            .orchestrator
            .update_sale_payment(&fx.manager, &pay(3000))
            .await
            .unwrap();
        assert_eq!(payment.sale_id.as_deref(), Some(detail.sale.id.as_str()));

        let sale = fx
            .db
            .sales()
            .get_detail(&detail.sale.id)
            .await
            .unwrap()
            .unwrap()
            .sale;
        assert_eq!(sale.paid_cents, 5000);
        assert_eq!(sale.balance_cents, 0);
        assert_eq!(sale.payment_status, PaymentStatus::Paid);
        assert_eq!(fx.balance(&fx.customer.id).await, 0);
        assert_eq!(fx.account_balance(&fx.till.id).await, 5000);
        fx.assert_reconciled(&fx.customer.id).await;
    }

    #[tokio::test]
    async fn test_cannot_pay_cancelled_sale() {
        let fx = Fixture::new().await;
        fx.stock(&fx.main.id, 10).await;
        let detail = fx
            .orchestrator
            .create_sale(&fx.manager, &acme_sale(&fx, 1, 0))
            .await
            .unwrap();
        fx.orchestrator
            .cancel_sale(&fx.manager, &detail.sale.id)
            .await
            .unwrap();

        let err = fx
            .orchestrator
            .update_sale_payment(
                &fx.manager,
                &UpdateSalePaymentRequest {
                    sale_id: detail.sale.id.clone(),
                    amount_cents: 100,
                    method: PaymentMethod::Cash,
                    account_id: None,
                    reference: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err.as_domain(), Some(CoreError::SaleCancelled(_))));
    }
}
