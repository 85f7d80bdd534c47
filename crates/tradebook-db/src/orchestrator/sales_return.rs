//! # Sales Return Workflow
//!
//! Partial returns against a completed sale.
//!
//! ```text
//! sale line: 4 × $10 = $40, 1 already returned, no document discount/tax
//!
//! return 2 ──► value = prorate(3) − prorate(1) = $30 − $10 = $20
//!              stock_ledger  RETURN  +2  (sale's warehouse)
//!              party_ledger  CREDIT $20  sales_return
//!              refund $15? ─► Payment(paid) + DEBIT $15 refund + account −$15
//!              sale_items.returned_quantity 1 → 3
//!              sales.returned +$20, paid −$15, balance/status rewritten
//! ```
//!
//! A line's value is its share of the sale's net total, so document
//! discount and tax come back in proportion. Proration is cumulative, so
//! returning every unit credits exactly the net total.

use std::collections::HashMap;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use super::{Orchestrator, PartyPosting};
use crate::error::DbResult;
use tradebook_core::ledger::{net_line_shares, return_value, Settlement};
use tradebook_core::requests::CreateSalesReturnRequest;
use tradebook_core::{
    Actor, CoreError, EntrySource, Money, PartyEntryType, Payment, PaymentDirection, SaleItem,
    SalesReturn, SalesReturnDetail, SalesReturnItem, StockEntryType, StockKey,
};

impl Orchestrator {
    /// Takes goods back from a customer, optionally refunding cash.
    ///
    /// ## Errors
    /// - `SaleNotFound`, `SaleCancelled`
    /// - `SaleItemNotFound` for a line that is not on the sale
    /// - `ReturnExceedsRemaining` when more units come back than are left
    /// - `RefundExceedsReturn` when the refund is larger than the return value
    pub async fn create_sales_return(
        &self,
        actor: &Actor,
        request: &CreateSalesReturnRequest,
    ) -> DbResult<SalesReturnDetail> {
        request.validate().map_err(CoreError::from)?;

        let mut tx = self.db.begin_write().await?;

        let sales = self.db.sales();
        let sale = sales.require_in(&mut tx, &request.sale_id).await?;
        if sale.is_cancelled() {
            warn!(sale_id = %sale.id, "Return against cancelled sale");
            return Err(CoreError::SaleCancelled(sale.id).into());
        }

        let lines = sales.items_in(&mut tx, &sale.id).await?;
        let shares = net_line_shares(
            sale.net(),
            &lines
                .iter()
                .map(|item| (item.line_total(), item.quantity))
                .collect::<Vec<_>>(),
        );
        let sale_items: HashMap<&str, (&SaleItem, Money)> = lines
            .iter()
            .zip(shares)
            .map(|(item, share)| (item.id.as_str(), (item, share)))
            .collect();

        let return_id = Uuid::new_v4().to_string();
        let mut items = Vec::with_capacity(request.lines.len());
        for line in &request.lines {
            let (item, share) = sale_items
                .get(line.sale_item_id.as_str())
                .copied()
                .ok_or_else(|| CoreError::SaleItemNotFound {
                    sale_id: sale.id.clone(),
                    item_id: line.sale_item_id.clone(),
                })?;
            if line.quantity > item.remaining_quantity() {
                return Err(CoreError::ReturnExceedsRemaining {
                    item_id: item.id.clone(),
                    remaining: item.remaining_quantity(),
                    requested: line.quantity,
                }
                .into());
            }

            let amount = return_value(
                share,
                item.quantity,
                item.returned_quantity,
                line.quantity,
            );
            items.push(SalesReturnItem {
                id: Uuid::new_v4().to_string(),
                return_id: return_id.clone(),
                sale_item_id: item.id.clone(),
                product_id: item.product_id.clone(),
                variant_id: item.variant_id.clone(),
                quantity: line.quantity,
                amount_cents: amount.cents(),
            });
        }

        let total: Money = items
            .iter()
            .map(|item| Money::from_cents(item.amount_cents))
            .sum();
        let refund = request
            .refund
            .as_ref()
            .map(|r| Money::from_cents(r.amount_cents))
            .unwrap_or_default();
        if refund > total {
            return Err(CoreError::RefundExceedsReturn {
                refund_cents: refund.cents(),
                return_cents: total.cents(),
            }
            .into());
        }
        let refund_account_id = request.refund.as_ref().and_then(|r| r.account_id.clone());
        if let Some(account_id) = &refund_account_id {
            self.db.accounts().require_in(&mut tx, account_id).await?;
        }

        let now = Utc::now();
        let sales_return = SalesReturn {
            id: return_id.clone(),
            sale_id: sale.id.clone(),
            party_id: sale.party_id.clone(),
            warehouse_id: sale.warehouse_id.clone(),
            total_cents: total.cents(),
            refund_cents: refund.cents(),
            refund_account_id: refund_account_id.clone(),
            reason: request.reason.clone(),
            actor_id: actor.user_id.clone(),
            created_at: now,
        };

        let returns = self.db.sales_returns();
        returns.insert_in(&mut tx, &sales_return).await?;
        for item in &items {
            returns.insert_item_in(&mut tx, item).await?;
            sales
                .add_returned_quantity_in(&mut tx, &item.sale_item_id, item.quantity)
                .await?;
            self.record_stock(
                &mut tx,
                StockKey::new(&item.product_id, item.variant_id.clone(), &sale.warehouse_id),
                item.quantity,
                StockEntryType::Return,
                &return_id,
                actor,
            )
            .await?;
        }

        let settlement = Settlement::new(
            sale.settlement_total() - total,
            sale.paid() - refund,
        );
        sales
            .record_return_in(&mut tx, &sale.id, total, &settlement)
            .await?;

        self.post_party(
            &mut tx,
            PartyPosting {
                party_id: &sale.party_id,
                entry_type: PartyEntryType::Credit,
                amount: total,
                description: format!("Return against sale {}", sale.id),
                source: EntrySource::SalesReturn,
                payment_id: None,
                transaction_id: Some(&return_id),
                actor,
            },
        )
        .await?;

        let refund_payment = match &request.refund {
            Some(refund_request) if refund.is_positive() => {
                let payment = Payment {
                    id: Uuid::new_v4().to_string(),
                    party_id: sale.party_id.clone(),
                    direction: PaymentDirection::Paid,
                    method: refund_request.method,
                    amount_cents: refund.cents(),
                    account_id: refund_account_id.clone(),
                    sale_id: None,
                    purchase_id: None,
                    sales_return_id: Some(return_id.clone()),
                    reference: None,
                    notes: request.reason.clone(),
                    actor_id: actor.user_id.clone(),
                    created_at: now,
                };
                self.db.payments().insert_in(&mut tx, &payment).await?;
                self.post_party(
                    &mut tx,
                    PartyPosting {
                        party_id: &sale.party_id,
                        entry_type: PartyEntryType::Debit,
                        amount: refund,
                        description: format!("Refund for return {}", return_id),
                        source: EntrySource::Refund,
                        payment_id: Some(&payment.id),
                        transaction_id: Some(&return_id),
                        actor,
                    },
                )
                .await?;
                if let Some(account_id) = &refund_account_id {
                    self.db
                        .accounts()
                        .adjust_balance_in(&mut tx, account_id, -refund)
                        .await?;
                }
                Some(payment)
            }
            _ => None,
        };

        tx.commit().await?;

        info!(
            return_id = %return_id,
            sale_id = %sale.id,
            value = total.cents(),
            refund = refund.cents(),
            lines = items.len(),
            "Sales return recorded"
        );

        Ok(SalesReturnDetail {
            sales_return,
            items,
            refund: refund_payment,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::Fixture;
    use tradebook_core::requests::{
        CreateSaleRequest, CreateSalesReturnRequest, RefundRequest, ReturnLineRequest,
        SaleLineRequest, UpdateSalePaymentRequest,
    };
    use tradebook_core::{CoreError, PaymentMethod, PaymentStatus, Sale, SaleDetail};

    /// `lines` are (quantity, unit price) pairs of the fixture product.
    async fn sell_lines(
        fx: &Fixture,
        lines: &[(i64, i64)],
        discount_cents: i64,
        tax_cents: i64,
        paid_cents: i64,
    ) -> SaleDetail {
        fx.orchestrator
            .create_sale(
                &fx.manager,
                &CreateSaleRequest {
                    party_id: fx.customer.id.clone(),
                    warehouse_id: None,
                    items: lines
                        .iter()
                        .map(|(quantity, price)| SaleLineRequest {
                            product_id: fx.product.id.clone(),
                            variant_id: None,
                            quantity: *quantity,
                            unit_price_cents: Some(*price),
                            discount_cents: 0,
                        })
                        .collect(),
                    discount_cents,
                    tax_cents,
                    paid_cents,
                    account_id: Some(fx.till.id.clone()),
                    notes: None,
                },
            )
            .await
            .unwrap()
    }

    async fn sell(fx: &Fixture, quantity: i64, paid_cents: i64) -> SaleDetail {
        sell_lines(fx, &[(quantity, 1000)], 0, 0, paid_cents).await
    }

    /// `lines` are (sale line index, quantity) pairs.
    fn return_lines(detail: &SaleDetail, lines: &[(usize, i64)]) -> CreateSalesReturnRequest {
        CreateSalesReturnRequest {
            sale_id: detail.sale.id.clone(),
            lines: lines
                .iter()
                .map(|(index, quantity)| ReturnLineRequest {
                    sale_item_id: detail.items[*index].id.clone(),
                    quantity: *quantity,
                })
                .collect(),
            refund: None,
            reason: Some("damaged".to_string()),
        }
    }

    fn return_of(detail: &SaleDetail, quantity: i64) -> CreateSalesReturnRequest {
        return_lines(detail, &[(0, quantity)])
    }

    async fn sale_row(fx: &Fixture, sale_id: &str) -> Sale {
        fx.db.sales().get_detail(sale_id).await.unwrap().unwrap().sale
    }

    fn pay(sale_id: &str, amount_cents: i64) -> UpdateSalePaymentRequest {
        UpdateSalePaymentRequest {
            sale_id: sale_id.to_string(),
            amount_cents,
            method: PaymentMethod::Cash,
            account_id: None,
            reference: None,
        }
    }

    #[tokio::test]
    async fn test_partial_return_with_refund() {
        let fx = Fixture::new().await;
        fx.stock(&fx.main.id, 10).await;
        let sale = sell(&fx, 4, 4000).await;
        assert_eq!(fx.balance(&fx.customer.id).await, 0);

        let mut request = return_of(&sale, 1);
        request.refund = Some(RefundRequest {
            amount_cents: 1000,
            method: PaymentMethod::Cash,
            account_id: Some(fx.till.id.clone()),
        });
        let detail = fx
            .orchestrator
            .create_sales_return(&fx.manager, &request)
            .await
            .unwrap();

        assert_eq!(detail.sales_return.total_cents, 1000);
        assert!(detail.refund.is_some());
        assert_eq!(fx.on_hand(&fx.main.id).await, 7);
        assert_eq!(fx.balance(&fx.customer.id).await, 0);
        assert_eq!(fx.account_balance(&fx.till.id).await, 3000);

        let items = fx
            .db
            .sales()
            .get_detail(&sale.sale.id)
            .await
            .unwrap()
            .unwrap()
            .items;
        assert_eq!(items[0].returned_quantity, 1);
        fx.assert_reconciled(&fx.customer.id).await;
    }

    #[tokio::test]
    async fn test_full_return_of_discounted_sale_credits_net() {
        let fx = Fixture::new().await;
        fx.stock(&fx.main.id, 10).await;
        // 2 × $10, $5 off, $3 tax → net $18
        let sale = sell_lines(&fx, &[(2, 1000)], 500, 300, 0).await;
        assert_eq!(sale.sale.net_cents, 1800);

        let detail = fx
            .orchestrator
            .create_sales_return(&fx.manager, &return_of(&sale, 2))
            .await
            .unwrap();

        assert_eq!(detail.sales_return.total_cents, 1800);
        assert_eq!(fx.balance(&fx.customer.id).await, 0);
        assert_eq!(fx.on_hand(&fx.main.id).await, 10);

        fx.orchestrator
            .cancel_sale(&fx.manager, &sale.sale.id)
            .await
            .unwrap();
        assert_eq!(fx.balance(&fx.customer.id).await, 0);
        assert_eq!(fx.on_hand(&fx.main.id).await, 10);
        fx.assert_reconciled(&fx.customer.id).await;
    }

    #[tokio::test]
    async fn test_piecemeal_returns_spread_discount_and_tax() {
        let fx = Fixture::new().await;
        fx.stock(&fx.main.id, 10).await;
        // 3 × $10 + 1 × $5 = $35, $3.50 off, $1.75 tax → net $33.25
        // line shares: $28.50 and $4.75
        let sale = sell_lines(&fx, &[(3, 1000), (1, 500)], 350, 175, 0).await;
        assert_eq!(sale.sale.net_cents, 3325);

        let first = fx
            .orchestrator
            .create_sales_return(&fx.manager, &return_lines(&sale, &[(0, 1), (1, 1)]))
            .await
            .unwrap();
        assert_eq!(first.items[0].amount_cents, 950);
        assert_eq!(first.items[1].amount_cents, 475);

        let second = fx
            .orchestrator
            .create_sales_return(&fx.manager, &return_of(&sale, 1))
            .await
            .unwrap();
        assert_eq!(second.sales_return.total_cents, 950);
        assert_eq!(fx.balance(&fx.customer.id).await, 950);
        assert_eq!(sale_row(&fx, &sale.sale.id).await.returned_cents, 2375);

        let third = fx
            .orchestrator
            .create_sales_return(&fx.manager, &return_of(&sale, 1))
            .await
            .unwrap();
        assert_eq!(third.sales_return.total_cents, 950);
        assert_eq!(fx.balance(&fx.customer.id).await, 0);

        fx.orchestrator
            .cancel_sale(&fx.manager, &sale.sale.id)
            .await
            .unwrap();
        assert_eq!(fx.balance(&fx.customer.id).await, 0);
        assert_eq!(fx.on_hand(&fx.main.id).await, 10);
        fx.assert_reconciled(&fx.customer.id).await;
    }

    #[tokio::test]
    async fn test_cancel_after_partial_return_on_discounted_sale() {
        let fx = Fixture::new().await;
        fx.stock(&fx.main.id, 10).await;
        // 4 × $10, $4 off, $2 tax → net $38, $9.50 per unit
        let sale = sell_lines(&fx, &[(4, 1000)], 400, 200, 1000).await;
        assert_eq!(fx.balance(&fx.customer.id).await, 2800);

        fx.orchestrator
            .create_sales_return(&fx.manager, &return_of(&sale, 1))
            .await
            .unwrap();
        assert_eq!(fx.balance(&fx.customer.id).await, 1850);

        fx.orchestrator
            .cancel_sale(&fx.manager, &sale.sale.id)
            .await
            .unwrap();
        assert_eq!(fx.balance(&fx.customer.id).await, 0);
        assert_eq!(fx.account_balance(&fx.till.id).await, 0);
        assert_eq!(fx.on_hand(&fx.main.id).await, 10);

        let cancelled = sale_row(&fx, &sale.sale.id).await;
        assert_eq!(cancelled.paid_cents, 0);
        assert_eq!(cancelled.balance_cents, 0);
        fx.assert_reconciled(&fx.customer.id).await;
    }

    #[tokio::test]
    async fn test_return_reduces_sale_balance() {
        let fx = Fixture::new().await;
        fx.stock(&fx.main.id, 10).await;
        let sale = sell(&fx, 2, 0).await;

        fx.orchestrator
            .create_sales_return(&fx.manager, &return_of(&sale, 1))
            .await
            .unwrap();
        let row = sale_row(&fx, &sale.sale.id).await;
        assert_eq!(row.returned_cents, 1000);
        assert_eq!(row.balance_cents, 1000);
        assert_eq!(row.payment_status, PaymentStatus::Unpaid);
        assert_eq!(fx.balance(&fx.customer.id).await, row.balance_cents);

        let err = fx
            .orchestrator
            .update_sale_payment(&fx.manager, &pay(&sale.sale.id, 1001))
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_domain(),
            Some(CoreError::Overpayment { balance_cents: 1000, .. })
        ));

        fx.orchestrator
            .update_sale_payment(&fx.manager, &pay(&sale.sale.id, 1000))
            .await
            .unwrap();
        let row = sale_row(&fx, &sale.sale.id).await;
        assert_eq!(row.balance_cents, 0);
        assert_eq!(row.payment_status, PaymentStatus::Paid);
        assert_eq!(fx.balance(&fx.customer.id).await, 0);
        fx.assert_reconciled(&fx.customer.id).await;
    }

    #[tokio::test]
    async fn test_no_payment_accepted_for_fully_returned_sale() {
        let fx = Fixture::new().await;
        fx.stock(&fx.main.id, 10).await;
        let sale = sell(&fx, 2, 0).await;

        fx.orchestrator
            .create_sales_return(&fx.manager, &return_of(&sale, 2))
            .await
            .unwrap();
        let row = sale_row(&fx, &sale.sale.id).await;
        assert_eq!(row.balance_cents, 0);
        assert_eq!(row.payment_status, PaymentStatus::Paid);
        assert_eq!(fx.balance(&fx.customer.id).await, 0);

        let err = fx
            .orchestrator
            .update_sale_payment(&fx.manager, &pay(&sale.sale.id, 2000))
            .await
            .unwrap_err();
        assert!(matches!(err.as_domain(), Some(CoreError::Overpayment { .. })));
        assert_eq!(fx.balance(&fx.customer.id).await, 0);
    }

    #[tokio::test]
    async fn test_refund_and_its_deletion_move_sale_paid() {
        let fx = Fixture::new().await;
        fx.stock(&fx.main.id, 10).await;
        let sale = sell(&fx, 4, 4000).await;

        let mut request = return_of(&sale, 1);
        request.refund = Some(RefundRequest {
            amount_cents: 1000,
            method: PaymentMethod::Cash,
            account_id: Some(fx.till.id.clone()),
        });
        let detail = fx
            .orchestrator
            .create_sales_return(&fx.manager, &request)
            .await
            .unwrap();
        let row = sale_row(&fx, &sale.sale.id).await;
        assert_eq!(row.paid_cents, 3000);
        assert_eq!(row.balance_cents, 0);
        assert_eq!(row.payment_status, PaymentStatus::Paid);

        let refund = detail.refund.unwrap();
        fx.orchestrator
            .delete_payment(&fx.manager, &refund.id)
            .await
            .unwrap();
        let row = sale_row(&fx, &sale.sale.id).await;
        assert_eq!(row.paid_cents, 4000);
        assert_eq!(row.balance_cents, -1000);
        assert_eq!(fx.balance(&fx.customer.id).await, -1000);
        assert_eq!(fx.account_balance(&fx.till.id).await, 4000);
        fx.assert_reconciled(&fx.customer.id).await;
    }

    #[tokio::test]
    async fn test_over_return_rejected() {
        let fx = Fixture::new().await;
        fx.stock(&fx.main.id, 10).await;
        let sale = sell(&fx, 2, 0).await;

        fx.orchestrator
            .create_sales_return(&fx.manager, &return_of(&sale, 2))
            .await
            .unwrap();
        let err = fx
            .orchestrator
            .create_sales_return(&fx.manager, &return_of(&sale, 1))
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_domain(),
            Some(CoreError::ReturnExceedsRemaining { remaining: 0, .. })
        ));
        assert_eq!(fx.on_hand(&fx.main.id).await, 10);
    }

    #[tokio::test]
    async fn test_refund_cannot_exceed_return_value() {
        let fx = Fixture::new().await;
        fx.stock(&fx.main.id, 10).await;
        let sale = sell(&fx, 2, 2000).await;

        let mut request = return_of(&sale, 1);
        request.refund = Some(RefundRequest {
            amount_cents: 1500,
            method: PaymentMethod::Cash,
            account_id: None,
        });
        let err = fx
            .orchestrator
            .create_sales_return(&fx.manager, &request)
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_domain(),
            Some(CoreError::RefundExceedsReturn { .. })
        ));
    }

    #[tokio::test]
    async fn test_cancel_after_partial_return_restocks_remainder() {
        let fx = Fixture::new().await;
        fx.stock(&fx.main.id, 10).await;
        let sale = sell(&fx, 4, 4000).await;

        let mut request = return_of(&sale, 1);
        request.refund = Some(RefundRequest {
            amount_cents: 1000,
            method: PaymentMethod::Cash,
            account_id: Some(fx.till.id.clone()),
        });
        fx.orchestrator
            .create_sales_return(&fx.manager, &request)
            .await
            .unwrap();
        fx.orchestrator
            .cancel_sale(&fx.manager, &sale.sale.id)
            .await
            .unwrap();

        assert_eq!(fx.on_hand(&fx.main.id).await, 10);
        assert_eq!(fx.balance(&fx.customer.id).await, 0);
        assert_eq!(fx.account_balance(&fx.till.id).await, 0);
        fx.assert_reconciled(&fx.customer.id).await;

        let err = fx
            .orchestrator
            .create_sales_return(&fx.manager, &return_of(&sale, 1))
            .await
            .unwrap_err();
        assert!(matches!(err.as_domain(), Some(CoreError::SaleCancelled(_))));
    }
}
