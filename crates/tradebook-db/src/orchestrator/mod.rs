//! # Transaction Orchestrator
//!
//! Every business workflow as one atomic unit of work.
//!
//! ## Anatomy of a Workflow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         One Workflow                                    │
//! │                                                                         │
//! │  db.begin_write()            ← first statement writes write_gate,       │
//! │       │                        so SQLite hands us the write lock now    │
//! │       ▼                                                                 │
//! │  validate on the tx          ← existence checks, on-hand stock,         │
//! │       │                        remaining quantities, balances           │
//! │       ▼                                                                 │
//! │  write documents             ← sales / purchases / payments ...         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  append ledger entries       ← stock_ledger, party_ledger,              │
//! │       │                        account balances                         │
//! │       ▼                                                                 │
//! │  tx.commit()                 ← all or nothing                           │
//! │                                                                         │
//! │  Any `?` before commit drops the tx, which rolls back every write.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Because the gate is taken before the first validation read, two
//! workflows never validate against the same snapshot: the second one
//! waits on the lock (up to the busy timeout) and then sees the first
//! one's committed entries.
//!
//! ## Workflows
//! - [`sale`]: create, cancel, pay down
//! - [`purchase`]: create, receive
//! - [`transfer`]: create, complete
//! - [`sales_return`]: partial returns with optional refund
//! - [`payment`]: standalone payments and their administrative deletion
//! - [`stock`]: manual adjustments
//! - [`party`]: party creation with opening balance

use std::collections::BTreeMap;

use sqlx::SqliteConnection;

use crate::error::DbResult;
use crate::pool::Database;
use tradebook_core::{
    Actor, CoreError, EntrySource, Money, PartyEntryDraft, PartyEntryType, StockChange,
    StockEntryType, StockKey,
};

pub mod party;
pub mod payment;
pub mod purchase;
pub mod sale;
pub mod sales_return;
pub mod stock;
pub mod transfer;

/// Runs business workflows against one database.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    db: Database,
    default_warehouse_id: String,
}

impl Orchestrator {
    /// `default_warehouse_id` is used whenever a sale, purchase or
    /// adjustment names no warehouse. It is validated on use, not here.
    pub fn new(db: Database, default_warehouse_id: impl Into<String>) -> Self {
        Orchestrator {
            db,
            default_warehouse_id: default_warehouse_id.into(),
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn default_warehouse_id(&self) -> &str {
        &self.default_warehouse_id
    }

    fn resolve_warehouse<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        requested.unwrap_or(&self.default_warehouse_id)
    }

    /// Checks that every (product, variant) key has enough on hand in one
    /// warehouse. Must run after `begin_write`.
    async fn ensure_available(
        &self,
        conn: &mut SqliteConnection,
        warehouse_id: &str,
        demand: &BTreeMap<(String, Option<String>), i64>,
    ) -> DbResult<()> {
        let catalog = self.db.catalog();
        let stock = self.db.stock_ledger();

        for ((product_id, variant_id), requested) in demand {
            let product = catalog.require_product_in(conn, product_id).await?;
            let sku = match variant_id {
                Some(variant_id) => {
                    catalog
                        .require_variant_in(conn, product_id, variant_id)
                        .await?
                        .sku
                }
                None => product.sku,
            };

            let key = StockKey::new(product_id, variant_id.clone(), warehouse_id);
            let available = stock.on_hand_in(conn, &key).await?;
            if available < *requested {
                return Err(CoreError::InsufficientStock {
                    sku,
                    available,
                    requested: *requested,
                }
                .into());
            }
        }

        Ok(())
    }

    /// Validates product and variant ids without reading stock.
    async fn ensure_catalog_item(
        &self,
        conn: &mut SqliteConnection,
        product_id: &str,
        variant_id: Option<&str>,
    ) -> DbResult<()> {
        let catalog = self.db.catalog();
        catalog.require_product_in(conn, product_id).await?;
        if let Some(variant_id) = variant_id {
            catalog
                .require_variant_in(conn, product_id, variant_id)
                .await?;
        }
        Ok(())
    }

    async fn record_stock(
        &self,
        conn: &mut SqliteConnection,
        key: StockKey,
        quantity_delta: i64,
        entry_type: StockEntryType,
        reference_id: &str,
        actor: &Actor,
    ) -> DbResult<()> {
        if quantity_delta == 0 {
            return Ok(());
        }

        self.db
            .stock_ledger()
            .record_in(
                conn,
                &StockChange {
                    key,
                    quantity_delta,
                    entry_type,
                    reference_id: Some(reference_id.to_string()),
                    actor_id: actor.user_id.clone(),
                    note: None,
                },
            )
            .await?;

        Ok(())
    }

    /// Appends a party entry unless the amount is zero.
    async fn post_party(&self, conn: &mut SqliteConnection, entry: PartyPosting<'_>) -> DbResult<()> {
        if entry.amount.is_zero() {
            return Ok(());
        }

        self.db
            .party_ledger()
            .append_in(
                conn,
                &PartyEntryDraft {
                    party_id: entry.party_id.to_string(),
                    entry_type: entry.entry_type,
                    amount: entry.amount,
                    description: entry.description,
                    source: entry.source,
                    payment_id: entry.payment_id.map(str::to_string),
                    transaction_id: entry.transaction_id.map(str::to_string),
                    actor_id: entry.actor.user_id.clone(),
                },
            )
            .await?;

        Ok(())
    }
}

/// Arguments of one party ledger posting.
struct PartyPosting<'a> {
    party_id: &'a str,
    entry_type: PartyEntryType,
    amount: Money,
    description: String,
    source: EntrySource,
    payment_id: Option<&'a str>,
    transaction_id: Option<&'a str>,
    actor: &'a Actor,
}

#[cfg(test)]
pub(crate) mod test_support;

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::test_support::Fixture;
    use crate::pool::DbConfig;
    use tradebook_core::requests::{CreateSaleRequest, SaleLineRequest};
    use tradebook_core::CoreError;

    fn sale_of(fx: &Fixture, quantity: i64) -> CreateSaleRequest {
        CreateSaleRequest {
            party_id: fx.customer.id.clone(),
            warehouse_id: None,
            items: vec![SaleLineRequest {
                product_id: fx.product.id.clone(),
                variant_id: None,
                quantity,
                unit_price_cents: None,
                discount_cents: 0,
            }],
            discount_cents: 0,
            tax_cents: 0,
            paid_cents: 0,
            account_id: None,
            notes: None,
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_sales_never_oversell() {
        let path = std::env::temp_dir().join(format!("tradebook-{}.db", uuid::Uuid::new_v4()));
        let fx = Arc::new(Fixture::with_config(DbConfig::new(&path).max_connections(4)).await);
        fx.stock(&fx.main.id, 3).await;

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let fx = Arc::clone(&fx);
                tokio::spawn(async move {
                    let request = sale_of(&fx, 3);
                    fx.orchestrator.create_sale(&fx.manager, &request).await
                })
            })
            .collect();

        let mut succeeded = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => succeeded += 1,
                Err(err) => assert!(matches!(
                    err.as_domain(),
                    Some(CoreError::InsufficientStock { available: 0, .. })
                )),
            }
        }

        assert_eq!(succeeded, 1);
        assert_eq!(fx.on_hand(&fx.main.id).await, 0);
        fx.assert_reconciled(&fx.customer.id).await;

        fx.db.close().await;
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_failed_workflow_leaves_no_trace() {
        let fx = Fixture::new().await;
        fx.stock(&fx.main.id, 1).await;

        let mut request = sale_of(&fx, 1);
        request.account_id = Some(uuid::Uuid::new_v4().to_string());
        request.paid_cents = 150;
        assert!(fx
            .orchestrator
            .create_sale(&fx.manager, &request)
            .await
            .is_err());

        assert_eq!(fx.on_hand(&fx.main.id).await, 1);
        assert_eq!(fx.balance(&fx.customer.id).await, 0);
        assert!(fx
            .db
            .sales()
            .list_for_party(&fx.customer.id)
            .await
            .unwrap()
            .is_empty());
    }
}
