//! # Balance Projector
//!
//! Read-side views over the ledgers. Nothing here writes.
//!
//! ```text
//! ┌────────────────────┐        ┌───────────────────────────────────────┐
//! │   stock_ledger     │──SUM──►│ current_quantity / stock_by_warehouse │
//! │                    │        │ low_stock                             │
//! └────────────────────┘        └───────────────────────────────────────┘
//! ┌────────────────────┐        ┌───────────────────────────────────────┐
//! │   party_ledger     │───────►│ party_ledger (statement)              │
//! │   parties (cache)  │───────►│ party_balance, reconcile_party        │
//! └────────────────────┘        └───────────────────────────────────────┘
//! ```
//!
//! Reads go through the pool without the write gate, so they observe
//! committed data only and never wait on a running workflow.

use sqlx::SqlitePool;

use crate::error::DbResult;
use crate::repository::{PartyLedgerRepository, StockLedgerRepository};
use tradebook_core::{
    BalanceReconciliation, LowStockItem, Money, PartyLedgerEntry, StockKey, WarehouseStock,
};

#[derive(Debug, Clone)]
pub struct BalanceProjector {
    pool: SqlitePool,
}

impl BalanceProjector {
    pub fn new(pool: SqlitePool) -> Self {
        BalanceProjector { pool }
    }

    fn stock(&self) -> StockLedgerRepository {
        StockLedgerRepository::new(self.pool.clone())
    }

    fn parties(&self) -> PartyLedgerRepository {
        PartyLedgerRepository::new(self.pool.clone())
    }

    /// On-hand quantity; `None` filters widen to all variants / warehouses.
    ///
    /// With `variant_id = None` the figure includes every variant, so it can
    /// be larger than what a sale of the plain product may deduct. Use
    /// [`on_hand`](Self::on_hand) for the exact bucket a sale checks.
    pub async fn current_quantity(
        &self,
        product_id: &str,
        variant_id: Option<&str>,
        warehouse_id: Option<&str>,
    ) -> DbResult<i64> {
        self.stock()
            .current_quantity(product_id, variant_id, warehouse_id)
            .await
    }

    /// Quantity of exactly one (product, variant, warehouse) bucket; a
    /// `None` variant is the product-level bucket only.
    pub async fn on_hand(&self, key: &StockKey) -> DbResult<i64> {
        self.stock().on_hand(key).await
    }

    pub async fn stock_by_warehouse(&self, product_id: &str) -> DbResult<Vec<WarehouseStock>> {
        self.stock().stock_by_warehouse(product_id).await
    }

    pub async fn party_balance(&self, party_id: &str) -> DbResult<Money> {
        self.parties().balance(party_id).await
    }

    pub async fn party_ledger(&self, party_id: &str) -> DbResult<Vec<PartyLedgerEntry>> {
        self.parties().entries(party_id).await
    }

    /// Active products at or below their reorder level.
    ///
    /// Products with a reorder level of zero are never listed.
    pub async fn low_stock(&self, warehouse_id: Option<&str>) -> DbResult<Vec<LowStockItem>> {
        let items = sqlx::query_as::<_, LowStockItem>(
            r#"
            SELECT p.id AS product_id,
                   p.sku,
                   p.name,
                   COALESCE(SUM(l.quantity_delta), 0) AS quantity,
                   p.reorder_level
            FROM products p
            LEFT JOIN stock_ledger l
                   ON l.product_id = p.id
                  AND (?1 IS NULL OR l.warehouse_id = ?1)
            WHERE p.is_active = 1 AND p.reorder_level > 0
            GROUP BY p.id, p.sku, p.name, p.reorder_level
            HAVING COALESCE(SUM(l.quantity_delta), 0) <= p.reorder_level
            ORDER BY quantity, p.sku
            "#,
        )
        .bind(warehouse_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Cached balance versus a replay of the party's entries.
    pub async fn reconcile_party(&self, party_id: &str) -> DbResult<BalanceReconciliation> {
        self.parties().reconcile(party_id).await
    }
}

#[cfg(test)]
mod tests {
    use crate::orchestrator::test_support::Fixture;
    use tradebook_core::requests::{CreateSaleRequest, SaleLineRequest};
    use tradebook_core::{CoreError, StockChange, StockEntryType, StockKey};

    #[tokio::test]
    async fn test_on_hand_excludes_variants() {
        let fx = Fixture::new().await;
        fx.stock(&fx.main.id, 4).await;
        let six_pack = fx
            .db
            .catalog()
            .create_variant(&fx.product.id, "COLA-330-6PK", "6-pack", Some(800))
            .await
            .unwrap();
        let variant_key = StockKey::new(&fx.product.id, Some(six_pack.id.clone()), &fx.main.id);
        let mut conn = fx.db.pool().acquire().await.unwrap();
        fx.db
            .stock_ledger()
            .record_in(
                &mut conn,
                &StockChange {
                    key: variant_key.clone(),
                    quantity_delta: 6,
                    entry_type: StockEntryType::Adjustment,
                    reference_id: None,
                    actor_id: "fixture".to_string(),
                    note: None,
                },
            )
            .await
            .unwrap();
        drop(conn);

        let projector = fx.db.projector();
        let base_key = StockKey::new(&fx.product.id, None, &fx.main.id);
        assert_eq!(
            projector
                .current_quantity(&fx.product.id, None, Some(&fx.main.id))
                .await
                .unwrap(),
            10
        );
        assert_eq!(projector.on_hand(&base_key).await.unwrap(), 4);
        assert_eq!(projector.on_hand(&variant_key).await.unwrap(), 6);

        // a plain-product sale is checked against the base bucket only
        let err = fx
            .orchestrator
            .create_sale(
                &fx.manager,
                &CreateSaleRequest {
                    party_id: fx.customer.id.clone(),
                    warehouse_id: None,
                    items: vec![SaleLineRequest {
                        product_id: fx.product.id.clone(),
                        variant_id: None,
                        quantity: 5,
                        unit_price_cents: Some(150),
                        discount_cents: 0,
                    }],
                    discount_cents: 0,
                    tax_cents: 0,
                    paid_cents: 0,
                    account_id: None,
                    notes: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_domain(),
            Some(CoreError::InsufficientStock { available: 4, .. })
        ));
    }

    #[tokio::test]
    async fn test_low_stock_by_warehouse() {
        let fx = Fixture::new().await;
        fx.stock(&fx.main.id, 4).await;
        fx.stock(&fx.back.id, 20).await;
        let projector = fx.db.projector();

        let everywhere = projector.low_stock(None).await.unwrap();
        assert!(everywhere.is_empty());

        let main_only = projector.low_stock(Some(&fx.main.id)).await.unwrap();
        assert_eq!(main_only.len(), 1);
        assert_eq!(main_only[0].sku, "COLA-330");
        assert_eq!(main_only[0].quantity, 4);
        assert_eq!(main_only[0].reorder_level, 5);
    }

    #[tokio::test]
    async fn test_projections_after_sale() {
        let fx = Fixture::new().await;
        fx.stock(&fx.main.id, 10).await;
        fx.stock(&fx.back.id, 3).await;

        fx.orchestrator
            .create_sale(
                &fx.manager,
                &CreateSaleRequest {
                    party_id: fx.customer.id.clone(),
                    warehouse_id: None,
                    items: vec![SaleLineRequest {
                        product_id: fx.product.id.clone(),
                        variant_id: None,
                        quantity: 5,
                        unit_price_cents: Some(1000),
                        discount_cents: 0,
                    }],
                    discount_cents: 0,
                    tax_cents: 0,
                    paid_cents: 2000,
                    account_id: None,
                    notes: None,
                },
            )
            .await
            .unwrap();

        let projector = fx.db.projector();
        assert_eq!(
            projector
                .current_quantity(&fx.product.id, None, None)
                .await
                .unwrap(),
            8
        );
        let by_warehouse = projector.stock_by_warehouse(&fx.product.id).await.unwrap();
        assert_eq!(by_warehouse.len(), 2);
        assert_eq!(
            projector.party_balance(&fx.customer.id).await.unwrap().cents(),
            3000
        );

        let statement = projector.party_ledger(&fx.customer.id).await.unwrap();
        let running: Vec<i64> = statement.iter().map(|e| e.running_balance_cents).collect();
        assert_eq!(running, vec![5000, 3000]);
        assert!(projector
            .reconcile_party(&fx.customer.id)
            .await
            .unwrap()
            .is_consistent());
    }
}
