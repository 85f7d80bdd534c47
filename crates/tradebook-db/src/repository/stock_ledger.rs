//! # Stock Ledger Repository
//!
//! Append-only journal of signed quantity changes.
//!
//! ## On-hand Is Derived
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  stock_ledger  (product=COLA, variant=∅, warehouse=MAIN)                │
//! │                                                                         │
//! │  seq  type        delta   reference                                     │
//! │  ───  ──────────  ─────   ─────────                                     │
//! │   1   purchase     +10    purchase 7f3…                                 │
//! │   2   sale          −5    sale     a91…                                 │
//! │   3   return        +5    sale     a91…  (cancellation)                 │
//! │   4   transfer      −4    transfer 0c2…                                 │
//! │                    ────                                                 │
//! │   on hand           =6   ← SUM(quantity_delta), never stored            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rows are never updated or deleted. A mistake is corrected with an
//! offsetting entry.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use tradebook_core::{StockChange, StockKey, StockLedgerEntry, WarehouseStock};

#[derive(Debug, Clone)]
pub struct StockLedgerRepository {
    pool: SqlitePool,
}

impl StockLedgerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        StockLedgerRepository { pool }
    }

    /// Appends one immutable entry.
    ///
    /// No sign validation happens here: callers check on-hand stock before
    /// appending a deduction.
    pub async fn record_in(
        &self,
        conn: &mut SqliteConnection,
        change: &StockChange,
    ) -> DbResult<StockLedgerEntry> {
        let entry = StockLedgerEntry {
            id: Uuid::new_v4().to_string(),
            product_id: change.key.product_id.clone(),
            variant_id: change.key.variant_id.clone(),
            warehouse_id: change.key.warehouse_id.clone(),
            quantity_delta: change.quantity_delta,
            entry_type: change.entry_type,
            reference_id: change.reference_id.clone(),
            actor_id: change.actor_id.clone(),
            note: change.note.clone(),
            created_at: Utc::now(),
        };

        debug!(
            product_id = %entry.product_id,
            warehouse_id = %entry.warehouse_id,
            delta = entry.quantity_delta,
            entry_type = ?entry.entry_type,
            "Recording stock change"
        );

        sqlx::query(
            r#"
            INSERT INTO stock_ledger (
                id, product_id, variant_id, warehouse_id, quantity_delta,
                entry_type, reference_id, actor_id, note, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.product_id)
        .bind(&entry.variant_id)
        .bind(&entry.warehouse_id)
        .bind(entry.quantity_delta)
        .bind(entry.entry_type)
        .bind(&entry.reference_id)
        .bind(&entry.actor_id)
        .bind(&entry.note)
        .bind(entry.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(entry)
    }

    /// On-hand quantity of exactly one stock bucket.
    ///
    /// `variant_id = None` means the product-level bucket, not "all
    /// variants"; this is the figure workflows validate deductions against.
    pub async fn on_hand_in(&self, conn: &mut SqliteConnection, key: &StockKey) -> DbResult<i64> {
        let quantity: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(quantity_delta), 0)
            FROM stock_ledger
            WHERE product_id = ?1 AND warehouse_id = ?2 AND variant_id IS ?3
            "#,
        )
        .bind(&key.product_id)
        .bind(&key.warehouse_id)
        .bind(&key.variant_id)
        .fetch_one(&mut *conn)
        .await?;

        Ok(quantity)
    }

    /// On-hand quantity of one bucket, outside any transaction.
    pub async fn on_hand(&self, key: &StockKey) -> DbResult<i64> {
        let mut conn = self.pool.acquire().await?;
        self.on_hand_in(&mut conn, key).await
    }

    /// Sums matching entries.
    ///
    /// - `variant_id = None` → every variant of the product (and the
    ///   product-level bucket); wider than [`on_hand_in`](Self::on_hand_in)
    /// - `warehouse_id = None` → every warehouse
    /// - no entries → 0
    pub async fn current_quantity_in(
        &self,
        conn: &mut SqliteConnection,
        product_id: &str,
        variant_id: Option<&str>,
        warehouse_id: Option<&str>,
    ) -> DbResult<i64> {
        let quantity: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(quantity_delta), 0)
            FROM stock_ledger
            WHERE product_id = ?1
              AND (?2 IS NULL OR variant_id = ?2)
              AND (?3 IS NULL OR warehouse_id = ?3)
            "#,
        )
        .bind(product_id)
        .bind(variant_id)
        .bind(warehouse_id)
        .fetch_one(&mut *conn)
        .await?;

        Ok(quantity)
    }

    pub async fn current_quantity(
        &self,
        product_id: &str,
        variant_id: Option<&str>,
        warehouse_id: Option<&str>,
    ) -> DbResult<i64> {
        let mut conn = self.pool.acquire().await?;
        self.current_quantity_in(&mut conn, product_id, variant_id, warehouse_id)
            .await
    }

    /// One row per warehouse that has entries for the product.
    pub async fn stock_by_warehouse(&self, product_id: &str) -> DbResult<Vec<WarehouseStock>> {
        let rows = sqlx::query_as::<_, WarehouseStock>(
            r#"
            SELECT w.id AS warehouse_id,
                   w.name AS warehouse_name,
                   SUM(l.quantity_delta) AS quantity
            FROM stock_ledger l
            INNER JOIN warehouses w ON w.id = l.warehouse_id
            WHERE l.product_id = ?1
            GROUP BY w.id, w.name
            ORDER BY w.name
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Entry history, oldest first, with the same filters as
    /// [`current_quantity`](Self::current_quantity).
    pub async fn entries(
        &self,
        product_id: &str,
        variant_id: Option<&str>,
        warehouse_id: Option<&str>,
    ) -> DbResult<Vec<StockLedgerEntry>> {
        let entries = sqlx::query_as::<_, StockLedgerEntry>(
            r#"
            SELECT id, product_id, variant_id, warehouse_id, quantity_delta,
                   entry_type, reference_id, actor_id, note, created_at
            FROM stock_ledger
            WHERE product_id = ?1
              AND (?2 IS NULL OR variant_id = ?2)
              AND (?3 IS NULL OR warehouse_id = ?3)
            ORDER BY seq
            "#,
        )
        .bind(product_id)
        .bind(variant_id)
        .bind(warehouse_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Every entry appended on behalf of one document.
    pub async fn entries_for_reference(&self, reference_id: &str) -> DbResult<Vec<StockLedgerEntry>> {
        let entries = sqlx::query_as::<_, StockLedgerEntry>(
            r#"
            SELECT id, product_id, variant_id, warehouse_id, quantity_delta,
                   entry_type, reference_id, actor_id, note, created_at
            FROM stock_ledger
            WHERE reference_id = ?1
            ORDER BY seq
            "#,
        )
        .bind(reference_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::catalog::NewProduct;
    use crate::pool::{Database, DbConfig};
    use tradebook_core::StockEntryType;

    fn change(key: &StockKey, delta: i64, entry_type: StockEntryType) -> StockChange {
        StockChange {
            key: key.clone(),
            quantity_delta: delta,
            entry_type,
            reference_id: None,
            actor_id: "tester".to_string(),
            note: None,
        }
    }

    #[tokio::test]
    async fn test_quantity_filters() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let catalog = db.catalog();
        let main = catalog.create_warehouse("MAIN", "Main").await.unwrap();
        let back = catalog.create_warehouse("BACK", "Back").await.unwrap();
        let product = catalog
            .create_product(NewProduct {
                sku: "TEE".to_string(),
                name: "T-shirt".to_string(),
                price_cents: 1500,
                cost_cents: None,
                reorder_level: 0,
            })
            .await
            .unwrap();
        let large = catalog
            .create_variant(&product.id, "TEE-L", "Large", None)
            .await
            .unwrap();

        let ledger = db.stock_ledger();
        let plain_main = StockKey::new(&product.id, None, &main.id);
        let large_main = StockKey::new(&product.id, Some(large.id.clone()), &main.id);
        let large_back = StockKey::new(&product.id, Some(large.id.clone()), &back.id);

        let mut conn = db.pool().acquire().await.unwrap();
        ledger
            .record_in(&mut conn, &change(&plain_main, 4, StockEntryType::Purchase))
            .await
            .unwrap();
        ledger
            .record_in(&mut conn, &change(&large_main, 6, StockEntryType::Purchase))
            .await
            .unwrap();
        ledger
            .record_in(&mut conn, &change(&large_back, 2, StockEntryType::Adjustment))
            .await
            .unwrap();

        assert_eq!(ledger.on_hand_in(&mut conn, &plain_main).await.unwrap(), 4);
        assert_eq!(ledger.on_hand_in(&mut conn, &large_main).await.unwrap(), 6);
        drop(conn);

        assert_eq!(
            ledger.current_quantity(&product.id, None, None).await.unwrap(),
            12
        );
        assert_eq!(
            ledger
                .current_quantity(&product.id, None, Some(&main.id))
                .await
                .unwrap(),
            10
        );
        assert_eq!(
            ledger
                .current_quantity(&product.id, Some(&large.id), None)
                .await
                .unwrap(),
            8
        );
        assert_eq!(
            ledger.current_quantity("unknown", None, None).await.unwrap(),
            0
        );

        let by_warehouse = ledger.stock_by_warehouse(&product.id).await.unwrap();
        assert_eq!(by_warehouse.len(), 2);
        assert_eq!(by_warehouse[0].warehouse_name, "Back");
        assert_eq!(by_warehouse[0].quantity, 2);
        assert_eq!(by_warehouse[1].quantity, 10);

        let history = ledger.entries(&product.id, None, Some(&main.id)).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].quantity_delta, 4);
    }
}
