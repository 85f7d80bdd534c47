//! # Sales Return Repository
//!
//! Rows for customer returns against a sale.
//!
//! ```text
//! sale ──┬── return #1 (lines, value, refund?)
//!        └── return #2 ...
//!
//! The sale row carries Σ returned value (`returned_cents`); Σ refunds
//! per sale feed the cancellation math, so cancelling only hands back the
//! cash that returns have not already refunded.
//! ```

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use super::PaymentRepository;
use crate::error::DbResult;
use tradebook_core::{Money, SalesReturn, SalesReturnDetail, SalesReturnItem};

#[derive(Debug, Clone)]
pub struct SalesReturnRepository {
    pool: SqlitePool,
}

impl SalesReturnRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SalesReturnRepository { pool }
    }

    pub async fn insert_in(
        &self,
        conn: &mut SqliteConnection,
        sales_return: &SalesReturn,
    ) -> DbResult<()> {
        debug!(
            id = %sales_return.id,
            sale_id = %sales_return.sale_id,
            total = sales_return.total_cents,
            refund = sales_return.refund_cents,
            "Inserting sales return"
        );

        sqlx::query(
            r#"
            INSERT INTO sales_returns (
                id, sale_id, party_id, warehouse_id, total_cents, refund_cents,
                refund_account_id, reason, actor_id, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&sales_return.id)
        .bind(&sales_return.sale_id)
        .bind(&sales_return.party_id)
        .bind(&sales_return.warehouse_id)
        .bind(sales_return.total_cents)
        .bind(sales_return.refund_cents)
        .bind(&sales_return.refund_account_id)
        .bind(&sales_return.reason)
        .bind(&sales_return.actor_id)
        .bind(sales_return.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    pub async fn insert_item_in(
        &self,
        conn: &mut SqliteConnection,
        item: &SalesReturnItem,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO sales_return_items (
                id, return_id, sale_item_id, product_id, variant_id, quantity, amount_cents
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&item.id)
        .bind(&item.return_id)
        .bind(&item.sale_item_id)
        .bind(&item.product_id)
        .bind(&item.variant_id)
        .bind(item.quantity)
        .bind(item.amount_cents)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Σ cash already handed back through returns of one sale.
    pub async fn refunded_for_sale_in(
        &self,
        conn: &mut SqliteConnection,
        sale_id: &str,
    ) -> DbResult<Money> {
        let refunded: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(refund_cents), 0) FROM sales_returns WHERE sale_id = ?1",
        )
        .bind(sale_id)
        .fetch_one(&mut *conn)
        .await?;

        Ok(Money::from_cents(refunded))
    }

    /// Forgets a return's refund after its payment was deleted.
    pub async fn clear_refund_in(&self, conn: &mut SqliteConnection, return_id: &str) -> DbResult<()> {
        sqlx::query(
            "UPDATE sales_returns SET refund_cents = 0, refund_account_id = NULL WHERE id = ?1",
        )
        .bind(return_id)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    pub async fn find_in(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
    ) -> DbResult<Option<SalesReturn>> {
        let sales_return = sqlx::query_as::<_, SalesReturn>(
            r#"
            SELECT id, sale_id, party_id, warehouse_id, total_cents, refund_cents,
                   refund_account_id, reason, actor_id, created_at
            FROM sales_returns
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(sales_return)
    }

    pub async fn items_in(
        &self,
        conn: &mut SqliteConnection,
        return_id: &str,
    ) -> DbResult<Vec<SalesReturnItem>> {
        let items = sqlx::query_as::<_, SalesReturnItem>(
            r#"
            SELECT id, return_id, sale_item_id, product_id, variant_id, quantity, amount_cents
            FROM sales_return_items
            WHERE return_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(return_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(items)
    }

    /// Every return of a sale, oldest first.
    pub async fn list_for_sale(&self, sale_id: &str) -> DbResult<Vec<SalesReturn>> {
        let returns = sqlx::query_as::<_, SalesReturn>(
            r#"
            SELECT id, sale_id, party_id, warehouse_id, total_cents, refund_cents,
                   refund_account_id, reason, actor_id, created_at
            FROM sales_returns
            WHERE sale_id = ?1
            ORDER BY created_at, rowid
            "#,
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(returns)
    }

    pub async fn get_detail(&self, id: &str) -> DbResult<Option<SalesReturnDetail>> {
        let mut conn = self.pool.acquire().await?;
        let Some(sales_return) = self.find_in(&mut conn, id).await? else {
            return Ok(None);
        };
        let items = self.items_in(&mut conn, id).await?;
        let refund = PaymentRepository::new(self.pool.clone())
            .for_sales_return_in(&mut conn, id)
            .await?;

        Ok(Some(SalesReturnDetail {
            sales_return,
            items,
            refund,
        }))
    }
}
