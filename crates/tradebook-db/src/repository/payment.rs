//! # Payment Repository
//!
//! Money received from customers or paid to suppliers.
//!
//! A payment row is the document; its effect on the party lives in the
//! party ledger (`payment_id` points back here) and its effect on cash
//! lives in the named account. Payments are the only documents that can
//! be deleted, and only together with their ledger entries.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use tradebook_core::{CoreError, Payment};

const PAYMENT_COLUMNS: &str = r#"
    SELECT id, party_id, direction, method, amount_cents, account_id,
           sale_id, purchase_id, sales_return_id, reference, notes,
           actor_id, created_at
    FROM payments
"#;

#[derive(Debug, Clone)]
pub struct PaymentRepository {
    pool: SqlitePool,
}

impl PaymentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PaymentRepository { pool }
    }

    pub async fn insert_in(&self, conn: &mut SqliteConnection, payment: &Payment) -> DbResult<()> {
        debug!(
            id = %payment.id,
            party_id = %payment.party_id,
            direction = ?payment.direction,
            amount = payment.amount_cents,
            "Inserting payment"
        );

        sqlx::query(
            r#"
            INSERT INTO payments (
                id, party_id, direction, method, amount_cents, account_id,
                sale_id, purchase_id, sales_return_id, reference, notes,
                actor_id, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
        )
        .bind(&payment.id)
        .bind(&payment.party_id)
        .bind(payment.direction)
        .bind(payment.method)
        .bind(payment.amount_cents)
        .bind(&payment.account_id)
        .bind(&payment.sale_id)
        .bind(&payment.purchase_id)
        .bind(&payment.sales_return_id)
        .bind(&payment.reference)
        .bind(&payment.notes)
        .bind(&payment.actor_id)
        .bind(payment.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    pub async fn find_in(&self, conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Payment>> {
        let sql = format!("{PAYMENT_COLUMNS} WHERE id = ?1");
        let payment = sqlx::query_as::<_, Payment>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(payment)
    }

    pub async fn require_in(&self, conn: &mut SqliteConnection, id: &str) -> DbResult<Payment> {
        self.find_in(conn, id)
            .await?
            .ok_or_else(|| CoreError::PaymentNotFound(id.to_string()).into())
    }

    pub async fn find(&self, id: &str) -> DbResult<Option<Payment>> {
        let mut conn = self.pool.acquire().await?;
        self.find_in(&mut conn, id).await
    }

    pub async fn delete_in(&self, conn: &mut SqliteConnection, id: &str) -> DbResult<()> {
        sqlx::query("DELETE FROM payments WHERE id = ?1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        Ok(())
    }

    /// A party's payments, newest first.
    pub async fn list_for_party(&self, party_id: &str) -> DbResult<Vec<Payment>> {
        let sql = format!("{PAYMENT_COLUMNS} WHERE party_id = ?1 ORDER BY created_at DESC, rowid DESC");
        let payments = sqlx::query_as::<_, Payment>(&sql)
            .bind(party_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(payments)
    }

    /// Payments recorded against one sale after it was created, oldest first.
    pub async fn list_for_sale(&self, sale_id: &str) -> DbResult<Vec<Payment>> {
        let sql = format!("{PAYMENT_COLUMNS} WHERE sale_id = ?1 ORDER BY created_at, rowid");
        let payments = sqlx::query_as::<_, Payment>(&sql)
            .bind(sale_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(payments)
    }

    pub(crate) async fn first_for_purchase_in(
        &self,
        conn: &mut SqliteConnection,
        purchase_id: &str,
    ) -> DbResult<Option<Payment>> {
        let sql = format!("{PAYMENT_COLUMNS} WHERE purchase_id = ?1 ORDER BY created_at, rowid LIMIT 1");
        let payment = sqlx::query_as::<_, Payment>(&sql)
            .bind(purchase_id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(payment)
    }

    pub(crate) async fn for_sales_return_in(
        &self,
        conn: &mut SqliteConnection,
        return_id: &str,
    ) -> DbResult<Option<Payment>> {
        let sql = format!("{PAYMENT_COLUMNS} WHERE sales_return_id = ?1 LIMIT 1");
        let payment = sqlx::query_as::<_, Payment>(&sql)
            .bind(return_id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(payment)
    }
}
