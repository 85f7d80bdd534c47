//! # Purchase Repository
//!
//! Rows for supplier purchases and their lines.
//!
//! ```text
//! PENDING ──receive──► RECEIVED
//!    │                    ▲
//!    └── created RECEIVED or COMPLETED moves stock immediately
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use super::PaymentRepository;
use crate::error::DbResult;
use tradebook_core::ledger::Settlement;
use tradebook_core::{CoreError, Purchase, PurchaseDetail, PurchaseItem, PurchaseStatus};

const PURCHASE_COLUMNS: &str = r#"
    SELECT id, party_id, warehouse_id, status, payment_status,
           total_cents, paid_cents, balance_cents, supplier_reference,
           actor_id, notes, created_at, updated_at, received_at
    FROM purchases
"#;

#[derive(Debug, Clone)]
pub struct PurchaseRepository {
    pool: SqlitePool,
}

impl PurchaseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PurchaseRepository { pool }
    }

    pub async fn insert_in(&self, conn: &mut SqliteConnection, purchase: &Purchase) -> DbResult<()> {
        debug!(id = %purchase.id, status = ?purchase.status, "Inserting purchase");

        sqlx::query(
            r#"
            INSERT INTO purchases (
                id, party_id, warehouse_id, status, payment_status,
                total_cents, paid_cents, balance_cents, supplier_reference,
                actor_id, notes, created_at, updated_at, received_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
        )
        .bind(&purchase.id)
        .bind(&purchase.party_id)
        .bind(&purchase.warehouse_id)
        .bind(purchase.status)
        .bind(purchase.payment_status)
        .bind(purchase.total_cents)
        .bind(purchase.paid_cents)
        .bind(purchase.balance_cents)
        .bind(&purchase.supplier_reference)
        .bind(&purchase.actor_id)
        .bind(&purchase.notes)
        .bind(purchase.created_at)
        .bind(purchase.updated_at)
        .bind(purchase.received_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    pub async fn insert_item_in(
        &self,
        conn: &mut SqliteConnection,
        item: &PurchaseItem,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO purchase_items (
                id, purchase_id, product_id, variant_id, quantity,
                unit_cost_cents, line_total_cents
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&item.id)
        .bind(&item.purchase_id)
        .bind(&item.product_id)
        .bind(&item.variant_id)
        .bind(item.quantity)
        .bind(item.unit_cost_cents)
        .bind(item.line_total_cents)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    pub async fn find_in(&self, conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Purchase>> {
        let sql = format!("{PURCHASE_COLUMNS} WHERE id = ?1");
        let purchase = sqlx::query_as::<_, Purchase>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(purchase)
    }

    pub async fn require_in(&self, conn: &mut SqliteConnection, id: &str) -> DbResult<Purchase> {
        self.find_in(conn, id)
            .await?
            .ok_or_else(|| CoreError::PurchaseNotFound(id.to_string()).into())
    }

    pub async fn items_in(
        &self,
        conn: &mut SqliteConnection,
        purchase_id: &str,
    ) -> DbResult<Vec<PurchaseItem>> {
        let items = sqlx::query_as::<_, PurchaseItem>(
            r#"
            SELECT id, purchase_id, product_id, variant_id, quantity,
                   unit_cost_cents, line_total_cents
            FROM purchase_items
            WHERE purchase_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(purchase_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(items)
    }

    pub async fn update_settlement_in(
        &self,
        conn: &mut SqliteConnection,
        purchase_id: &str,
        settlement: &Settlement,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE purchases
            SET paid_cents = ?2, balance_cents = ?3, payment_status = ?4, updated_at = ?5
            WHERE id = ?1
            "#,
        )
        .bind(purchase_id)
        .bind(settlement.paid.cents())
        .bind(settlement.balance.cents())
        .bind(settlement.payment_status)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// PENDING → RECEIVED. Returns false when the row was not pending.
    pub async fn mark_received_in(
        &self,
        conn: &mut SqliteConnection,
        purchase_id: &str,
    ) -> DbResult<bool> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE purchases
            SET status = ?2, received_at = ?3, updated_at = ?3
            WHERE id = ?1 AND status = ?4
            "#,
        )
        .bind(purchase_id)
        .bind(PurchaseStatus::Received)
        .bind(now)
        .bind(PurchaseStatus::Pending)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Purchase with its lines and the payment made at creation, if any.
    pub async fn get_detail(&self, id: &str) -> DbResult<Option<PurchaseDetail>> {
        let mut conn = self.pool.acquire().await?;
        let Some(purchase) = self.find_in(&mut conn, id).await? else {
            return Ok(None);
        };
        let items = self.items_in(&mut conn, id).await?;
        let payment = PaymentRepository::new(self.pool.clone())
            .first_for_purchase_in(&mut conn, id)
            .await?;

        Ok(Some(PurchaseDetail {
            purchase,
            items,
            payment,
        }))
    }
}
