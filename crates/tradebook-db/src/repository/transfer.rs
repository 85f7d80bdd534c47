//! # Stock Transfer Repository
//!
//! Rows for warehouse-to-warehouse transfers.
//!
//! A completed transfer is represented in the stock ledger as one pair of
//! entries per line: `−q` at the source and `+q` at the destination, both
//! referencing the transfer id.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use tradebook_core::{CoreError, StockTransfer, StockTransferItem, TransferDetail, TransferStatus};

#[derive(Debug, Clone)]
pub struct TransferRepository {
    pool: SqlitePool,
}

impl TransferRepository {
    pub fn new(pool: SqlitePool) -> Self {
        TransferRepository { pool }
    }

    pub async fn insert_in(
        &self,
        conn: &mut SqliteConnection,
        transfer: &StockTransfer,
    ) -> DbResult<()> {
        debug!(
            id = %transfer.id,
            source = %transfer.source_warehouse_id,
            destination = %transfer.destination_warehouse_id,
            "Inserting stock transfer"
        );

        sqlx::query(
            r#"
            INSERT INTO stock_transfers (
                id, source_warehouse_id, destination_warehouse_id, status,
                actor_id, notes, created_at, completed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&transfer.id)
        .bind(&transfer.source_warehouse_id)
        .bind(&transfer.destination_warehouse_id)
        .bind(transfer.status)
        .bind(&transfer.actor_id)
        .bind(&transfer.notes)
        .bind(transfer.created_at)
        .bind(transfer.completed_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    pub async fn insert_item_in(
        &self,
        conn: &mut SqliteConnection,
        item: &StockTransferItem,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO stock_transfer_items (id, transfer_id, product_id, variant_id, quantity)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&item.id)
        .bind(&item.transfer_id)
        .bind(&item.product_id)
        .bind(&item.variant_id)
        .bind(item.quantity)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    pub async fn find_in(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
    ) -> DbResult<Option<StockTransfer>> {
        let transfer = sqlx::query_as::<_, StockTransfer>(
            r#"
            SELECT id, source_warehouse_id, destination_warehouse_id, status,
                   actor_id, notes, created_at, completed_at
            FROM stock_transfers
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(transfer)
    }

    pub async fn require_in(&self, conn: &mut SqliteConnection, id: &str) -> DbResult<StockTransfer> {
        self.find_in(conn, id)
            .await?
            .ok_or_else(|| CoreError::TransferNotFound(id.to_string()).into())
    }

    pub async fn items_in(
        &self,
        conn: &mut SqliteConnection,
        transfer_id: &str,
    ) -> DbResult<Vec<StockTransferItem>> {
        let items = sqlx::query_as::<_, StockTransferItem>(
            r#"
            SELECT id, transfer_id, product_id, variant_id, quantity
            FROM stock_transfer_items
            WHERE transfer_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(transfer_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(items)
    }

    /// PENDING → COMPLETED. Returns false when the row was not pending.
    pub async fn mark_completed_in(
        &self,
        conn: &mut SqliteConnection,
        transfer_id: &str,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE stock_transfers
            SET status = ?2, completed_at = ?3
            WHERE id = ?1 AND status = ?4
            "#,
        )
        .bind(transfer_id)
        .bind(TransferStatus::Completed)
        .bind(Utc::now())
        .bind(TransferStatus::Pending)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn get_detail(&self, id: &str) -> DbResult<Option<TransferDetail>> {
        let mut conn = self.pool.acquire().await?;
        let Some(transfer) = self.find_in(&mut conn, id).await? else {
            return Ok(None);
        };
        let items = self.items_in(&mut conn, id).await?;

        Ok(Some(TransferDetail { transfer, items }))
    }
}
