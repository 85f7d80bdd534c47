//! # Stock Transfer Workflows
//!
//! ```text
//! MAIN (10) ──── transfer 4 ────► BACK (0)
//!
//! stock_ledger  TRANSFER  −4  MAIN  ref=transfer
//! stock_ledger  TRANSFER  +4  BACK  ref=transfer
//!
//! MAIN = 6, BACK = 4, Σ = 10   (aggregate unchanged)
//! ```
//!
//! A PENDING transfer is only a document; its entries are appended when it
//! completes, with the same source stock check as an immediate transfer.

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::{info, warn};
use uuid::Uuid;

use super::Orchestrator;
use crate::error::DbResult;
use tradebook_core::ledger::aggregate_demand;
use tradebook_core::requests::CreateTransferRequest;
use tradebook_core::{
    Actor, CoreError, StockEntryType, StockKey, StockTransfer, StockTransferItem, TransferDetail,
    TransferStatus,
};

impl Orchestrator {
    /// Creates a transfer, moving stock immediately when it is COMPLETED.
    ///
    /// ## Errors
    /// - `SameWarehouseTransfer` when source and destination match
    /// - `WarehouseNotFound`, `ProductNotFound`, `VariantNotFound`
    /// - `InsufficientStock` at the source
    pub async fn create_stock_transfer(
        &self,
        actor: &Actor,
        request: &CreateTransferRequest,
    ) -> DbResult<TransferDetail> {
        request.validate().map_err(CoreError::from)?;
        if request.source_warehouse_id == request.destination_warehouse_id {
            return Err(
                CoreError::SameWarehouseTransfer(request.source_warehouse_id.clone()).into(),
            );
        }

        let mut tx = self.db.begin_write().await?;

        let catalog = self.db.catalog();
        catalog
            .require_warehouse_in(&mut tx, &request.source_warehouse_id)
            .await?;
        catalog
            .require_warehouse_in(&mut tx, &request.destination_warehouse_id)
            .await?;
        for line in &request.items {
            self.ensure_catalog_item(&mut tx, &line.product_id, line.variant_id.as_deref())
                .await?;
        }

        let now = Utc::now();
        let transfer_id = Uuid::new_v4().to_string();
        let completed = request.status == TransferStatus::Completed;
        let transfer = StockTransfer {
            id: transfer_id.clone(),
            source_warehouse_id: request.source_warehouse_id.clone(),
            destination_warehouse_id: request.destination_warehouse_id.clone(),
            status: request.status,
            actor_id: actor.user_id.clone(),
            notes: request.notes.clone(),
            created_at: now,
            completed_at: completed.then_some(now),
        };
        let items: Vec<StockTransferItem> = request
            .items
            .iter()
            .map(|line| StockTransferItem {
                id: Uuid::new_v4().to_string(),
                transfer_id: transfer_id.clone(),
                product_id: line.product_id.clone(),
                variant_id: line.variant_id.clone(),
                quantity: line.quantity,
            })
            .collect();

        let transfers = self.db.transfers();
        transfers.insert_in(&mut tx, &transfer).await?;
        for item in &items {
            transfers.insert_item_in(&mut tx, item).await?;
        }

        if completed {
            self.move_transfer_stock(&mut tx, &transfer, &items, actor)
                .await?;
        }

        tx.commit().await?;

        info!(
            transfer_id = %transfer.id,
            source = %transfer.source_warehouse_id,
            destination = %transfer.destination_warehouse_id,
            status = transfer.status.as_str(),
            lines = items.len(),
            "Stock transfer created"
        );

        Ok(TransferDetail { transfer, items })
    }

    /// PENDING → COMPLETED, appending the transfer's stock entries.
    ///
    /// ## Errors
    /// - `TransferNotFound`
    /// - `InvalidTransferStatus` unless the transfer is pending
    /// - `InsufficientStock` at the source
    pub async fn complete_stock_transfer(
        &self,
        actor: &Actor,
        transfer_id: &str,
    ) -> DbResult<StockTransfer> {
        let mut tx = self.db.begin_write().await?;

        let transfers = self.db.transfers();
        let transfer = transfers.require_in(&mut tx, transfer_id).await?;
        if transfer.status != TransferStatus::Pending {
            return Err(CoreError::InvalidTransferStatus {
                transfer_id: transfer_id.to_string(),
                current_status: transfer.status.as_str().to_string(),
            }
            .into());
        }

        let items = transfers.items_in(&mut tx, transfer_id).await?;
        self.move_transfer_stock(&mut tx, &transfer, &items, actor)
            .await?;
        transfers.mark_completed_in(&mut tx, transfer_id).await?;

        let completed = transfers.require_in(&mut tx, transfer_id).await?;
        tx.commit().await?;

        info!(transfer_id = %transfer_id, lines = items.len(), "Stock transfer completed");
        Ok(completed)
    }

    async fn move_transfer_stock(
        &self,
        conn: &mut SqliteConnection,
        transfer: &StockTransfer,
        items: &[StockTransferItem],
        actor: &Actor,
    ) -> DbResult<()> {
        let demand = aggregate_demand(items.iter().map(|item| {
            (
                item.product_id.as_str(),
                item.variant_id.as_deref(),
                item.quantity,
            )
        }));
        if let Err(err) = self
            .ensure_available(conn, &transfer.source_warehouse_id, &demand)
            .await
        {
            warn!(transfer_id = %transfer.id, error = %err, "Stock transfer rejected");
            return Err(err);
        }

        for item in items {
            self.record_stock(
                conn,
                StockKey::new(
                    &item.product_id,
                    item.variant_id.clone(),
                    &transfer.source_warehouse_id,
                ),
                -item.quantity,
                StockEntryType::Transfer,
                &transfer.id,
                actor,
            )
            .await?;
            self.record_stock(
                conn,
                StockKey::new(
                    &item.product_id,
                    item.variant_id.clone(),
                    &transfer.destination_warehouse_id,
                ),
                item.quantity,
                StockEntryType::Transfer,
                &transfer.id,
                actor,
            )
            .await?;
        }

        Ok(())
    }
}
