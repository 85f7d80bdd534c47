//! # Stock Adjustments
//!
//! Manual corrections (counts, damage, shrinkage). A negative delta is a
//! deduction and is checked against on-hand stock exactly like a sale.

use std::collections::BTreeMap;

use tracing::{info, warn};

use super::Orchestrator;
use crate::error::DbResult;
use tradebook_core::requests::StockAdjustmentRequest;
use tradebook_core::{Actor, CoreError, StockChange, StockEntryType, StockKey, StockLedgerEntry};

impl Orchestrator {
    /// Appends one ADJUSTMENT entry.
    ///
    /// ## Errors
    /// - `WarehouseNotFound`, `ProductNotFound`, `VariantNotFound`
    /// - `InsufficientStock` when a negative delta exceeds on-hand
    pub async fn record_stock_change(
        &self,
        actor: &Actor,
        request: &StockAdjustmentRequest,
    ) -> DbResult<StockLedgerEntry> {
        request.validate().map_err(CoreError::from)?;
        let warehouse_id = self
            .resolve_warehouse(request.warehouse_id.as_deref())
            .to_string();

        let mut tx = self.db.begin_write().await?;

        self.db
            .catalog()
            .require_warehouse_in(&mut tx, &warehouse_id)
            .await?;
        self.ensure_catalog_item(&mut tx, &request.product_id, request.variant_id.as_deref())
            .await?;

        if request.quantity_delta < 0 {
            let demand = BTreeMap::from([(
                (request.product_id.clone(), request.variant_id.clone()),
                -request.quantity_delta,
            )]);
            if let Err(err) = self.ensure_available(&mut tx, &warehouse_id, &demand).await {
                warn!(product_id = %request.product_id, error = %err, "Stock adjustment rejected");
                return Err(err);
            }
        }

        let entry = self
            .db
            .stock_ledger()
            .record_in(
                &mut tx,
                &StockChange {
                    key: StockKey::new(
                        &request.product_id,
                        request.variant_id.clone(),
                        &warehouse_id,
                    ),
                    quantity_delta: request.quantity_delta,
                    entry_type: StockEntryType::Adjustment,
                    reference_id: None,
                    actor_id: actor.user_id.clone(),
                    note: request.note.clone(),
                },
            )
            .await?;

        tx.commit().await?;

        info!(
            product_id = %entry.product_id,
            warehouse_id = %entry.warehouse_id,
            delta = entry.quantity_delta,
            "Stock adjusted"
        );

        Ok(entry)
    }
}
