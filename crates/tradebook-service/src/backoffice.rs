//! # Backoffice Facade
//!
//! The one entry point callers use. Each operation:
//!
//! ```text
//! ┌──────────────┐    ┌──────────────────┐    ┌───────────────────┐    ┌─────────────────┐
//! │ Actor + args │───►│ authorize(perm)  │───►│ orchestrator /    │───►│ CommandResult<T>│
//! └──────────────┘    │ (before any I/O) │    │ projector         │    │ {success, data, │
//!                     └──────────────────┘    └───────────────────┘    │  error}         │
//!                              │ denied                 │ rejected     └─────────────────┘
//!                              └────────────────────────┴──────────────────────▲
//! ```
//!
//! Workflow futures are lazy, so building one before the permission check
//! does not touch the store; it only runs once authorization passed.
//!
//! ## Price Override
//! A sale line priced below the catalogue's list price, or any line or
//! document discount, needs [`Permission::OverridePrice`] on top of
//! [`Permission::CreateSale`].

use std::future::Future;

use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::error::ApiError;
use crate::response::CommandResult;
use tradebook_core::requests::{
    CreatePartyRequest, CreatePurchaseRequest, CreateSaleRequest, CreateSalesReturnRequest,
    CreateTransferRequest, ProcessPaymentRequest, StockAdjustmentRequest,
    UpdateSalePaymentRequest,
};
use tradebook_core::{
    Actor, BalanceReconciliation, CoreError, LowStockItem, Money, Party, PartyLedgerEntry,
    Payment, Permission, Purchase, PurchaseDetail, Sale, SaleDetail, SalesReturnDetail,
    StockLedgerEntry, StockTransfer, TransferDetail, WarehouseStock,
};
use tradebook_db::{BalanceProjector, Database, DbResult, Orchestrator};

#[derive(Debug, Clone)]
pub struct Backoffice {
    orchestrator: Orchestrator,
    projector: BalanceProjector,
}

impl Backoffice {
    pub fn new(db: Database, default_warehouse_id: impl Into<String>) -> Self {
        Backoffice {
            projector: db.projector(),
            orchestrator: Orchestrator::new(db, default_warehouse_id),
        }
    }

    /// Opens the store and checks that the configured default warehouse
    /// exists.
    pub async fn connect(config: &EngineConfig) -> DbResult<Self> {
        let db = Database::new(config.db_config()).await?;
        if db
            .catalog()
            .find_warehouse(&config.default_warehouse_id)
            .await?
            .is_none()
        {
            return Err(CoreError::WarehouseNotFound(config.default_warehouse_id.clone()).into());
        }

        Ok(Backoffice::new(db, config.default_warehouse_id.clone()))
    }

    pub fn database(&self) -> &Database {
        self.orchestrator.database()
    }

    async fn run<T, F>(
        &self,
        operation: &'static str,
        actor: &Actor,
        permission: Permission,
        work: F,
    ) -> CommandResult<T>
    where
        F: Future<Output = DbResult<T>>,
    {
        debug!(operation, actor_id = %actor.user_id, role = %actor.role, "Command");

        if let Err(err) = actor.authorize(permission) {
            warn!(operation, actor_id = %actor.user_id, error = %err, "Command denied");
            return CommandResult::failed(err.into());
        }

        match work.await {
            Ok(data) => CommandResult::ok(data),
            Err(err) => {
                let err = ApiError::from(err);
                warn!(operation, code = ?err.code, message = %err.message, "Command failed");
                CommandResult::failed(err)
            }
        }
    }

    /// Fails with `Unauthorized` when the sale is below list price and the
    /// actor may not override prices.
    async fn check_price_override(
        &self,
        actor: &Actor,
        request: &CreateSaleRequest,
    ) -> DbResult<()> {
        if actor.can(Permission::OverridePrice) {
            return Ok(());
        }

        let mut below_list = request.discount_cents > 0
            || request.items.iter().any(|line| line.discount_cents > 0);
        for line in &request.items {
            if below_list {
                break;
            }
            let Some(price) = line.unit_price_cents else {
                continue;
            };
            let list = self
                .database()
                .catalog()
                .list_price(&line.product_id, line.variant_id.as_deref())
                .await?;
            below_list = Money::from_cents(price) < list;
        }

        if below_list {
            actor.authorize(Permission::OverridePrice)?;
        }
        Ok(())
    }

    // =========================================================================
    // Sales
    // =========================================================================

    pub async fn create_sale(
        &self,
        actor: &Actor,
        request: &CreateSaleRequest,
    ) -> CommandResult<SaleDetail> {
        let work = async {
            self.check_price_override(actor, request).await?;
            self.orchestrator.create_sale(actor, request).await
        };
        self.run("create_sale", actor, Permission::CreateSale, work)
            .await
    }

    pub async fn cancel_sale(&self, actor: &Actor, sale_id: &str) -> CommandResult<Sale> {
        self.run(
            "cancel_sale",
            actor,
            Permission::CancelSale,
            self.orchestrator.cancel_sale(actor, sale_id),
        )
        .await
    }

    pub async fn update_sale_payment(
        &self,
        actor: &Actor,
        request: &UpdateSalePaymentRequest,
    ) -> CommandResult<Payment> {
        self.run(
            "update_sale_payment",
            actor,
            Permission::RecordPayment,
            self.orchestrator.update_sale_payment(actor, request),
        )
        .await
    }

    pub async fn create_sales_return(
        &self,
        actor: &Actor,
        request: &CreateSalesReturnRequest,
    ) -> CommandResult<SalesReturnDetail> {
        self.run(
            "create_sales_return",
            actor,
            Permission::ProcessReturns,
            self.orchestrator.create_sales_return(actor, request),
        )
        .await
    }

    // =========================================================================
    // Purchases
    // =========================================================================

    pub async fn create_purchase(
        &self,
        actor: &Actor,
        request: &CreatePurchaseRequest,
    ) -> CommandResult<PurchaseDetail> {
        self.run(
            "create_purchase",
            actor,
            Permission::ManagePurchases,
            self.orchestrator.create_purchase(actor, request),
        )
        .await
    }

    pub async fn receive_purchase(&self, actor: &Actor, purchase_id: &str) -> CommandResult<Purchase> {
        self.run(
            "receive_purchase",
            actor,
            Permission::ManagePurchases,
            self.orchestrator.receive_purchase(actor, purchase_id),
        )
        .await
    }

    // =========================================================================
    // Stock
    // =========================================================================

    pub async fn create_stock_transfer(
        &self,
        actor: &Actor,
        request: &CreateTransferRequest,
    ) -> CommandResult<TransferDetail> {
        self.run(
            "create_stock_transfer",
            actor,
            Permission::ManageStock,
            self.orchestrator.create_stock_transfer(actor, request),
        )
        .await
    }

    pub async fn complete_stock_transfer(
        &self,
        actor: &Actor,
        transfer_id: &str,
    ) -> CommandResult<StockTransfer> {
        self.run(
            "complete_stock_transfer",
            actor,
            Permission::ManageStock,
            self.orchestrator.complete_stock_transfer(actor, transfer_id),
        )
        .await
    }

    pub async fn record_stock_change(
        &self,
        actor: &Actor,
        request: &StockAdjustmentRequest,
    ) -> CommandResult<StockLedgerEntry> {
        self.run(
            "record_stock_change",
            actor,
            Permission::ManageStock,
            self.orchestrator.record_stock_change(actor, request),
        )
        .await
    }

    // =========================================================================
    // Parties & Payments
    // =========================================================================

    pub async fn create_party(
        &self,
        actor: &Actor,
        request: &CreatePartyRequest,
    ) -> CommandResult<Party> {
        self.run(
            "create_party",
            actor,
            Permission::ManageParties,
            self.orchestrator.create_party(actor, request),
        )
        .await
    }

    pub async fn process_payment(
        &self,
        actor: &Actor,
        request: &ProcessPaymentRequest,
    ) -> CommandResult<Payment> {
        self.run(
            "process_payment",
            actor,
            Permission::RecordPayment,
            self.orchestrator.process_payment(actor, request),
        )
        .await
    }

    pub async fn delete_payment(&self, actor: &Actor, payment_id: &str) -> CommandResult<Payment> {
        self.run(
            "delete_payment",
            actor,
            Permission::DeletePayment,
            self.orchestrator.delete_payment(actor, payment_id),
        )
        .await
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn current_quantity(
        &self,
        actor: &Actor,
        product_id: &str,
        variant_id: Option<&str>,
        warehouse_id: Option<&str>,
    ) -> CommandResult<i64> {
        self.run(
            "current_quantity",
            actor,
            Permission::ReadReports,
            self.projector
                .current_quantity(product_id, variant_id, warehouse_id),
        )
        .await
    }

    pub async fn stock_by_warehouse(
        &self,
        actor: &Actor,
        product_id: &str,
    ) -> CommandResult<Vec<WarehouseStock>> {
        self.run(
            "stock_by_warehouse",
            actor,
            Permission::ReadReports,
            self.projector.stock_by_warehouse(product_id),
        )
        .await
    }

    /// Signed balance in cents; positive means the party owes the business.
    pub async fn party_balance(&self, actor: &Actor, party_id: &str) -> CommandResult<i64> {
        let work = async {
            self.projector
                .party_balance(party_id)
                .await
                .map(|balance| balance.cents())
        };
        self.run("party_balance", actor, Permission::ReadReports, work)
            .await
    }

    pub async fn party_ledger(
        &self,
        actor: &Actor,
        party_id: &str,
    ) -> CommandResult<Vec<PartyLedgerEntry>> {
        self.run(
            "party_ledger",
            actor,
            Permission::ReadReports,
            self.projector.party_ledger(party_id),
        )
        .await
    }

    pub async fn low_stock(
        &self,
        actor: &Actor,
        warehouse_id: Option<&str>,
    ) -> CommandResult<Vec<LowStockItem>> {
        self.run(
            "low_stock",
            actor,
            Permission::ReadReports,
            self.projector.low_stock(warehouse_id),
        )
        .await
    }

    pub async fn reconcile_party(
        &self,
        actor: &Actor,
        party_id: &str,
    ) -> CommandResult<BalanceReconciliation> {
        self.run(
            "reconcile_party",
            actor,
            Permission::ReadReports,
            self.projector.reconcile_party(party_id),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use tradebook_core::requests::SaleLineRequest;
    use tradebook_core::{BalanceType, PartyKind, PaymentDirection, PaymentMethod, Role};
    use tradebook_db::{DbConfig, NewProduct};

    struct Shop {
        office: Backoffice,
        product_id: String,
        customer_id: String,
        admin: Actor,
        manager: Actor,
        cashier: Actor,
    }

    async fn shop() -> Shop {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let main = db
            .catalog()
            .create_warehouse("MAIN", "Main store")
            .await
            .unwrap();
        let product = db
            .catalog()
            .create_product(NewProduct {
                sku: "TEA-100".to_string(),
                name: "Green tea".to_string(),
                price_cents: 1000,
                cost_cents: Some(600),
                reorder_level: 2,
            })
            .await
            .unwrap();

        let office = Backoffice::new(db, main.id);
        let admin = Actor::new("admin-1", Role::Admin);
        let manager = Actor::new("manager-1", Role::Manager);
        let cashier = Actor::new("cashier-1", Role::Cashier);

        let customer = office
            .create_party(
                &manager,
                &CreatePartyRequest {
                    kind: PartyKind::Customer,
                    name: "Acme".to_string(),
                    phone: None,
                    email: None,
                    opening_balance_cents: 0,
                    balance_type: BalanceType::Receivable,
                },
            )
            .await
            .into_result()
            .unwrap();

        office
            .record_stock_change(
                &manager,
                &StockAdjustmentRequest {
                    product_id: product.id.clone(),
                    variant_id: None,
                    warehouse_id: None,
                    quantity_delta: 10,
                    note: None,
                },
            )
            .await
            .into_result()
            .unwrap();

        Shop {
            office,
            product_id: product.id,
            customer_id: customer.id,
            admin,
            manager,
            cashier,
        }
    }

    fn sale(shop: &Shop, quantity: i64, unit_price_cents: Option<i64>, paid_cents: i64) -> CreateSaleRequest {
        CreateSaleRequest {
            party_id: shop.customer_id.clone(),
            warehouse_id: None,
            items: vec![SaleLineRequest {
                product_id: shop.product_id.clone(),
                variant_id: None,
                quantity,
                unit_price_cents,
                discount_cents: 0,
            }],
            discount_cents: 0,
            tax_cents: 0,
            paid_cents,
            account_id: None,
            notes: None,
        }
    }

    async fn on_hand(shop: &Shop) -> i64 {
        shop.office
            .current_quantity(&shop.admin, &shop.product_id, None, None)
            .await
            .into_result()
            .unwrap()
    }

    #[tokio::test]
    async fn test_sale_and_cancel_through_facade() {
        let shop = shop().await;

        let result = shop
            .office
            .create_sale(&shop.cashier, &sale(&shop, 5, None, 2000))
            .await;
        assert!(result.success);
        let detail = result.data.unwrap();
        assert_eq!(on_hand(&shop).await, 5);

        let balance = shop
            .office
            .party_balance(&shop.cashier, &shop.customer_id)
            .await;
        assert_eq!(balance.data, Some(3000));

        let denied = shop.office.cancel_sale(&shop.cashier, &detail.sale.id).await;
        assert!(!denied.success);
        assert_eq!(denied.error.unwrap().code, ErrorCode::Unauthorized);
        assert_eq!(on_hand(&shop).await, 5);

        let cancelled = shop.office.cancel_sale(&shop.manager, &detail.sale.id).await;
        assert!(cancelled.success);
        assert_eq!(on_hand(&shop).await, 10);

        let again = shop.office.cancel_sale(&shop.manager, &detail.sale.id).await;
        assert_eq!(again.error.unwrap().code, ErrorCode::InvalidState);

        let report = shop
            .office
            .reconcile_party(&shop.cashier, &shop.customer_id)
            .await
            .into_result()
            .unwrap();
        assert!(report.is_consistent());
    }

    #[tokio::test]
    async fn test_cashier_cannot_sell_below_list() {
        let shop = shop().await;

        let result = shop
            .office
            .create_sale(&shop.cashier, &sale(&shop, 1, Some(800), 0))
            .await;
        let err = result.error.unwrap();
        assert_eq!(err.code, ErrorCode::Unauthorized);
        assert!(err.message.contains("price.override"));
        assert_eq!(on_hand(&shop).await, 10);

        let mut discounted = sale(&shop, 1, None, 0);
        discounted.discount_cents = 100;
        let result = shop.office.create_sale(&shop.cashier, &discounted).await;
        assert_eq!(result.error.unwrap().code, ErrorCode::Unauthorized);

        let result = shop
            .office
            .create_sale(&shop.cashier, &sale(&shop, 1, Some(1200), 0))
            .await;
        assert!(result.success);

        let result = shop
            .office
            .create_sale(&shop.manager, &sale(&shop, 1, Some(800), 0))
            .await;
        assert!(result.success);
        assert_eq!(on_hand(&shop).await, 8);
    }

    #[tokio::test]
    async fn test_rejections_become_error_codes() {
        let shop = shop().await;

        let result = shop
            .office
            .create_sale(&shop.cashier, &sale(&shop, 11, None, 0))
            .await;
        assert!(!result.success);
        assert!(result.data.is_none());
        let err = result.error.unwrap();
        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert_eq!(
            err.message,
            "Insufficient stock for TEA-100: available 10, requested 11"
        );

        let mut malformed = sale(&shop, 1, None, 0);
        malformed.items.clear();
        let result = shop.office.create_sale(&shop.cashier, &malformed).await;
        assert_eq!(result.error.unwrap().code, ErrorCode::ValidationError);

        let result = shop.office.cancel_sale(&shop.manager, "missing").await;
        assert_eq!(result.error.unwrap().code, ErrorCode::NotFound);

        let oversized = sale(&shop, 3, Some(i64::MAX / 2), 0);
        let result = shop.office.create_sale(&shop.cashier, &oversized).await;
        assert_eq!(result.error.unwrap().code, ErrorCode::ValidationError);
        assert_eq!(on_hand(&shop).await, 10);
    }

    #[tokio::test]
    async fn test_only_admin_deletes_payments() {
        let shop = shop().await;
        let payment = shop
            .office
            .process_payment(
                &shop.cashier,
                &ProcessPaymentRequest {
                    party_id: shop.customer_id.clone(),
                    amount_cents: 500,
                    direction: PaymentDirection::Received,
                    method: PaymentMethod::Cash,
                    account_id: None,
                    reference: None,
                    notes: None,
                },
            )
            .await
            .into_result()
            .unwrap();

        let denied = shop.office.delete_payment(&shop.manager, &payment.id).await;
        assert_eq!(denied.error.unwrap().code, ErrorCode::Unauthorized);

        let deleted = shop.office.delete_payment(&shop.admin, &payment.id).await;
        assert!(deleted.success);

        let statement = shop
            .office
            .party_ledger(&shop.admin, &shop.customer_id)
            .await
            .into_result()
            .unwrap();
        assert!(statement.is_empty());
    }

    #[tokio::test]
    async fn test_low_stock_report() {
        let shop = shop().await;
        shop.office
            .create_sale(&shop.cashier, &sale(&shop, 8, None, 0))
            .await
            .into_result()
            .unwrap();

        let low = shop
            .office
            .low_stock(&shop.cashier, None)
            .await
            .into_result()
            .unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].quantity, 2);
    }
}
