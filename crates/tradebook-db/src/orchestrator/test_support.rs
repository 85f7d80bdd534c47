//! Shared fixtures for workflow tests.

use tradebook_core::requests::CreatePartyRequest;
use tradebook_core::{
    Account, AccountKind, Actor, BalanceType, Party, PartyKind, Product, Role, StockChange,
    StockEntryType, StockKey, Warehouse,
};

use super::Orchestrator;
use crate::pool::{Database, DbConfig};
use crate::repository::NewProduct;

pub(crate) struct Fixture {
    pub db: Database,
    pub orchestrator: Orchestrator,
    pub main: Warehouse,
    pub back: Warehouse,
    pub product: Product,
    pub customer: Party,
    pub supplier: Party,
    pub till: Account,
    pub manager: Actor,
}

impl Fixture {
    pub async fn new() -> Self {
        Self::with_config(DbConfig::in_memory()).await
    }

    pub async fn with_config(config: DbConfig) -> Self {
        let db = Database::new(config).await.unwrap();
        let catalog = db.catalog();

        let main = catalog.create_warehouse("MAIN", "Main store").await.unwrap();
        let back = catalog.create_warehouse("BACK", "Back room").await.unwrap();
        let product = catalog
            .create_product(NewProduct {
                sku: "COLA-330".to_string(),
                name: "Cola 330ml".to_string(),
                price_cents: 150,
                cost_cents: Some(90),
                reorder_level: 5,
            })
            .await
            .unwrap();
        let till = db
            .accounts()
            .create("Till", AccountKind::Cash, 0)
            .await
            .unwrap();

        let orchestrator = Orchestrator::new(db.clone(), main.id.clone());
        let manager = Actor::new("manager-1", Role::Manager);

        let customer = orchestrator
            .create_party(&manager, &party_request(PartyKind::Customer, "Acme"))
            .await
            .unwrap();
        let supplier = orchestrator
            .create_party(&manager, &party_request(PartyKind::Supplier, "Wholesale Ltd"))
            .await
            .unwrap();

        Fixture {
            db,
            orchestrator,
            main,
            back,
            product,
            customer,
            supplier,
            till,
            manager,
        }
    }

    /// Puts `quantity` units of the fixture product into a warehouse.
    pub async fn stock(&self, warehouse_id: &str, quantity: i64) {
        let mut conn = self.db.pool().acquire().await.unwrap();
        self.db
            .stock_ledger()
            .record_in(
                &mut conn,
                &StockChange {
                    key: StockKey::new(&self.product.id, None, warehouse_id),
                    quantity_delta: quantity,
                    entry_type: StockEntryType::Adjustment,
                    reference_id: None,
                    actor_id: "fixture".to_string(),
                    note: Some("opening stock".to_string()),
                },
            )
            .await
            .unwrap();
    }

    pub async fn on_hand(&self, warehouse_id: &str) -> i64 {
        self.db
            .stock_ledger()
            .current_quantity(&self.product.id, None, Some(warehouse_id))
            .await
            .unwrap()
    }

    pub async fn total_stock(&self) -> i64 {
        self.db
            .stock_ledger()
            .current_quantity(&self.product.id, None, None)
            .await
            .unwrap()
    }

    pub async fn balance(&self, party_id: &str) -> i64 {
        self.db.party_ledger().balance(party_id).await.unwrap().cents()
    }

    pub async fn account_balance(&self, account_id: &str) -> i64 {
        self.db
            .accounts()
            .find(account_id)
            .await
            .unwrap()
            .unwrap()
            .balance_cents
    }

    pub async fn assert_reconciled(&self, party_id: &str) {
        let report = self.db.party_ledger().reconcile(party_id).await.unwrap();
        assert!(report.is_consistent(), "ledger drifted: {report:?}");
    }
}

pub(crate) fn party_request(kind: PartyKind, name: &str) -> CreatePartyRequest {
    CreatePartyRequest {
        kind,
        name: name.to_string(),
        phone: None,
        email: None,
        opening_balance_cents: 0,
        balance_type: match kind {
            PartyKind::Customer => BalanceType::Receivable,
            PartyKind::Supplier => BalanceType::Payable,
        },
    }
}
