//! # Seed Data Generator
//!
//! Populates a fresh database with a small, consistent book of business for
//! development: two warehouses, a catalogue, a customer and a supplier, and
//! a handful of workflows run through the orchestrator so both ledgers have
//! real entries.
//!
//! ## Usage
//! ```bash
//! # Default database path
//! cargo run -p tradebook-service --bin seed
//!
//! # Specify database path
//! cargo run -p tradebook-service --bin seed -- --db ./data/tradebook.db
//! ```
//!
//! Prints the main warehouse id at the end; export it as
//! `TRADEBOOK_DEFAULT_WAREHOUSE`.

use std::env;

use anyhow::{bail, Context};
use tracing::info;
use tradebook_core::requests::{
    CreatePartyRequest, CreatePurchaseRequest, CreateSaleRequest, CreateTransferRequest,
    PurchaseLineRequest, SaleLineRequest, TransferLineRequest,
};
use tradebook_core::{
    AccountKind, Actor, BalanceType, PartyKind, PaymentMethod, PurchaseStatus, Role,
    TransferStatus,
};
use tradebook_db::{Database, DbConfig, NewProduct, Orchestrator};
use tradebook_service::init_tracing;

/// (sku, name, price, cost, reorder level)
const CATALOGUE: &[(&str, &str, i64, i64, i64)] = &[
    ("BEV-COLA-330", "Cola 330ml", 150, 90, 24),
    ("BEV-WATER-500", "Still water 500ml", 100, 40, 24),
    ("SNK-CHIPS-150", "Salted chips 150g", 250, 140, 12),
    ("GRO-RICE-5KG", "Basmati rice 5kg", 1899, 1300, 4),
    ("DRY-MILK-1L", "Whole milk 1L", 129, 85, 10),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing().context("installing tracing subscriber")?;

    let args: Vec<String> = env::args().collect();
    let mut db_path = String::from("./tradebook_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                let Some(path) = args.get(i + 1) else {
                    bail!("--db needs a path");
                };
                db_path = path.clone();
                i += 1;
            }
            "--help" | "-h" => {
                println!("Tradebook Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./tradebook_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            other => bail!("unknown argument: {other}"),
        }
        i += 1;
    }

    let db = Database::new(DbConfig::new(&db_path))
        .await
        .with_context(|| format!("opening {db_path}"))?;
    info!(path = %db_path, "Connected, migrations applied");

    let catalog = db.catalog();
    if !catalog.list_warehouses().await?.is_empty() {
        println!("Database already has warehouses; skipping seed to avoid duplicates.");
        println!("Delete the database file to regenerate.");
        return Ok(());
    }

    let main = catalog.create_warehouse("MAIN", "Main store").await?;
    let back = catalog.create_warehouse("BACK", "Back room").await?;

    let mut products = Vec::with_capacity(CATALOGUE.len());
    for (sku, name, price, cost, reorder) in CATALOGUE {
        let product = catalog
            .create_product(NewProduct {
                sku: sku.to_string(),
                name: name.to_string(),
                price_cents: *price,
                cost_cents: Some(*cost),
                reorder_level: *reorder,
            })
            .await
            .with_context(|| format!("creating product {sku}"))?;
        products.push(product);
    }
    let cola = &products[0];
    let six_pack = catalog
        .create_variant(&cola.id, "BEV-COLA-330-6PK", "6-pack", Some(800))
        .await?;

    let till = db.accounts().create("Till", AccountKind::Cash, 0).await?;
    db.accounts().create("Bank", AccountKind::Bank, 500_000).await?;

    let admin = Actor::new("seed", Role::Admin);
    let orchestrator = Orchestrator::new(db.clone(), main.id.clone());

    let supplier = orchestrator
        .create_party(
            &admin,
            &CreatePartyRequest {
                kind: PartyKind::Supplier,
                name: "Wholesale Ltd".to_string(),
                phone: Some("+1 555 0100".to_string()),
                email: None,
                opening_balance_cents: 0,
                balance_type: BalanceType::Payable,
            },
        )
        .await?;
    let customer = orchestrator
        .create_party(
            &admin,
            &CreatePartyRequest {
                kind: PartyKind::Customer,
                name: "Acme Catering".to_string(),
                phone: None,
                email: Some("accounts@acme.test".to_string()),
                opening_balance_cents: 12_500,
                balance_type: BalanceType::Receivable,
            },
        )
        .await?;

    let mut lines: Vec<PurchaseLineRequest> = products
        .iter()
        .zip(CATALOGUE)
        .map(|(product, (_, _, _, cost, reorder))| PurchaseLineRequest {
            product_id: product.id.clone(),
            variant_id: None,
            quantity: reorder * 5,
            unit_cost_cents: *cost,
        })
        .collect();
    lines.push(PurchaseLineRequest {
        product_id: cola.id.clone(),
        variant_id: Some(six_pack.id.clone()),
        quantity: 20,
        unit_cost_cents: 480,
    });
    let purchase = orchestrator
        .create_purchase(
            &admin,
            &CreatePurchaseRequest {
                party_id: supplier.id.clone(),
                warehouse_id: None,
                items: lines,
                status: PurchaseStatus::Received,
                paid_cents: 10_000,
                account_id: Some(till.id.clone()),
                method: Some(PaymentMethod::Cash),
                supplier_reference: Some("WS-INV-0001".to_string()),
                notes: None,
            },
        )
        .await?;
    println!(
        "✓ Purchase {} received ({} lines, {} owed)",
        purchase.purchase.id,
        purchase.items.len(),
        purchase.purchase.balance_cents
    );

    orchestrator
        .create_stock_transfer(
            &admin,
            &CreateTransferRequest {
                source_warehouse_id: main.id.clone(),
                destination_warehouse_id: back.id.clone(),
                items: vec![TransferLineRequest {
                    product_id: cola.id.clone(),
                    variant_id: None,
                    quantity: 40,
                }],
                status: TransferStatus::Completed,
                notes: Some("Back room restock".to_string()),
            },
        )
        .await?;

    let sale = orchestrator
        .create_sale(
            &admin,
            &CreateSaleRequest {
                party_id: customer.id.clone(),
                warehouse_id: None,
                items: vec![
                    SaleLineRequest {
                        product_id: cola.id.clone(),
                        variant_id: None,
                        quantity: 24,
                        unit_price_cents: None,
                        discount_cents: 0,
                    },
                    SaleLineRequest {
                        product_id: cola.id.clone(),
                        variant_id: Some(six_pack.id.clone()),
                        quantity: 3,
                        unit_price_cents: None,
                        discount_cents: 0,
                    },
                ],
                discount_cents: 0,
                tax_cents: 0,
                paid_cents: 2_000,
                account_id: Some(till.id.clone()),
                notes: None,
            },
        )
        .await?;

    let projector = db.projector();
    let customer_balance = projector.party_balance(&customer.id).await?;
    let supplier_balance = projector.party_balance(&supplier.id).await?;

    let invoice = sale
        .invoice
        .as_ref()
        .map(|invoice| invoice.invoice_number.as_str())
        .unwrap_or("(no invoice)");
    println!("✓ Sale {invoice}");
    println!("{}", serde_json::to_string_pretty(&sale.sale)?);
    println!("  {} owes {}", customer.name, customer_balance);
    println!("  {} balance {}", supplier.name, supplier_balance);
    println!(
        "  Low stock items: {}",
        projector.low_stock(None).await?.len()
    );
    println!();
    println!("export TRADEBOOK_DB_PATH={db_path}");
    println!("export TRADEBOOK_DEFAULT_WAREHOUSE={}", main.id);

    Ok(())
}
