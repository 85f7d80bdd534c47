//! # Repository Module
//!
//! Row-level access for every table. Repositories know SQL, not workflows.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Two Ways Into a Repository                           │
//! │                                                                         │
//! │  Read path (projections, detail views)                                  │
//! │       │  db.sales().get_detail(id)                                      │
//! │       ▼                                                                 │
//! │  pool.acquire() → one pooled connection                                 │
//! │                                                                         │
//! │  Write path (orchestrator workflows)                                    │
//! │       │  let mut tx = db.begin_write().await?;                          │
//! │       │  db.sales().insert_in(&mut tx, &sale)                           │
//! │       │  db.stock_ledger().record_in(&mut tx, &change)                  │
//! │       │  db.party_ledger().append_in(&mut tx, &draft)                   │
//! │       │  tx.commit()                                                    │
//! │       ▼                                                                 │
//! │  every `*_in` method runs on the caller's connection, so one            │
//! │  workflow is one SQLite transaction                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`CatalogRepository`] - Warehouses, products, variants
//! - [`PartyRepository`] - Customers and suppliers
//! - [`AccountRepository`] - Cash and bank accounts
//! - [`StockLedgerRepository`] - Append-only quantity journal
//! - [`PartyLedgerRepository`] - Append-only money journal per party
//! - [`SaleRepository`], [`PurchaseRepository`], [`TransferRepository`],
//!   [`SalesReturnRepository`], [`PaymentRepository`] - Business documents

pub mod account;
pub mod catalog;
pub mod party;
pub mod party_ledger;
pub mod payment;
pub mod purchase;
pub mod sale;
pub mod sales_return;
pub mod stock_ledger;
pub mod transfer;

pub use account::AccountRepository;
pub use catalog::{CatalogRepository, NewProduct};
pub use party::PartyRepository;
pub use party_ledger::PartyLedgerRepository;
pub use payment::PaymentRepository;
pub use purchase::PurchaseRepository;
pub use sale::{generate_invoice_number, SaleRepository};
pub use sales_return::SalesReturnRepository;
pub use stock_ledger::StockLedgerRepository;
pub use transfer::TransferRepository;
