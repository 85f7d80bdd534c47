//! # tradebook-db: Ledgers and Workflows over SQLite
//!
//! Every write Tradebook makes goes through this crate. The stock ledger and
//! the party ledger are append-only tables; the orchestrator runs each
//! business workflow as one transaction that appends to both and updates the
//! documents and cached balances alongside.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tradebook Data Flow                              │
//! │                                                                         │
//! │  Backoffice facade (authorize, price override)                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   tradebook-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────────┐   ┌───────────────┐   ┌───────────────┐     │   │
//! │  │   │ Orchestrator │──►│ Repositories  │◄──│   Projector   │     │   │
//! │  │   │ (workflows)  │   │ stock_ledger  │   │  (read side)  │     │   │
//! │  │   │ one tx each  │   │ party_ledger  │   │ low_stock     │     │   │
//! │  │   └──────┬───────┘   │ documents     │   │ reconcile     │     │   │
//! │  │          │           └───────────────┘   └───────────────┘     │   │
//! │  │          ▼                                                      │   │
//! │  │   ┌──────────────┐   ┌───────────────┐                         │   │
//! │  │   │  Database    │   │  Migrations   │                         │   │
//! │  │   │  write gate  │   │  (embedded)   │                         │   │
//! │  │   └──────────────┘   └───────────────┘                         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool, configuration and the write gate
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Table-level access (ledgers, documents, reference data)
//! - [`orchestrator`] - Atomic business workflows
//! - [`projector`] - Read-side balances, statements and stock reports
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tradebook_db::{Database, DbConfig, Orchestrator};
//!
//! let db = Database::new(DbConfig::new("tradebook.db")).await?;
//! db.run_migrations().await?;
//!
//! let orchestrator = Orchestrator::new(db.clone(), "wh-main");
//! let detail = orchestrator.create_sale(&actor, &request).await?;
//! let balance = db.projector().party_balance(&detail.sale.party_id).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod orchestrator;
pub mod pool;
pub mod projector;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use orchestrator::Orchestrator;
pub use pool::{Database, DbConfig};
pub use projector::BalanceProjector;

// Repository re-exports for convenience
pub use repository::{
    AccountRepository, CatalogRepository, NewProduct, PartyLedgerRepository, PartyRepository,
    PaymentRepository, PurchaseRepository, SaleRepository, SalesReturnRepository,
    StockLedgerRepository, TransferRepository,
};
