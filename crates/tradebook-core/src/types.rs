//! # Domain Types
//!
//! Reference entities and ledger entry types used throughout Tradebook.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  Reference data            Ledgers                    Aggregates        │
//! │  ──────────────            ───────                    ──────────        │
//! │  Product ─┐                StockLedgerEntry           Party             │
//! │  Variant ─┼──► key ──────► (product, variant?,        .current_balance  │
//! │  Warehouse┘                 warehouse, ±qty)            (cached)        │
//! │                                                                         │
//! │  Party ──────────────────► PartyLedgerEntry ────────► running balance   │
//! │                            (DEBIT +, CREDIT −)                          │
//! │                                                                         │
//! │  Account.balance  (mutable, moved only alongside a payment)            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID: (sku, warehouse code, etc.) - human-readable

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Warehouse
// =============================================================================

/// A physical or logical stock location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Warehouse {
    pub id: String,
    /// Short business code, e.g. "MAIN".
    pub code: String,
    pub name: String,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Product & Variant
// =============================================================================

/// A product that can be stocked and sold.
///
/// Note there is no stock column: on-hand quantity is always the sum of
/// the product's stock ledger entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub id: String,

    /// Stock Keeping Unit - business identifier.
    pub sku: String,

    /// Display name.
    pub name: String,

    /// List price in cents.
    pub price_cents: i64,

    /// Cost in cents (informational).
    pub cost_cents: Option<i64>,

    /// Quantity at or below which the product is reported as low stock.
    /// Read-only signal, never enforced.
    pub reorder_level: i64,

    /// Whether product is active (soft delete).
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the list price as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

/// A variant narrowing a product (size, colour, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ProductVariant {
    pub id: String,
    pub product_id: String,
    pub sku: String,
    pub name: String,
    /// Overrides the product's list price when set.
    pub price_cents: Option<i64>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Party
// =============================================================================

/// Whether a trading partner buys from or sells to the business.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PartyKind {
    Customer,
    Supplier,
}

impl PartyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartyKind::Customer => "customer",
            PartyKind::Supplier => "supplier",
        }
    }
}

/// Direction of a party's opening balance.
///
/// Only used once, when the party is created, to pick the type of the
/// seeding ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum BalanceType {
    /// The party owes the business (seeded as a DEBIT).
    Receivable,
    /// The business owes the party (seeded as a CREDIT).
    Payable,
}

impl BalanceType {
    /// Ledger entry type used to seed an opening balance of this direction.
    pub fn opening_entry_type(&self) -> PartyEntryType {
        match self {
            BalanceType::Receivable => PartyEntryType::Debit,
            BalanceType::Payable => PartyEntryType::Credit,
        }
    }
}

/// A customer or supplier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Party {
    pub id: String,
    pub kind: PartyKind,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    /// Opening balance as entered at creation (never changes afterwards).
    pub opening_balance_cents: i64,
    pub balance_type: BalanceType,
    /// Cached projection of the party ledger. Written only by the party
    /// ledger repository in the same statement batch as an entry append.
    pub current_balance_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Party {
    /// Returns the cached current balance.
    #[inline]
    pub fn current_balance(&self) -> Money {
        Money::from_cents(self.current_balance_cents)
    }
}

// =============================================================================
// Account
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    Cash,
    Bank,
}

/// A cash drawer or bank account.
///
/// Unlike party balances this is a plain mutable number; it only moves
/// inside a workflow that also records the matching payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Account {
    pub id: String,
    pub name: String,
    pub kind: AccountKind,
    pub balance_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Stock Ledger
// =============================================================================

/// Why a stock quantity changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum StockEntryType {
    Purchase,
    Sale,
    Return,
    Adjustment,
    Transfer,
}

/// One immutable, signed change to on-hand stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockLedgerEntry {
    pub id: String,
    pub product_id: String,
    pub variant_id: Option<String>,
    pub warehouse_id: String,
    /// Positive = stock entering, negative = stock leaving.
    pub quantity_delta: i64,
    pub entry_type: StockEntryType,
    /// Originating business document (sale, purchase, transfer, ...).
    pub reference_id: Option<String>,
    pub actor_id: String,
    pub note: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Identifies one stock bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockKey {
    pub product_id: String,
    pub variant_id: Option<String>,
    pub warehouse_id: String,
}

impl StockKey {
    pub fn new(
        product_id: impl Into<String>,
        variant_id: Option<String>,
        warehouse_id: impl Into<String>,
    ) -> Self {
        StockKey {
            product_id: product_id.into(),
            variant_id,
            warehouse_id: warehouse_id.into(),
        }
    }
}

/// Input for appending one stock ledger entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockChange {
    pub key: StockKey,
    pub quantity_delta: i64,
    pub entry_type: StockEntryType,
    pub reference_id: Option<String>,
    pub actor_id: String,
    pub note: Option<String>,
}

/// On-hand quantity of a product in one warehouse (projection row).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct WarehouseStock {
    pub warehouse_id: String,
    pub warehouse_name: String,
    pub quantity: i64,
}

/// A product at or below its reorder level (projection row).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct LowStockItem {
    pub product_id: String,
    pub sku: String,
    pub name: String,
    pub quantity: i64,
    pub reorder_level: i64,
}

// =============================================================================
// Party Ledger
// =============================================================================

/// Sign convention for party ledger entries.
///
/// ```text
/// DEBIT  → balance + amount  (customer owes more / business owes supplier less)
/// CREDIT → balance − amount  (customer owes less / business owes supplier more)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PartyEntryType {
    Debit,
    Credit,
}

impl PartyEntryType {
    /// Applies the sign convention to a non-negative amount.
    #[inline]
    pub fn signed(&self, amount: Money) -> Money {
        match self {
            PartyEntryType::Debit => amount,
            PartyEntryType::Credit => -amount,
        }
    }

    /// The opposite entry type, used for compensating entries.
    #[inline]
    pub fn inverse(&self) -> Self {
        match self {
            PartyEntryType::Debit => PartyEntryType::Credit,
            PartyEntryType::Credit => PartyEntryType::Debit,
        }
    }
}

/// Which workflow appended a party ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum EntrySource {
    Opening,
    Sale,
    SalePayment,
    SaleCancellation,
    Purchase,
    PurchasePayment,
    SalesReturn,
    Refund,
    Payment,
}

/// One immutable entry in a party's running account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PartyLedgerEntry {
    /// Insertion order; defines chronological order for replays.
    pub seq: i64,
    pub id: String,
    pub party_id: String,
    pub payment_id: Option<String>,
    /// Sale, purchase or sales return this entry belongs to.
    pub transaction_id: Option<String>,
    #[ts(as = "String")]
    pub entry_date: DateTime<Utc>,
    pub description: String,
    pub entry_type: PartyEntryType,
    /// Always positive; the sign comes from `entry_type`.
    pub amount_cents: i64,
    /// Party balance immediately after this entry.
    pub running_balance_cents: i64,
    pub source: EntrySource,
    pub actor_id: String,
}

impl PartyLedgerEntry {
    /// Signed effect of this entry on the party balance.
    #[inline]
    pub fn signed_amount(&self) -> Money {
        self.entry_type.signed(Money::from_cents(self.amount_cents))
    }
}

/// Input for appending one party ledger entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartyEntryDraft {
    pub party_id: String,
    pub entry_type: PartyEntryType,
    pub amount: Money,
    pub description: String,
    pub source: EntrySource,
    pub payment_id: Option<String>,
    pub transaction_id: Option<String>,
    pub actor_id: String,
}

/// Cached versus replayed party balance, for reconciliation reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BalanceReconciliation {
    pub cached_cents: i64,
    pub replayed_cents: i64,
    /// Number of entries whose running snapshot disagrees with the replay.
    pub mismatched_snapshots: i64,
}

impl BalanceReconciliation {
    pub fn is_consistent(&self) -> bool {
        self.cached_cents == self.replayed_cents && self.mismatched_snapshots == 0
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
