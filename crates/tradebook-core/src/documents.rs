//! # Business Documents
//!
//! Sales, purchases, transfers, returns, payments and invoices.
//!
//! Every ledger entry points back to one of these documents. Documents
//! carry denormalized totals (`paid_cents`, `balance_cents`,
//! `payment_status`) that are written in the same transaction as the
//! ledger entries they summarize.
//!
//! ## Lifecycle
//! ```text
//! created ──► (payments amend paid/balance) ──► cancelled
//!    │                                             │
//!    └─ ledger entries appended                    └─ compensating entries
//!       in the same unit of work                      appended, never deleted
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Payment Status
// =============================================================================

/// How much of a document's amount has been settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Unpaid,
    Partial,
    Paid,
}

impl PaymentStatus {
    /// Three-way rule shared by sales and purchases.
    ///
    /// ```text
    /// paid ≥ total      → PAID
    /// 0 < paid < total  → PARTIAL
    /// otherwise         → UNPAID
    /// ```
    pub fn derive(total: Money, paid: Money) -> Self {
        if paid >= total {
            PaymentStatus::Paid
        } else if paid.is_positive() {
            PaymentStatus::Partial
        } else {
            PaymentStatus::Unpaid
        }
    }
}

// =============================================================================
// Sale
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    Completed,
    Cancelled,
}

/// A completed (or later cancelled) sale to a customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: String,
    pub party_id: String,
    pub warehouse_id: String,
    pub status: SaleStatus,
    pub payment_status: PaymentStatus,
    /// Σ line totals.
    pub subtotal_cents: i64,
    /// Caller-supplied order discount.
    pub discount_cents: i64,
    /// Caller-supplied tax.
    pub tax_cents: i64,
    /// subtotal − discount + tax.
    pub net_cents: i64,
    /// Σ value credited back through sales returns.
    pub returned_cents: i64,
    /// Received on this sale, net of refunds.
    pub paid_cents: i64,
    /// net − returned − paid; zero-based once cancelled.
    pub balance_cents: i64,
    /// Cash/bank account that took the at-sale payment, if any.
    pub account_id: Option<String>,
    pub actor_id: String,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Sale {
    #[inline]
    pub fn net(&self) -> Money {
        Money::from_cents(self.net_cents)
    }

    #[inline]
    pub fn returned(&self) -> Money {
        Money::from_cents(self.returned_cents)
    }

    #[inline]
    pub fn paid(&self) -> Money {
        Money::from_cents(self.paid_cents)
    }

    /// What the customer still owes for this sale before payments: the net
    /// total less returned value, or nothing once the sale is cancelled.
    pub fn settlement_total(&self) -> Money {
        if self.is_cancelled() {
            Money::zero()
        } else {
            self.net() - self.returned()
        }
    }

    #[inline]
    pub fn balance(&self) -> Money {
        Money::from_cents(self.balance_cents)
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.status == SaleStatus::Cancelled
    }
}

/// A line item in a sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    pub variant_id: Option<String>,
    pub quantity: i64,
    /// Units already given back through sales returns.
    pub returned_quantity: i64,
    pub unit_price_cents: i64,
    pub discount_cents: i64,
    /// unit_price × quantity − discount.
    pub line_total_cents: i64,
}

impl SaleItem {
    /// Units that can still be returned (or restocked on cancel).
    #[inline]
    pub fn remaining_quantity(&self) -> i64 {
        self.quantity - self.returned_quantity
    }

    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }
}

/// Invoice issued for a sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Invoice {
    pub id: String,
    /// Human-readable number, e.g. `INV-20260131-4821`.
    pub invoice_number: String,
    pub sale_id: String,
    pub party_id: String,
    pub total_cents: i64,
    #[ts(as = "String")]
    pub issued_at: DateTime<Utc>,
}

/// A sale together with its items and invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleDetail {
    pub sale: Sale,
    pub items: Vec<SaleItem>,
    pub invoice: Option<Invoice>,
}

// =============================================================================
// Purchase
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseStatus {
    /// Ordered, goods not yet in the warehouse. Moves no stock.
    Pending,
    Received,
    Completed,
}

impl PurchaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseStatus::Pending => "pending",
            PurchaseStatus::Received => "received",
            PurchaseStatus::Completed => "completed",
        }
    }

    /// Whether goods of a purchase in this status are on hand.
    #[inline]
    pub fn moves_stock(&self) -> bool {
        matches!(self, PurchaseStatus::Received | PurchaseStatus::Completed)
    }
}

/// A purchase from a supplier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Purchase {
    pub id: String,
    pub party_id: String,
    pub warehouse_id: String,
    pub status: PurchaseStatus,
    pub payment_status: PaymentStatus,
    pub total_cents: i64,
    pub paid_cents: i64,
    pub balance_cents: i64,
    pub supplier_reference: Option<String>,
    pub actor_id: String,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub received_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PurchaseItem {
    pub id: String,
    pub purchase_id: String,
    pub product_id: String,
    pub variant_id: Option<String>,
    pub quantity: i64,
    pub unit_cost_cents: i64,
    pub line_total_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PurchaseDetail {
    pub purchase: Purchase,
    pub items: Vec<PurchaseItem>,
    /// Payment recorded against a named account at purchase time.
    pub payment: Option<Payment>,
}

// =============================================================================
// Stock Transfer
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    Pending,
    Completed,
}

impl TransferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Pending => "pending",
            TransferStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockTransfer {
    pub id: String,
    pub source_warehouse_id: String,
    pub destination_warehouse_id: String,
    pub status: TransferStatus,
    pub actor_id: String,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockTransferItem {
    pub id: String,
    pub transfer_id: String,
    pub product_id: String,
    pub variant_id: Option<String>,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TransferDetail {
    pub transfer: StockTransfer,
    pub items: Vec<StockTransferItem>,
}

// =============================================================================
// Sales Return
// =============================================================================

/// A partial return of goods from a completed sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SalesReturn {
    pub id: String,
    pub sale_id: String,
    pub party_id: String,
    pub warehouse_id: String,
    /// Value of returned goods, credited to the customer.
    pub total_cents: i64,
    /// Cash handed back, debited to the customer.
    pub refund_cents: i64,
    pub refund_account_id: Option<String>,
    pub reason: Option<String>,
    pub actor_id: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SalesReturnItem {
    pub id: String,
    pub return_id: String,
    pub sale_item_id: String,
    pub product_id: String,
    pub variant_id: Option<String>,
    pub quantity: i64,
    pub amount_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SalesReturnDetail {
    pub sales_return: SalesReturn,
    pub items: Vec<SalesReturnItem>,
    pub refund: Option<Payment>,
}

// =============================================================================
// Payment
// =============================================================================

/// Which way money moved between the business and the party.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentDirection {
    /// Money received from the party (party ledger CREDIT, account +).
    Received,
    /// Money paid to the party (party ledger DEBIT, account −).
    Paid,
}

impl PaymentDirection {
    /// Party ledger entry type produced by a payment in this direction.
    #[inline]
    pub fn entry_type(&self) -> crate::types::PartyEntryType {
        match self {
            PaymentDirection::Received => crate::types::PartyEntryType::Credit,
            PaymentDirection::Paid => crate::types::PartyEntryType::Debit,
        }
    }

    /// Signed effect of a payment on the linked account balance.
    #[inline]
    pub fn account_delta(&self, amount: Money) -> Money {
        match self {
            PaymentDirection::Received => amount,
            PaymentDirection::Paid => -amount,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    BankTransfer,
    Cheque,
}

/// A movement of money between the business and a party.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Payment {
    pub id: String,
    pub party_id: String,
    pub direction: PaymentDirection,
    pub method: PaymentMethod,
    pub amount_cents: i64,
    pub account_id: Option<String>,
    pub sale_id: Option<String>,
    pub purchase_id: Option<String>,
    pub sales_return_id: Option<String>,
    /// External reference (cheque number, transfer id, ...).
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub actor_id: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Payment {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
