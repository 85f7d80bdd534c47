//! # Error Types
//!
//! Domain-specific error types for tradebook-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tradebook-core errors (this file)                                     │
//! │  ├── CoreError        - Business rule and state violations             │
//! │  └── ValidationError  - Malformed requests                             │
//! │                                                                         │
//! │  tradebook-db errors (separate crate)                                  │
//! │  └── DbError          - Storage failures, Conflict, wraps CoreError    │
//! │                                                                         │
//! │  tradebook-service errors                                              │
//! │  └── ApiError         - What callers see ({code, message})             │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Caller       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (SKU, ID, etc.)
//! 3. Errors are enum variants, never String

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations and invalid state transitions.
///
/// Any of these aborts the running workflow; the surrounding transaction is
/// rolled back so no ledger entry of the workflow survives.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Variant {variant_id} not found for product {product_id}")]
    VariantNotFound {
        product_id: String,
        variant_id: String,
    },

    #[error("Warehouse not found: {0}")]
    WarehouseNotFound(String),

    #[error("Party not found: {0}")]
    PartyNotFound(String),

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Sale not found: {0}")]
    SaleNotFound(String),

    #[error("Sale item {item_id} does not belong to sale {sale_id}")]
    SaleItemNotFound { sale_id: String, item_id: String },

    #[error("Purchase not found: {0}")]
    PurchaseNotFound(String),

    #[error("Stock transfer not found: {0}")]
    TransferNotFound(String),

    #[error("Payment not found: {0}")]
    PaymentNotFound(String),

    /// Insufficient stock to complete a deduction.
    ///
    /// ## When This Occurs
    /// - Selling more than is on hand in the sale's warehouse
    /// - Transferring more than the source warehouse holds
    /// - A negative adjustment larger than on-hand stock
    /// - Losing a race: another sale committed the last units first
    ///
    /// ```text
    /// Sale (qty: 5) ──► lock ──► on_hand = 3 ──► InsufficientStock
    ///                                           { sku: "COKE", available: 3, requested: 5 }
    /// ```
    #[error("Insufficient stock for {sku}: available {available}, requested {requested}")]
    InsufficientStock {
        sku: String,
        available: i64,
        requested: i64,
    },

    #[error("Source and destination warehouse are the same: {0}")]
    SameWarehouseTransfer(String),

    /// A ledger append was asked to record a zero or negative amount.
    ///
    /// Workflows skip zero amounts themselves, so seeing this is a bug in
    /// the caller rather than bad user input.
    #[error("Party ledger entries must have a positive amount, got {amount_cents}")]
    ZeroAmountEntry { amount_cents: i64 },

    #[error("Sale {0} is already cancelled")]
    SaleAlreadyCancelled(String),

    #[error("Sale {0} is cancelled")]
    SaleCancelled(String),

    #[error("Purchase {purchase_id} is {current_status}, expected {expected}")]
    InvalidPurchaseStatus {
        purchase_id: String,
        current_status: String,
        expected: String,
    },

    #[error("Stock transfer {transfer_id} is {current_status}, expected pending")]
    InvalidTransferStatus {
        transfer_id: String,
        current_status: String,
    },

    /// More units requested back than remain on the sale line.
    #[error("Cannot return {requested} of sale item {item_id}: only {remaining} remaining")]
    ReturnExceedsRemaining {
        item_id: String,
        remaining: i64,
        requested: i64,
    },

    #[error("Payment of {amount_cents} exceeds outstanding balance {balance_cents}")]
    Overpayment {
        amount_cents: i64,
        balance_cents: i64,
    },

    #[error("Refund of {refund_cents} exceeds returned value {return_cents}")]
    RefundExceedsReturn {
        refund_cents: i64,
        return_cents: i64,
    },

    #[error("Party {party_id} is a {actual}, expected a {expected}")]
    PartyKindMismatch {
        party_id: String,
        expected: String,
        actual: String,
    },

    #[error("Role {role} lacks permission {permission}")]
    Unauthorized { role: String, permission: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised by request `validate()` methods before any workflow starts.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Arithmetic on the value left the representable range.
    #[error("{field} is too large")]
    Overflow { field: String },

    /// The same value appears twice where it must be unique.
    #[error("{field} '{value}' is listed more than once")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
