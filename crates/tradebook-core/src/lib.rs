//! # tradebook-core: Pure Bookkeeping Rules for Tradebook
//!
//! This crate holds the types and rules of the ledger engine as pure
//! functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tradebook Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │          Callers (back-office UI, reporting, scripts)           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ Actor + request                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    tradebook-service                            │   │
//! │  │    authorize ──► validate ──► CommandResult<T>                  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tradebook-core (THIS CRATE) ★                   │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────┐          │   │
//! │  │   │  types   │ │  ledger  │ │ requests │ │  actor   │          │   │
//! │  │   │ entries  │ │  replay  │ │ validate │ │  roles   │          │   │
//! │  │   │documents │ │  totals  │ │          │ │          │          │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘ └──────────┘          │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  tradebook-db (Database Layer)                  │   │
//! │  │        ledgers, workflows, projections over SQLite              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Reference entities and ledger entries
//! - [`documents`] - Sales, purchases, transfers, returns, payments
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`ledger`] - Running balance replay, document totals, return proration
//! - [`requests`] - Workflow inputs and their validation
//! - [`actor`] - Roles and permissions
//! - [`error`] - Domain error types
//! - [`validation`] - Field validators
//!
//! ## Example Usage
//!
//! ```rust
//! use tradebook_core::ledger::SaleTotals;
//! use tradebook_core::{Money, PaymentStatus};
//!
//! // 5 × $10.00, $20.00 paid at the counter
//! let line = Money::from_cents(1000).checked_multiply_quantity(5).unwrap();
//! let totals = SaleTotals::compute(
//!     [line],
//!     Money::zero(),
//!     Money::zero(),
//!     Money::from_cents(2000),
//! )
//! .unwrap();
//!
//! assert_eq!(totals.balance.cents(), 3000);
//! assert_eq!(totals.payment_status, PaymentStatus::Partial);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod actor;
pub mod documents;
pub mod error;
pub mod ledger;
pub mod money;
pub mod requests;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use actor::{Actor, Permission, Role};
pub use documents::*;
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines on a single document.
pub const MAX_DOCUMENT_LINES: usize = 500;

/// Maximum quantity on a single line.
///
/// Wholesale lines run large; this only catches typos (an extra zero or
/// three), not business limits.
pub const MAX_LINE_QUANTITY: i64 = 1_000_000;

/// Maximum single amount on a request or catalogue row ($100,000,000.00).
///
/// `MAX_AMOUNT_CENTS × MAX_LINE_QUANTITY × MAX_DOCUMENT_LINES` stays inside
/// `i64`, so totals of a valid document cannot overflow.
pub const MAX_AMOUNT_CENTS: i64 = 10_000_000_000;
