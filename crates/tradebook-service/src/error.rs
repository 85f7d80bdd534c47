//! # API Error Type
//!
//! What a caller sees when an operation fails.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Tradebook                              │
//! │                                                                         │
//! │  Backoffice operation                                                   │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  Actor lacks permission? ── CoreError::Unauthorized ────┐              │
//! │         │                                               │              │
//! │         ▼                                               ▼              │
//! │  Workflow rejected? ─────── DbError::Domain(..) ───── ApiError ──────► │
//! │         │                                               ▲   {code,     │
//! │         ▼                                               │    message}  │
//! │  Store busy / broken? ───── DbError::Conflict / .. ─────┘              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Storage failures are logged in full and reported with a generic message;
//! business rule failures carry their own message verbatim.

use serde::Serialize;
use tradebook_core::CoreError;
use tradebook_db::DbError;

/// ```json
/// {
///   "code": "INSUFFICIENT_STOCK",
///   "message": "Insufficient stock for COLA-330: available 3, requested 5"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Referenced entity or document does not exist
    NotFound,

    /// Malformed request or a rule on the request's values
    ValidationError,

    /// Not enough stock for a deduction
    InsufficientStock,

    /// Document is in the wrong state (cancelled, already received, ...)
    InvalidState,

    /// Actor's role lacks the permission
    Unauthorized,

    /// Store was busy; nothing was written, retry is safe
    Conflict,

    /// Storage failure
    DatabaseError,

    /// Anything else
    Internal,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Domain(core) => core.into(),
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => {
                ApiError::validation(format!("{} '{}' already exists", field, value))
            }
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                ApiError::validation("Invalid reference")
            }
            DbError::Conflict(e) => {
                tracing::warn!("Store busy: {}", e);
                ApiError::new(
                    ErrorCode::Conflict,
                    "Store is busy, nothing was written; retry the operation",
                )
            }
            DbError::ConnectionFailed(e) => {
                tracing::error!("Database connection failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(e) => {
                tracing::error!("Database migration failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                // Log the actual error but return a generic message
                tracing::error!("Database query failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::PoolExhausted => {
                ApiError::new(ErrorCode::DatabaseError, "Database pool exhausted")
            }
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let code = match &err {
            CoreError::ProductNotFound(_)
            | CoreError::VariantNotFound { .. }
            | CoreError::WarehouseNotFound(_)
            | CoreError::PartyNotFound(_)
            | CoreError::AccountNotFound(_)
            | CoreError::SaleNotFound(_)
            | CoreError::SaleItemNotFound { .. }
            | CoreError::PurchaseNotFound(_)
            | CoreError::TransferNotFound(_)
            | CoreError::PaymentNotFound(_) => ErrorCode::NotFound,

            CoreError::InsufficientStock { .. } => ErrorCode::InsufficientStock,

            CoreError::SaleAlreadyCancelled(_)
            | CoreError::SaleCancelled(_)
            | CoreError::InvalidPurchaseStatus { .. }
            | CoreError::InvalidTransferStatus { .. }
            | CoreError::ReturnExceedsRemaining { .. }
            | CoreError::Overpayment { .. } => ErrorCode::InvalidState,

            CoreError::SameWarehouseTransfer(_)
            | CoreError::ZeroAmountEntry { .. }
            | CoreError::RefundExceedsReturn { .. }
            | CoreError::PartyKindMismatch { .. }
            | CoreError::Validation(_) => ErrorCode::ValidationError,

            CoreError::Unauthorized { .. } => ErrorCode::Unauthorized,
        };

        ApiError::new(code, err.to_string())
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}
