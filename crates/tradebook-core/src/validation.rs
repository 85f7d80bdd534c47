//! # Validation Module
//!
//! Boundary validators used by the request types in [`crate::requests`].
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Request shape (serde)                                        │
//! │  └── Types and tagged enums deserialize or fail                        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: request.validate()  ← THIS MODULE                            │
//! │  ├── ids are UUIDs, quantities positive, amounts non-negative          │
//! │  └── no write has happened yet                                         │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Workflow inside the write transaction                        │
//! │  ├── party/product/warehouse existence                                 │
//! │  └── on-hand stock, remaining returnable quantity, balances            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 4: SQLite constraints (FK, CHECK, UNIQUE)                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tradebook_core::validation::{validate_quantity, validate_uuid};
//!
//! assert!(validate_quantity(5).is_ok());
//! assert!(validate_uuid("party_id", "not-a-uuid").is_err());
//! ```

use crate::error::ValidationError;
use crate::{MAX_AMOUNT_CENTS, MAX_DOCUMENT_LINES, MAX_LINE_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a SKU (Stock Keeping Unit).
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Only alphanumeric characters, hyphens, underscores
///
/// ## Example
/// ```rust
/// use tradebook_core::validation::validate_sku;
///
/// assert!(validate_sku("COKE-330").is_ok());
/// assert!(validate_sku("").is_err());
/// assert!(validate_sku("A".repeat(100).as_str()).is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.is_empty() {
        return Err(ValidationError::Required {
            field: "sku".to_string(),
        });
    }

    if sku.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: 50,
        });
    }

    if !sku
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a required display name (product, party, warehouse, account).
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most 200 characters
pub fn validate_name(field: &str, name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if name.len() > 200 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates optional free text (notes, reasons, references).
pub fn validate_optional_text(field: &str, text: Option<&str>, max: usize) -> ValidationResult<()> {
    match text {
        Some(text) if text.len() > max => Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        }),
        _ => Ok(()),
    }
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed [`MAX_LINE_QUANTITY`]
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a signed stock adjustment.
///
/// ## Rules
/// - Must not be zero
/// - |delta| must not exceed [`MAX_LINE_QUANTITY`]
pub fn validate_quantity_delta(delta: i64) -> ValidationResult<()> {
    if delta == 0 || delta.checked_abs().map_or(true, |abs| abs > MAX_LINE_QUANTITY) {
        return Err(ValidationError::OutOfRange {
            field: "quantity_delta".to_string(),
            min: -MAX_LINE_QUANTITY,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates an amount that may be zero (discount, tax, paid, price).
///
/// ## Rules
/// - Must not be negative
/// - Must not exceed [`MAX_AMOUNT_CENTS`]
///
/// ## Example
/// ```rust
/// use tradebook_core::validation::validate_amount_cents;
///
/// assert!(validate_amount_cents("tax", 0).is_ok());
/// assert!(validate_amount_cents("tax", 1099).is_ok());
/// assert!(validate_amount_cents("tax", -100).is_err());
/// assert!(validate_amount_cents("tax", i64::MAX / 2).is_err());
/// ```
pub fn validate_amount_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }

    if cents > MAX_AMOUNT_CENTS {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_AMOUNT_CENTS,
        });
    }

    Ok(())
}

/// Validates a list price in cents. Zero is allowed (free items).
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if !(0..=MAX_AMOUNT_CENTS).contains(&cents) {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: MAX_AMOUNT_CENTS,
        });
    }

    Ok(())
}

/// Validates a payment amount in cents.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed [`MAX_AMOUNT_CENTS`]
pub fn validate_payment_amount(cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "payment amount".to_string(),
        });
    }

    if cents > MAX_AMOUNT_CENTS {
        return Err(ValidationError::OutOfRange {
            field: "payment amount".to_string(),
            min: 1,
            max: MAX_AMOUNT_CENTS,
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates the number of lines on a document.
///
/// ## Rules
/// - At least one line
/// - At most [`MAX_DOCUMENT_LINES`]
pub fn validate_line_count(field: &str, lines: usize) -> ValidationResult<()> {
    if lines == 0 {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if lines > MAX_DOCUMENT_LINES {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 1,
            max: MAX_DOCUMENT_LINES as i64,
        });
    }

    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string.
///
/// ## Example
/// ```rust
/// use tradebook_core::validation::validate_uuid;
///
/// assert!(validate_uuid("sale_id", "550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("sale_id", "not-a-uuid").is_err());
/// ```
pub fn validate_uuid(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

/// Validates an optional UUID; `None` is accepted.
pub fn validate_optional_uuid(field: &str, id: Option<&str>) -> ValidationResult<()> {
    match id {
        Some(id) => validate_uuid(field, id),
        None => Ok(()),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_sku() {
        assert!(validate_sku("COKE-330").is_ok());
        assert!(validate_sku("ABC123").is_ok());
        assert!(validate_sku("product_1").is_ok());

        assert!(validate_sku("").is_err());
        assert!(validate_sku("   ").is_err());
        assert!(validate_sku("has space").is_err());
        assert!(validate_sku(&"A".repeat(100)).is_err());
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("name", "Acme Traders").is_ok());
        assert!(validate_name("name", "  ").is_err());
        assert!(validate_name("name", &"A".repeat(300)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(MAX_LINE_QUANTITY).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(MAX_LINE_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_validate_quantity_delta() {
        assert!(validate_quantity_delta(-4).is_ok());
        assert!(validate_quantity_delta(7).is_ok());
        assert!(validate_quantity_delta(0).is_err());
        assert!(validate_quantity_delta(i64::MIN).is_err());
    }

    #[test]
    fn test_validate_amounts() {
        assert!(validate_amount_cents("discount", 0).is_ok());
        assert!(validate_amount_cents("discount", -1).is_err());
        assert!(validate_payment_amount(1).is_ok());
        assert!(validate_payment_amount(0).is_err());
        assert!(validate_price_cents(0).is_ok());
        assert!(validate_price_cents(-100).is_err());
    }

    #[test]
    fn test_amounts_are_bounded() {
        assert!(validate_amount_cents("unit_price", MAX_AMOUNT_CENTS).is_ok());
        assert!(matches!(
            validate_amount_cents("unit_price", MAX_AMOUNT_CENTS + 1),
            Err(ValidationError::OutOfRange { max: MAX_AMOUNT_CENTS, .. })
        ));
        assert!(validate_amount_cents("unit_price", i64::MAX / 2).is_err());
        assert!(validate_price_cents(i64::MAX).is_err());
        assert!(validate_payment_amount(MAX_AMOUNT_CENTS + 1).is_err());
    }

    #[test]
    fn test_validate_line_count() {
        assert!(validate_line_count("items", 1).is_ok());
        assert!(validate_line_count("items", 0).is_err());
        assert!(validate_line_count("items", MAX_DOCUMENT_LINES + 1).is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("id", "550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("id", "").is_err());
        assert!(validate_uuid("id", "not-a-uuid").is_err());
        assert!(validate_optional_uuid("id", None).is_ok());
        assert!(validate_optional_uuid("id", Some("123")).is_err());
    }

    #[test]
    fn test_validate_optional_text() {
        assert!(validate_optional_text("notes", None, 10).is_ok());
        assert!(validate_optional_text("notes", Some("short"), 10).is_ok());
        assert!(validate_optional_text("notes", Some("much too long"), 10).is_err());
    }
}
