//! # Workflow Requests
//!
//! Explicit input types for every write workflow. Each one knows how to
//! validate its own shape; nothing here touches storage.
//!
//! ```text
//! caller JSON ──serde──► CreateSaleRequest ──validate()──► orchestrator
//!                               │                              │
//!                               └── malformed? ValidationError ┘ (no writes)
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::documents::{PaymentDirection, PaymentMethod, PurchaseStatus, TransferStatus};
use crate::error::ValidationError;
use crate::types::{BalanceType, PartyKind};
use crate::validation::{
    validate_amount_cents, validate_line_count, validate_name, validate_optional_text,
    validate_optional_uuid, validate_payment_amount, validate_quantity, validate_quantity_delta,
    validate_uuid, ValidationResult,
};

const NOTES_MAX: usize = 500;
const REFERENCE_MAX: usize = 100;

// =============================================================================
// Sales
// =============================================================================

/// One line of a new sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleLineRequest {
    pub product_id: String,
    #[serde(default)]
    pub variant_id: Option<String>,
    pub quantity: i64,
    /// Overrides the list price. Selling below list needs `price.override`.
    #[serde(default)]
    pub unit_price_cents: Option<i64>,
    #[serde(default)]
    pub discount_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreateSaleRequest {
    pub party_id: String,
    /// Omitted → the configured default warehouse.
    #[serde(default)]
    pub warehouse_id: Option<String>,
    pub items: Vec<SaleLineRequest>,
    #[serde(default)]
    pub discount_cents: i64,
    #[serde(default)]
    pub tax_cents: i64,
    #[serde(default)]
    pub paid_cents: i64,
    /// Account that received the at-sale payment.
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl CreateSaleRequest {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_uuid("party_id", &self.party_id)?;
        validate_optional_uuid("warehouse_id", self.warehouse_id.as_deref())?;
        validate_optional_uuid("account_id", self.account_id.as_deref())?;
        validate_line_count("items", self.items.len())?;
        for line in &self.items {
            validate_uuid("product_id", &line.product_id)?;
            validate_optional_uuid("variant_id", line.variant_id.as_deref())?;
            validate_quantity(line.quantity)?;
            if let Some(price) = line.unit_price_cents {
                validate_amount_cents("unit_price", price)?;
            }
            validate_amount_cents("line discount", line.discount_cents)?;
        }
        validate_amount_cents("discount", self.discount_cents)?;
        validate_amount_cents("tax", self.tax_cents)?;
        validate_amount_cents("paid", self.paid_cents)?;
        validate_optional_text("notes", self.notes.as_deref(), NOTES_MAX)?;
        Ok(())
    }
}

/// A later payment against an outstanding sale balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UpdateSalePaymentRequest {
    pub sale_id: String,
    pub amount_cents: i64,
    pub method: PaymentMethod,
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
}

impl UpdateSalePaymentRequest {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_uuid("sale_id", &self.sale_id)?;
        validate_payment_amount(self.amount_cents)?;
        validate_optional_uuid("account_id", self.account_id.as_deref())?;
        validate_optional_text("reference", self.reference.as_deref(), REFERENCE_MAX)?;
        Ok(())
    }
}

// =============================================================================
// Purchases
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PurchaseLineRequest {
    pub product_id: String,
    #[serde(default)]
    pub variant_id: Option<String>,
    pub quantity: i64,
    pub unit_cost_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreatePurchaseRequest {
    pub party_id: String,
    #[serde(default)]
    pub warehouse_id: Option<String>,
    pub items: Vec<PurchaseLineRequest>,
    pub status: PurchaseStatus,
    #[serde(default)]
    pub paid_cents: i64,
    /// Account the payment left from. Required for a Payment document.
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub method: Option<PaymentMethod>,
    #[serde(default)]
    pub supplier_reference: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl CreatePurchaseRequest {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_uuid("party_id", &self.party_id)?;
        validate_optional_uuid("warehouse_id", self.warehouse_id.as_deref())?;
        validate_optional_uuid("account_id", self.account_id.as_deref())?;
        validate_line_count("items", self.items.len())?;
        for line in &self.items {
            validate_uuid("product_id", &line.product_id)?;
            validate_optional_uuid("variant_id", line.variant_id.as_deref())?;
            validate_quantity(line.quantity)?;
            validate_amount_cents("unit_cost", line.unit_cost_cents)?;
        }
        validate_amount_cents("paid", self.paid_cents)?;
        validate_optional_text(
            "supplier_reference",
            self.supplier_reference.as_deref(),
            REFERENCE_MAX,
        )?;
        validate_optional_text("notes", self.notes.as_deref(), NOTES_MAX)?;
        Ok(())
    }
}

// =============================================================================
// Stock
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TransferLineRequest {
    pub product_id: String,
    #[serde(default)]
    pub variant_id: Option<String>,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreateTransferRequest {
    pub source_warehouse_id: String,
    pub destination_warehouse_id: String,
    pub items: Vec<TransferLineRequest>,
    pub status: TransferStatus,
    #[serde(default)]
    pub notes: Option<String>,
}

impl CreateTransferRequest {
    /// Shape checks only. Equal warehouses are a workflow error
    /// (`SameWarehouseTransfer`), not a validation error.
    pub fn validate(&self) -> ValidationResult<()> {
        validate_uuid("source_warehouse_id", &self.source_warehouse_id)?;
        validate_uuid("destination_warehouse_id", &self.destination_warehouse_id)?;
        validate_line_count("items", self.items.len())?;
        for line in &self.items {
            validate_uuid("product_id", &line.product_id)?;
            validate_optional_uuid("variant_id", line.variant_id.as_deref())?;
            validate_quantity(line.quantity)?;
        }
        validate_optional_text("notes", self.notes.as_deref(), NOTES_MAX)?;
        Ok(())
    }
}

/// A manual correction of on-hand stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockAdjustmentRequest {
    pub product_id: String,
    #[serde(default)]
    pub variant_id: Option<String>,
    #[serde(default)]
    pub warehouse_id: Option<String>,
    /// Signed: positive adds stock, negative removes it.
    pub quantity_delta: i64,
    #[serde(default)]
    pub note: Option<String>,
}

impl StockAdjustmentRequest {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_uuid("product_id", &self.product_id)?;
        validate_optional_uuid("variant_id", self.variant_id.as_deref())?;
        validate_optional_uuid("warehouse_id", self.warehouse_id.as_deref())?;
        validate_quantity_delta(self.quantity_delta)?;
        validate_optional_text("note", self.note.as_deref(), NOTES_MAX)?;
        Ok(())
    }
}

// =============================================================================
// Returns
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReturnLineRequest {
    pub sale_item_id: String,
    pub quantity: i64,
}

/// Cash handed back to the customer as part of a return.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RefundRequest {
    pub amount_cents: i64,
    pub method: PaymentMethod,
    #[serde(default)]
    pub account_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreateSalesReturnRequest {
    pub sale_id: String,
    pub lines: Vec<ReturnLineRequest>,
    #[serde(default)]
    pub refund: Option<RefundRequest>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl CreateSalesReturnRequest {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_uuid("sale_id", &self.sale_id)?;
        validate_line_count("lines", self.lines.len())?;
        let mut seen = std::collections::HashSet::new();
        for line in &self.lines {
            validate_uuid("sale_item_id", &line.sale_item_id)?;
            validate_quantity(line.quantity)?;
            if !seen.insert(line.sale_item_id.as_str()) {
                return Err(ValidationError::Duplicate {
                    field: "sale_item_id".to_string(),
                    value: line.sale_item_id.clone(),
                });
            }
        }
        if let Some(refund) = &self.refund {
            validate_payment_amount(refund.amount_cents)?;
            validate_optional_uuid("refund account_id", refund.account_id.as_deref())?;
        }
        validate_optional_text("reason", self.reason.as_deref(), NOTES_MAX)?;
        Ok(())
    }
}

// =============================================================================
// Payments
// =============================================================================

/// A standalone payment received from or paid to a party.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProcessPaymentRequest {
    pub party_id: String,
    pub amount_cents: i64,
    pub direction: PaymentDirection,
    pub method: PaymentMethod,
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl ProcessPaymentRequest {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_uuid("party_id", &self.party_id)?;
        validate_payment_amount(self.amount_cents)?;
        validate_optional_uuid("account_id", self.account_id.as_deref())?;
        validate_optional_text("reference", self.reference.as_deref(), REFERENCE_MAX)?;
        validate_optional_text("notes", self.notes.as_deref(), NOTES_MAX)?;
        Ok(())
    }
}

// =============================================================================
// Parties
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreatePartyRequest {
    pub kind: PartyKind,
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub opening_balance_cents: i64,
    pub balance_type: BalanceType,
}

impl CreatePartyRequest {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_name("name", &self.name)?;
        validate_optional_text("phone", self.phone.as_deref(), 30)?;
        validate_optional_text("email", self.email.as_deref(), 200)?;
        validate_amount_cents("opening_balance", self.opening_balance_cents)?;
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
