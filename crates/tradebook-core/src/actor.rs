//! # Actors & Permissions
//!
//! The engine never authenticates anyone. Callers hand it an already
//! resolved [`Actor`]; this module decides what that actor may do.
//!
//! ```text
//! ┌──────────────────┬─────────┬─────────┬───────┐
//! │ Permission       │ Cashier │ Manager │ Admin │
//! ├──────────────────┼─────────┼─────────┼───────┤
//! │ sales.create     │    ✓    │    ✓    │   ✓   │
//! │ payments.record  │    ✓    │    ✓    │   ✓   │
//! │ reports.read     │    ✓    │    ✓    │   ✓   │
//! │ sales.cancel     │         │    ✓    │   ✓   │
//! │ price.override   │         │    ✓    │   ✓   │
//! │ purchases.manage │         │    ✓    │   ✓   │
//! │ stock.manage     │         │    ✓    │   ✓   │
//! │ returns.process  │         │    ✓    │   ✓   │
//! │ parties.manage   │         │    ✓    │   ✓   │
//! │ payments.delete  │         │         │   ✓   │
//! └──────────────────┴─────────┴─────────┴───────┘
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Manager,
    Cashier,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Cashier => "cashier",
        }
    }

    /// Whether this role holds the given permission.
    pub fn grants(&self, permission: Permission) -> bool {
        match self {
            Role::Admin => true,
            Role::Manager => permission != Permission::DeletePayment,
            Role::Cashier => matches!(
                permission,
                Permission::CreateSale | Permission::RecordPayment | Permission::ReadReports
            ),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One guarded capability of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    CreateSale,
    CancelSale,
    /// Selling below the product's list price.
    OverridePrice,
    RecordPayment,
    DeletePayment,
    ManagePurchases,
    ManageStock,
    ProcessReturns,
    ManageParties,
    ReadReports,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::CreateSale => "sales.create",
            Permission::CancelSale => "sales.cancel",
            Permission::OverridePrice => "price.override",
            Permission::RecordPayment => "payments.record",
            Permission::DeletePayment => "payments.delete",
            Permission::ManagePurchases => "purchases.manage",
            Permission::ManageStock => "stock.manage",
            Permission::ProcessReturns => "returns.process",
            Permission::ManageParties => "parties.manage",
            Permission::ReadReports => "reports.read",
        }
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The user on whose behalf a workflow runs.
///
/// `user_id` is recorded as `actor_id` on every ledger entry and document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Actor {
    pub user_id: String,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Actor {
            user_id: user_id.into(),
            role,
        }
    }

    pub fn can(&self, permission: Permission) -> bool {
        self.role.grants(permission)
    }

    /// Fails with [`CoreError::Unauthorized`] when the role lacks `permission`.
    pub fn authorize(&self, permission: Permission) -> CoreResult<()> {
        if self.can(permission) {
            Ok(())
        } else {
            Err(CoreError::Unauthorized {
                role: self.role.as_str().to_string(),
                permission: permission.as_str().to_string(),
            })
        }
    }
}
