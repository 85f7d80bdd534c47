//! # Account Repository
//!
//! Cash drawers and bank accounts.
//!
//! An account balance is a plain mutable number. Workflows move it with
//! [`AccountRepository::adjust_balance_in`] only in the same transaction
//! that records the matching payment or at-sale cash flow.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use tradebook_core::validation::validate_name;
use tradebook_core::{Account, AccountKind, CoreError, Money};

#[derive(Debug, Clone)]
pub struct AccountRepository {
    pool: SqlitePool,
}

impl AccountRepository {
    pub fn new(pool: SqlitePool) -> Self {
        AccountRepository { pool }
    }

    /// Opens a new account with a starting balance.
    pub async fn create(
        &self,
        name: &str,
        kind: AccountKind,
        opening_balance_cents: i64,
    ) -> DbResult<Account> {
        validate_name("account name", name).map_err(CoreError::from)?;

        let now = Utc::now();
        let account = Account {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            kind,
            balance_cents: opening_balance_cents,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %account.id, name = %account.name, "Creating account");

        sqlx::query(
            r#"
            INSERT INTO accounts (id, name, kind, balance_cents, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&account.id)
        .bind(&account.name)
        .bind(account.kind)
        .bind(account.balance_cents)
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(account)
    }

    pub async fn find_in(&self, conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, name, kind, balance_cents, created_at, updated_at
            FROM accounts
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(account)
    }

    pub async fn require_in(&self, conn: &mut SqliteConnection, id: &str) -> DbResult<Account> {
        self.find_in(conn, id)
            .await?
            .ok_or_else(|| CoreError::AccountNotFound(id.to_string()).into())
    }

    pub async fn find(&self, id: &str) -> DbResult<Option<Account>> {
        let mut conn = self.pool.acquire().await?;
        self.find_in(&mut conn, id).await
    }

    pub async fn list(&self) -> DbResult<Vec<Account>> {
        let accounts = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, name, kind, balance_cents, created_at, updated_at
            FROM accounts
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(accounts)
    }

    /// Moves an account balance by a signed delta.
    ///
    /// Balances may go negative (an overdrawn bank account is real data,
    /// not an invariant violation).
    pub async fn adjust_balance_in(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
        delta: Money,
    ) -> DbResult<()> {
        if delta.is_zero() {
            return Ok(());
        }

        debug!(account_id = %id, delta = delta.cents(), "Adjusting account balance");

        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET balance_cents = balance_cents + ?2, updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(delta.cents())
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::AccountNotFound(id.to_string()).into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_adjust_balance() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let accounts = db.accounts();
        let till = accounts.create("Till", AccountKind::Cash, 1000).await.unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        accounts
            .adjust_balance_in(&mut conn, &till.id, Money::from_cents(-1500))
            .await
            .unwrap();
        drop(conn);

        let till = accounts.find(&till.id).await.unwrap().unwrap();
        assert_eq!(till.balance_cents, -500);
    }

    #[tokio::test]
    async fn test_adjust_unknown_account() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();
        let err = db
            .accounts()
            .adjust_balance_in(&mut conn, "missing", Money::from_cents(10))
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_domain(),
            Some(CoreError::AccountNotFound(_))
        ));
    }
}
