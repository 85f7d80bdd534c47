//! # Party Repository
//!
//! Customers and suppliers.
//!
//! This repository never writes `current_balance_cents`; that column is
//! owned by [`PartyLedgerRepository`](super::PartyLedgerRepository), which
//! moves it together with every ledger append.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use tradebook_core::{CoreError, Party, PartyKind};

#[derive(Debug, Clone)]
pub struct PartyRepository {
    pool: SqlitePool,
}

impl PartyRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PartyRepository { pool }
    }

    /// Inserts a party with a zero cached balance.
    ///
    /// The opening balance is realized afterwards as the party's first
    /// ledger entry, in the same transaction.
    pub async fn insert_in(&self, conn: &mut SqliteConnection, party: &Party) -> DbResult<()> {
        debug!(id = %party.id, kind = party.kind.as_str(), "Inserting party");

        sqlx::query(
            r#"
            INSERT INTO parties (
                id, kind, name, phone, email,
                opening_balance_cents, balance_type, current_balance_cents,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8, ?9)
            "#,
        )
        .bind(&party.id)
        .bind(party.kind)
        .bind(&party.name)
        .bind(&party.phone)
        .bind(&party.email)
        .bind(party.opening_balance_cents)
        .bind(party.balance_type)
        .bind(party.created_at)
        .bind(party.updated_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    pub async fn find_in(&self, conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Party>> {
        let party = sqlx::query_as::<_, Party>(
            r#"
            SELECT id, kind, name, phone, email,
                   opening_balance_cents, balance_type, current_balance_cents,
                   created_at, updated_at
            FROM parties
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(party)
    }

    /// Loads a party, checking its kind when `expected` is given.
    ///
    /// ## Errors
    /// - `PartyNotFound` when the id is unknown
    /// - `PartyKindMismatch` when, e.g., a supplier is used on a sale
    pub async fn require_in(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
        expected: Option<PartyKind>,
    ) -> DbResult<Party> {
        let party = self
            .find_in(conn, id)
            .await?
            .ok_or_else(|| CoreError::PartyNotFound(id.to_string()))?;

        if let Some(expected) = expected {
            if party.kind != expected {
                return Err(CoreError::PartyKindMismatch {
                    party_id: id.to_string(),
                    expected: expected.as_str().to_string(),
                    actual: party.kind.as_str().to_string(),
                }
                .into());
            }
        }

        Ok(party)
    }

    pub async fn find(&self, id: &str) -> DbResult<Option<Party>> {
        let mut conn = self.pool.acquire().await?;
        self.find_in(&mut conn, id).await
    }

    pub async fn list(&self, kind: Option<PartyKind>) -> DbResult<Vec<Party>> {
        let parties = sqlx::query_as::<_, Party>(
            r#"
            SELECT id, kind, name, phone, email,
                   opening_balance_cents, balance_type, current_balance_cents,
                   created_at, updated_at
            FROM parties
            WHERE ?1 IS NULL OR kind = ?1
            ORDER BY name
            "#,
        )
        .bind(kind)
        .fetch_all(&self.pool)
        .await?;

        Ok(parties)
    }
}
