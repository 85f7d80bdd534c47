//! # Party Ledger Repository
//!
//! Append-only monetary journal per customer/supplier, and the only writer
//! of `parties.current_balance_cents`.
//!
//! ## Append
//! ```text
//! append_in(conn, draft)
//!   │
//!   ├─ amount ≤ 0?            → ZeroAmountEntry (caller bug)
//!   ├─ SELECT current_balance → PartyNotFound if missing
//!   ├─ new = current ± amount   (DEBIT +, CREDIT −)
//!   ├─ INSERT entry (running_balance = new)
//!   └─ UPDATE parties.current_balance = new
//! ```
//! All of it runs on the caller's transaction, which already holds the
//! write gate, so no other writer can interleave between the read and the
//! update.
//!
//! ## Cached vs Derived
//! The cached balance is a projection. [`recompute_in`] replays every entry
//! in `seq` order and rewrites snapshots and cache; it is a repair path,
//! not part of normal workflows (payment deletion being the exception).
//!
//! [`recompute_in`]: PartyLedgerRepository::recompute_in

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::DbResult;
use tradebook_core::ledger::{apply_entry, ensure_entry_amount, reconcile, replay_running_balances};
use tradebook_core::{
    BalanceReconciliation, CoreError, EntrySource, Money, PartyEntryDraft, PartyLedgerEntry,
};

const ENTRY_COLUMNS_SQL: &str = r#"
    SELECT seq, id, party_id, payment_id, transaction_id, entry_date,
           description, entry_type, amount_cents, running_balance_cents,
           source, actor_id
    FROM party_ledger
    WHERE party_id = ?1
    ORDER BY seq
"#;

#[derive(Debug, Clone)]
pub struct PartyLedgerRepository {
    pool: SqlitePool,
}

impl PartyLedgerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PartyLedgerRepository { pool }
    }

    /// Appends one entry and moves the cached balance with it.
    ///
    /// `entry_date` is always the append time.
    pub async fn append_in(
        &self,
        conn: &mut SqliteConnection,
        draft: &PartyEntryDraft,
    ) -> DbResult<PartyLedgerEntry> {
        ensure_entry_amount(draft.amount)?;

        let current = self
            .cached_balance_in(conn, &draft.party_id)
            .await?
            .ok_or_else(|| CoreError::PartyNotFound(draft.party_id.clone()))?;
        let running = apply_entry(current, draft.entry_type, draft.amount)?;
        let now = Utc::now();
        let id = Uuid::new_v4().to_string();

        debug!(
            party_id = %draft.party_id,
            entry_type = ?draft.entry_type,
            amount = draft.amount.cents(),
            running_balance = running.cents(),
            source = ?draft.source,
            "Appending party ledger entry"
        );

        let result = sqlx::query(
            r#"
            INSERT INTO party_ledger (
                id, party_id, payment_id, transaction_id, entry_date,
                description, entry_type, amount_cents, running_balance_cents,
                source, actor_id
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&id)
        .bind(&draft.party_id)
        .bind(&draft.payment_id)
        .bind(&draft.transaction_id)
        .bind(now)
        .bind(&draft.description)
        .bind(draft.entry_type)
        .bind(draft.amount.cents())
        .bind(running.cents())
        .bind(draft.source)
        .bind(&draft.actor_id)
        .execute(&mut *conn)
        .await?;

        self.set_cached_balance_in(conn, &draft.party_id, running)
            .await?;

        Ok(PartyLedgerEntry {
            seq: result.last_insert_rowid(),
            id,
            party_id: draft.party_id.clone(),
            payment_id: draft.payment_id.clone(),
            transaction_id: draft.transaction_id.clone(),
            entry_date: now,
            description: draft.description.clone(),
            entry_type: draft.entry_type,
            amount_cents: draft.amount.cents(),
            running_balance_cents: running.cents(),
            source: draft.source,
            actor_id: draft.actor_id.clone(),
        })
    }

    async fn cached_balance_in(
        &self,
        conn: &mut SqliteConnection,
        party_id: &str,
    ) -> DbResult<Option<Money>> {
        let cents: Option<i64> =
            sqlx::query_scalar("SELECT current_balance_cents FROM parties WHERE id = ?1")
                .bind(party_id)
                .fetch_optional(&mut *conn)
                .await?;

        Ok(cents.map(Money::from_cents))
    }

    async fn set_cached_balance_in(
        &self,
        conn: &mut SqliteConnection,
        party_id: &str,
        balance: Money,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE parties
            SET current_balance_cents = ?2, updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(party_id)
        .bind(balance.cents())
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Cached balance, O(1).
    pub async fn balance(&self, party_id: &str) -> DbResult<Money> {
        let mut conn = self.pool.acquire().await?;
        self.cached_balance_in(&mut conn, party_id)
            .await?
            .ok_or_else(|| CoreError::PartyNotFound(party_id.to_string()).into())
    }

    pub async fn entries_in(
        &self,
        conn: &mut SqliteConnection,
        party_id: &str,
    ) -> DbResult<Vec<PartyLedgerEntry>> {
        let entries = sqlx::query_as::<_, PartyLedgerEntry>(ENTRY_COLUMNS_SQL)
            .bind(party_id)
            .fetch_all(&mut *conn)
            .await?;

        Ok(entries)
    }

    /// Chronological statement of a party.
    pub async fn entries(&self, party_id: &str) -> DbResult<Vec<PartyLedgerEntry>> {
        let mut conn = self.pool.acquire().await?;
        self.entries_in(&mut conn, party_id).await
    }

    /// Replays every entry in `seq` order, rewriting running snapshots and
    /// the cached balance. Returns the replayed balance.
    pub async fn recompute_in(&self, conn: &mut SqliteConnection, party_id: &str) -> DbResult<Money> {
        let cached = self
            .cached_balance_in(conn, party_id)
            .await?
            .ok_or_else(|| CoreError::PartyNotFound(party_id.to_string()))?;

        let entries = self.entries_in(conn, party_id).await?;
        let replayed = replay_running_balances(
            entries
                .iter()
                .map(|e| (e.entry_type, Money::from_cents(e.amount_cents))),
        )?;

        let mut rewritten = 0u32;
        for (entry, running) in entries.iter().zip(&replayed) {
            if entry.running_balance_cents != running.cents() {
                sqlx::query("UPDATE party_ledger SET running_balance_cents = ?2 WHERE seq = ?1")
                    .bind(entry.seq)
                    .bind(running.cents())
                    .execute(&mut *conn)
                    .await?;
                rewritten += 1;
            }
        }

        let balance = replayed.last().copied().unwrap_or_default();
        if balance != cached || rewritten > 0 {
            warn!(
                party_id = %party_id,
                cached = cached.cents(),
                replayed = balance.cents(),
                rewritten_snapshots = rewritten,
                "Party balance recomputed"
            );
        }
        self.set_cached_balance_in(conn, party_id, balance).await?;

        Ok(balance)
    }

    /// Read-only comparison of the cached balance against a replay.
    pub async fn reconcile(&self, party_id: &str) -> DbResult<BalanceReconciliation> {
        let mut conn = self.pool.acquire().await?;
        let cached = self
            .cached_balance_in(&mut conn, party_id)
            .await?
            .ok_or_else(|| CoreError::PartyNotFound(party_id.to_string()))?;
        let entries = self.entries_in(&mut conn, party_id).await?;

        Ok(reconcile(cached, &entries)?)
    }

    /// Sum of a document's entries from one source.
    ///
    /// With `without_payment` only entries that carry no payment reference
    /// count, i.e. those appended when the document itself was created.
    pub async fn sum_for_transaction_in(
        &self,
        conn: &mut SqliteConnection,
        transaction_id: &str,
        source: EntrySource,
        without_payment: bool,
    ) -> DbResult<Money> {
        let cents: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(amount_cents), 0)
            FROM party_ledger
            WHERE transaction_id = ?1
              AND source = ?2
              AND (?3 = 0 OR payment_id IS NULL)
            "#,
        )
        .bind(transaction_id)
        .bind(source)
        .bind(without_payment)
        .fetch_one(&mut *conn)
        .await?;

        Ok(Money::from_cents(cents))
    }

    /// Deletes every entry linked to a payment. Returns how many went.
    ///
    /// Only the administrative payment deletion does this; it must be
    /// followed by [`recompute_in`](Self::recompute_in) for the party.
    pub async fn delete_for_payment_in(
        &self,
        conn: &mut SqliteConnection,
        payment_id: &str,
    ) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM party_ledger WHERE payment_id = ?1")
            .bind(payment_id)
            .execute(&mut *conn)
            .await?;

        debug!(payment_id = %payment_id, deleted = result.rows_affected(), "Deleted payment entries");
        Ok(result.rows_affected())
    }
}
