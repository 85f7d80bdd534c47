//! # Sale Repository
//!
//! Rows for sales, sale items and invoices.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Lifecycle                                    │
//! │                                                                         │
//! │  1. CREATE (one write transaction)                                      │
//! │     └── insert_in() → Sale { status: Completed }                        │
//! │     └── insert_item_in() × N                                            │
//! │     └── insert_invoice_in() → INV-20261018-3F9A0C21                     │
//! │                                                                         │
//! │  2. (OPTIONAL) PAYMENTS / RETURNS                                       │
//! │     └── update_settlement_in() → paid, balance, payment_status          │
//! │     └── add_returned_quantity_in() per returned line                    │
//! │     └── record_return_in() → returned value, settlement                 │
//! │                                                                         │
//! │  3. (OPTIONAL) CANCEL                                                   │
//! │     └── mark_cancelled_in() → Sale { status: Cancelled }                │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Ledger entries for each step are appended by the orchestrator on the
//! same connection; this repository only touches document rows.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use tradebook_core::ledger::Settlement;
use tradebook_core::{CoreError, Invoice, Money, Sale, SaleDetail, SaleItem, SaleStatus};

const SALE_COLUMNS: &str = r#"
    SELECT id, party_id, warehouse_id, status, payment_status,
           subtotal_cents, discount_cents, tax_cents, net_cents,
           returned_cents, paid_cents, balance_cents, account_id, actor_id,
           notes, created_at, updated_at, cancelled_at
    FROM sales
"#;

#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    pub async fn insert_in(&self, conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
        debug!(id = %sale.id, net = sale.net_cents, "Inserting sale");

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, party_id, warehouse_id, status, payment_status,
                subtotal_cents, discount_cents, tax_cents, net_cents,
                returned_cents, paid_cents, balance_cents, account_id, actor_id,
                notes, created_at, updated_at, cancelled_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5,
                ?6, ?7, ?8, ?9,
                ?10, ?11, ?12, ?13, ?14,
                ?15, ?16, ?17, ?18
            )
            "#,
        )
        .bind(&sale.id)
        .bind(&sale.party_id)
        .bind(&sale.warehouse_id)
        .bind(sale.status)
        .bind(sale.payment_status)
        .bind(sale.subtotal_cents)
        .bind(sale.discount_cents)
        .bind(sale.tax_cents)
        .bind(sale.net_cents)
        .bind(sale.returned_cents)
        .bind(sale.paid_cents)
        .bind(sale.balance_cents)
        .bind(&sale.account_id)
        .bind(&sale.actor_id)
        .bind(&sale.notes)
        .bind(sale.created_at)
        .bind(sale.updated_at)
        .bind(sale.cancelled_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    pub async fn insert_item_in(&self, conn: &mut SqliteConnection, item: &SaleItem) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO sale_items (
                id, sale_id, product_id, variant_id, quantity,
                returned_quantity, unit_price_cents, discount_cents, line_total_cents
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&item.id)
        .bind(&item.sale_id)
        .bind(&item.product_id)
        .bind(&item.variant_id)
        .bind(item.quantity)
        .bind(item.returned_quantity)
        .bind(item.unit_price_cents)
        .bind(item.discount_cents)
        .bind(item.line_total_cents)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    pub async fn insert_invoice_in(
        &self,
        conn: &mut SqliteConnection,
        invoice: &Invoice,
    ) -> DbResult<()> {
        debug!(sale_id = %invoice.sale_id, number = %invoice.invoice_number, "Issuing invoice");

        sqlx::query(
            r#"
            INSERT INTO invoices (id, invoice_number, sale_id, party_id, total_cents, issued_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&invoice.id)
        .bind(&invoice.invoice_number)
        .bind(&invoice.sale_id)
        .bind(&invoice.party_id)
        .bind(invoice.total_cents)
        .bind(invoice.issued_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    pub async fn find_in(&self, conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Sale>> {
        let sql = format!("{SALE_COLUMNS} WHERE id = ?1");
        let sale = sqlx::query_as::<_, Sale>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(sale)
    }

    pub async fn require_in(&self, conn: &mut SqliteConnection, id: &str) -> DbResult<Sale> {
        self.find_in(conn, id)
            .await?
            .ok_or_else(|| CoreError::SaleNotFound(id.to_string()).into())
    }

    pub async fn items_in(&self, conn: &mut SqliteConnection, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let items = sqlx::query_as::<_, SaleItem>(
            r#"
            SELECT id, sale_id, product_id, variant_id, quantity,
                   returned_quantity, unit_price_cents, discount_cents, line_total_cents
            FROM sale_items
            WHERE sale_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(sale_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(items)
    }

    pub async fn invoice_in(
        &self,
        conn: &mut SqliteConnection,
        sale_id: &str,
    ) -> DbResult<Option<Invoice>> {
        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            SELECT id, invoice_number, sale_id, party_id, total_cents, issued_at
            FROM invoices
            WHERE sale_id = ?1
            "#,
        )
        .bind(sale_id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(invoice)
    }

    /// Rewrites paid, balance and payment status together.
    pub async fn update_settlement_in(
        &self,
        conn: &mut SqliteConnection,
        sale_id: &str,
        settlement: &Settlement,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE sales
            SET paid_cents = ?2, balance_cents = ?3, payment_status = ?4, updated_at = ?5
            WHERE id = ?1
            "#,
        )
        .bind(sale_id)
        .bind(settlement.paid.cents())
        .bind(settlement.balance.cents())
        .bind(settlement.payment_status)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Adds a return's value to the sale and rewrites its settlement in the
    /// same statement.
    pub async fn record_return_in(
        &self,
        conn: &mut SqliteConnection,
        sale_id: &str,
        value: Money,
        settlement: &Settlement,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE sales
            SET returned_cents = returned_cents + ?2,
                paid_cents = ?3, balance_cents = ?4, payment_status = ?5, updated_at = ?6
            WHERE id = ?1
            "#,
        )
        .bind(sale_id)
        .bind(value.cents())
        .bind(settlement.paid.cents())
        .bind(settlement.balance.cents())
        .bind(settlement.payment_status)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Flips a completed sale to cancelled.
    ///
    /// The `status` guard makes a second cancellation a no-op at the row
    /// level; callers check `is_cancelled()` first and report the error.
    pub async fn mark_cancelled_in(&self, conn: &mut SqliteConnection, sale_id: &str) -> DbResult<()> {
        let now = Utc::now();
        sqlx::query(
            r#"
            UPDATE sales
            SET status = ?2, cancelled_at = ?3, updated_at = ?3
            WHERE id = ?1 AND status = ?4
            "#,
        )
        .bind(sale_id)
        .bind(SaleStatus::Cancelled)
        .bind(now)
        .bind(SaleStatus::Completed)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Adds to a line's returned quantity.
    ///
    /// The table CHECK rejects going past the sold quantity, but callers
    /// validate first so the error names the line.
    pub async fn add_returned_quantity_in(
        &self,
        conn: &mut SqliteConnection,
        item_id: &str,
        quantity: i64,
    ) -> DbResult<()> {
        sqlx::query(
            "UPDATE sale_items SET returned_quantity = returned_quantity + ?2 WHERE id = ?1",
        )
        .bind(item_id)
        .bind(quantity)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Sale with its lines and invoice.
    pub async fn get_detail(&self, id: &str) -> DbResult<Option<SaleDetail>> {
        let mut conn = self.pool.acquire().await?;
        let Some(sale) = self.find_in(&mut conn, id).await? else {
            return Ok(None);
        };
        let items = self.items_in(&mut conn, id).await?;
        let invoice = self.invoice_in(&mut conn, id).await?;

        Ok(Some(SaleDetail {
            sale,
            items,
            invoice,
        }))
    }

    /// A customer's sales, newest first.
    pub async fn list_for_party(&self, party_id: &str) -> DbResult<Vec<Sale>> {
        let sql = format!("{SALE_COLUMNS} WHERE party_id = ?1 ORDER BY created_at DESC, rowid DESC");
        let sales = sqlx::query_as::<_, Sale>(&sql)
            .bind(party_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(sales)
    }
}

/// Generates an invoice number in format: INV-YYYYMMDD-XXXXXXXX
///
/// ## Format
/// - YYYYMMDD: Issue date
/// - XXXXXXXX: First 8 hex digits of a fresh v4 UUID, uppercased
///
/// ## Example
/// `INV-20261018-3F9A0C21`
pub fn generate_invoice_number() -> String {
    let date_part = Utc::now().format("%Y%m%d");
    let suffix: String = Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(8)
        .collect();

    format!("INV-{}-{}", date_part, suffix.to_uppercase())
}
