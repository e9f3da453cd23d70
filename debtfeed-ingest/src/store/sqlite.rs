//! SQLite implementation of the record store

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use debtfeed_common::db::{Debt, EmailLog, EmailStatus, Invoice, InvoiceStatus, PendingDebt};
use debtfeed_common::{Error, Result};
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use uuid::Uuid;

use super::{retry_on_lock, RecordStore};

const DEBT_COLUMNS: &str =
    "id, name, government_id, email, debt_amount, debt_due_date, external_id";

#[derive(Clone)]
pub struct SqliteRecordStore {
    pool: SqlitePool,
    lock_wait_ms: u64,
}

impl SqliteRecordStore {
    /// `lock_wait_ms` bounds how long writes retry on `database is locked`
    pub fn new(pool: SqlitePool, lock_wait_ms: u64) -> Self {
        Self { pool, lock_wait_ms }
    }
}

fn debt_from_row(row: &SqliteRow) -> Result<Debt> {
    let amount: String = row.try_get("debt_amount")?;
    let amount = Decimal::from_str(&amount)
        .map_err(|e| Error::InvalidInput(format!("Stored debt amount '{}': {}", amount, e)))?;

    let external_id: String = row.try_get("external_id")?;
    let external_id = Uuid::parse_str(&external_id)
        .map_err(|e| Error::InvalidInput(format!("Stored external id '{}': {}", external_id, e)))?;

    let due_date: NaiveDate = row.try_get("debt_due_date")?;

    Ok(Debt {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        government_id: row.try_get("government_id")?,
        email: row.try_get("email")?,
        amount,
        due_date,
        external_id,
    })
}

fn invoice_from_row(row: &SqliteRow) -> Result<Invoice> {
    let status: String = row.try_get("invoice_status")?;
    Ok(Invoice {
        id: row.try_get("id")?,
        debt_id: row.try_get("debt_id")?,
        status: status.parse()?,
        generated_at: row.try_get("generated_at")?,
    })
}

fn email_log_from_row(row: &SqliteRow) -> Result<EmailLog> {
    let status: String = row.try_get("status")?;
    Ok(EmailLog {
        id: row.try_get("id")?,
        debt_id: row.try_get("debt_id")?,
        sent_at: row.try_get("sent_at")?,
        status: status.parse()?,
    })
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn find_debt_by_external_id(&self, external_id: Uuid) -> Result<Option<Debt>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM debts WHERE external_id = ?",
            DEBT_COLUMNS
        ))
        .bind(external_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(debt_from_row).transpose()
    }

    async fn bulk_insert_debts(&self, debts: &[PendingDebt]) -> Result<Vec<Debt>> {
        if debts.is_empty() {
            return Ok(Vec::new());
        }

        retry_on_lock("bulk_insert_debts", self.lock_wait_ms, || async move {
            let mut tx = self.pool.begin().await?;
            let mut created = Vec::with_capacity(debts.len());

            for pending in debts {
                let id: Option<i64> = sqlx::query_scalar(
                    r#"
                    INSERT INTO debts (name, government_id, email, debt_amount, debt_due_date, external_id)
                    VALUES (?, ?, ?, ?, ?, ?)
                    ON CONFLICT(external_id) DO NOTHING
                    RETURNING id
                    "#,
                )
                .bind(&pending.name)
                .bind(&pending.government_id)
                .bind(&pending.email)
                .bind(pending.amount.to_string())
                .bind(pending.due_date)
                .bind(pending.external_id.to_string())
                .fetch_optional(&mut *tx)
                .await?;

                match id {
                    Some(id) => created.push(pending.clone().into_debt(id)),
                    None => tracing::debug!(
                        external_id = %pending.external_id,
                        "Debt already stored by a concurrent ingest, skipping"
                    ),
                }
            }

            tx.commit().await?;
            Ok(created)
        })
        .await
    }

    async fn find_debt_by_id(&self, id: i64) -> Result<Option<Debt>> {
        let row = sqlx::query(&format!("SELECT {} FROM debts WHERE id = ?", DEBT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(debt_from_row).transpose()
    }

    async fn invoice_exists_for_debt(&self, debt: &Debt) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM invoices WHERE debt_id = ?)")
                .bind(debt.id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn email_log_exists_for_debt(&self, debt: &Debt) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM email_logs WHERE debt_id = ?)")
                .bind(debt.id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn create_invoice(&self, debt: &Debt, status: InvoiceStatus) -> Result<Option<Invoice>> {
        let generated_at: DateTime<Utc> = Utc::now();

        let id: Option<i64> = retry_on_lock("create_invoice", self.lock_wait_ms, || async move {
            let id: Option<i64> = sqlx::query_scalar(
                r#"
                INSERT INTO invoices (debt_id, invoice_status, generated_at)
                VALUES (?, ?, ?)
                ON CONFLICT(debt_id) DO NOTHING
                RETURNING id
                "#,
            )
            .bind(debt.id)
            .bind(status.as_str())
            .bind(generated_at)
            .fetch_optional(&self.pool)
            .await?;
            Ok(id)
        })
        .await?;

        Ok(id.map(|id| Invoice {
            id,
            debt_id: debt.id,
            status,
            generated_at,
        }))
    }

    async fn create_email_log(&self, debt: &Debt, status: EmailStatus) -> Result<Option<EmailLog>> {
        let sent_at: DateTime<Utc> = Utc::now();

        let id: Option<i64> = retry_on_lock("create_email_log", self.lock_wait_ms, || async move {
            let id: Option<i64> = sqlx::query_scalar(
                r#"
                INSERT INTO email_logs (debt_id, sent_at, status)
                VALUES (?, ?, ?)
                ON CONFLICT(debt_id) DO NOTHING
                RETURNING id
                "#,
            )
            .bind(debt.id)
            .bind(sent_at)
            .bind(status.as_str())
            .fetch_optional(&self.pool)
            .await?;
            Ok(id)
        })
        .await?;

        Ok(id.map(|id| EmailLog {
            id,
            debt_id: debt.id,
            sent_at,
            status,
        }))
    }

    async fn count_debts(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM debts")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn invoices_for_debt(&self, debt_id: i64) -> Result<Vec<Invoice>> {
        let rows = sqlx::query(
            "SELECT id, debt_id, invoice_status, generated_at FROM invoices WHERE debt_id = ? ORDER BY id",
        )
        .bind(debt_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(invoice_from_row).collect()
    }

    async fn email_logs_for_debt(&self, debt_id: i64) -> Result<Vec<EmailLog>> {
        let rows = sqlx::query(
            "SELECT id, debt_id, sent_at, status FROM email_logs WHERE debt_id = ? ORDER BY id",
        )
        .bind(debt_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(email_log_from_row).collect()
    }
}
