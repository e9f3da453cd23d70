//! Shared fixtures for debtfeed-ingest integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use debtfeed_common::config::IngestSettings;
use debtfeed_common::db::{
    init_memory_database, Debt, EmailLog, EmailStatus, Invoice, InvoiceStatus, PendingDebt,
};
use debtfeed_common::{Error, Result};
use debtfeed_ingest::store::{RecordStore, SqliteRecordStore};
use debtfeed_ingest::tasks::{RecordingDispatcher, TaskContext};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

pub const HEADER: &str = "name,governmentId,email,debtAmount,debtDueDate,debtId";

pub async fn memory_store() -> Arc<SqliteRecordStore> {
    let pool = init_memory_database()
        .await
        .expect("Failed to create in-memory database");
    Arc::new(SqliteRecordStore::new(pool, 1000))
}

/// One well-formed CSV data line
pub fn csv_row(name: &str, external_id: Uuid) -> String {
    format!(
        "{},11111111111,{}@example.com,1000.00,2023-01-01,{}",
        name,
        name.to_lowercase().replace(' ', "."),
        external_id
    )
}

/// Header plus the given data lines
pub fn csv_content(rows: &[String]) -> String {
    let mut content = String::from(HEADER);
    for row in rows {
        content.push('\n');
        content.push_str(row);
    }
    content.push('\n');
    content
}

/// `count` rows with fresh external ids
pub fn fresh_rows(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| csv_row(&format!("Debtor {}", i), Uuid::new_v4()))
        .collect()
}

pub fn settings(batch_size: usize) -> IngestSettings {
    IngestSettings {
        batch_size,
        task_max_attempts: 3,
        task_retry_backoff_ms: 10,
        ..IngestSettings::default()
    }
}

pub fn context(store: Arc<dyn RecordStore>, dispatcher: Arc<RecordingDispatcher>) -> TaskContext {
    TaskContext {
        store,
        dispatcher,
        settings: settings(2000),
    }
}

/// Store wrapper recording calls and injecting failures
pub struct CountingStore {
    inner: Arc<SqliteRecordStore>,
    bulk_sizes: Mutex<Vec<usize>>,
    fail_bulk_after: Option<usize>,
    bulk_delay: Option<Duration>,
    failed: AtomicBool,
    invoice_failures: AtomicUsize,
    invoice_attempts: AtomicUsize,
}

impl CountingStore {
    pub fn new(inner: Arc<SqliteRecordStore>) -> Self {
        Self {
            inner,
            bulk_sizes: Mutex::new(Vec::new()),
            fail_bulk_after: None,
            bulk_delay: None,
            failed: AtomicBool::new(false),
            invoice_failures: AtomicUsize::new(0),
            invoice_attempts: AtomicUsize::new(0),
        }
    }

    /// Fail the next `count` invoice creations
    pub fn with_invoice_failures(inner: Arc<SqliteRecordStore>, count: usize) -> Self {
        let store = Self::new(inner);
        store.invoice_failures.store(count, Ordering::SeqCst);
        store
    }

    pub fn invoice_attempts(&self) -> usize {
        self.invoice_attempts.load(Ordering::SeqCst)
    }

    /// Let `successes` bulk inserts through, then fail every later one
    pub fn failing_after(inner: Arc<SqliteRecordStore>, successes: usize) -> Self {
        Self {
            fail_bulk_after: Some(successes),
            ..Self::new(inner)
        }
    }

    /// Hold every bulk insert for `delay` before it reaches the database
    pub fn with_bulk_delay(inner: Arc<SqliteRecordStore>, delay: Duration) -> Self {
        Self {
            bulk_delay: Some(delay),
            ..Self::new(inner)
        }
    }

    pub fn bulk_sizes(&self) -> Vec<usize> {
        self.bulk_sizes.lock().unwrap().clone()
    }

    pub fn failed(&self) -> bool {
        self.failed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordStore for CountingStore {
    async fn find_debt_by_external_id(&self, external_id: Uuid) -> Result<Option<Debt>> {
        self.inner.find_debt_by_external_id(external_id).await
    }

    async fn bulk_insert_debts(&self, debts: &[PendingDebt]) -> Result<Vec<Debt>> {
        let attempts = {
            let mut sizes = self.bulk_sizes.lock().unwrap();
            sizes.push(debts.len());
            sizes.len()
        };
        if let Some(limit) = self.fail_bulk_after {
            if attempts > limit {
                self.failed.store(true, Ordering::SeqCst);
                return Err(Error::Internal("disk full".to_string()));
            }
        }
        if let Some(delay) = self.bulk_delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.bulk_insert_debts(debts).await
    }

    async fn find_debt_by_id(&self, id: i64) -> Result<Option<Debt>> {
        self.inner.find_debt_by_id(id).await
    }

    async fn invoice_exists_for_debt(&self, debt: &Debt) -> Result<bool> {
        self.inner.invoice_exists_for_debt(debt).await
    }

    async fn email_log_exists_for_debt(&self, debt: &Debt) -> Result<bool> {
        self.inner.email_log_exists_for_debt(debt).await
    }

    async fn create_invoice(&self, debt: &Debt, status: InvoiceStatus) -> Result<Option<Invoice>> {
        self.invoice_attempts.fetch_add(1, Ordering::SeqCst);
        let remaining = self.invoice_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.invoice_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(Error::Internal("invoice service unavailable".to_string()));
        }
        self.inner.create_invoice(debt, status).await
    }

    async fn create_email_log(&self, debt: &Debt, status: EmailStatus) -> Result<Option<EmailLog>> {
        self.inner.create_email_log(debt, status).await
    }

    async fn count_debts(&self) -> Result<i64> {
        self.inner.count_debts().await
    }

    async fn invoices_for_debt(&self, debt_id: i64) -> Result<Vec<Invoice>> {
        self.inner.invoices_for_debt(debt_id).await
    }

    async fn email_logs_for_debt(&self, debt_id: i64) -> Result<Vec<EmailLog>> {
        self.inner.email_logs_for_debt(debt_id).await
    }
}
