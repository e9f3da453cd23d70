//! Record store: persistence for debts and their invoices / email logs
//!
//! The pipeline, guards and generators only see the [`RecordStore`] trait.
//! [`SqliteRecordStore`] is the production implementation.

mod retry;
mod sqlite;

pub use retry::retry_on_lock;
pub use sqlite::SqliteRecordStore;

use async_trait::async_trait;
use debtfeed_common::db::{Debt, EmailLog, EmailStatus, Invoice, InvoiceStatus, PendingDebt};
use debtfeed_common::Result;
use uuid::Uuid;

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Look up a debt by the feed's external identifier
    async fn find_debt_by_external_id(&self, external_id: Uuid) -> Result<Option<Debt>>;

    /// Insert a batch in one transaction and return the debts actually created
    ///
    /// A row whose external id is already stored is skipped, not returned.
    /// Any other failure rolls back the whole batch.
    async fn bulk_insert_debts(&self, debts: &[PendingDebt]) -> Result<Vec<Debt>>;

    async fn find_debt_by_id(&self, id: i64) -> Result<Option<Debt>>;

    async fn invoice_exists_for_debt(&self, debt: &Debt) -> Result<bool>;

    async fn email_log_exists_for_debt(&self, debt: &Debt) -> Result<bool>;

    /// Create the invoice for `debt`; `None` when one already exists
    async fn create_invoice(&self, debt: &Debt, status: InvoiceStatus) -> Result<Option<Invoice>>;

    /// Create the email log for `debt`; `None` when one already exists
    async fn create_email_log(&self, debt: &Debt, status: EmailStatus) -> Result<Option<EmailLog>>;

    async fn count_debts(&self) -> Result<i64>;

    async fn invoices_for_debt(&self, debt_id: i64) -> Result<Vec<Invoice>>;

    async fn email_logs_for_debt(&self, debt_id: i64) -> Result<Vec<EmailLog>>;
}
