//! Artifact generation
//!
//! Both generators rely on the store's one-artifact-per-debt constraint, so a
//! duplicate delivery of the same task is a logged no-op.

use debtfeed_common::db::{EmailStatus, InvoiceStatus};
use debtfeed_common::{Error, Result};

use crate::store::RecordStore;

/// Create the invoice for a debt, marked `processed`
///
/// A missing debt is an error so the queue can retry it.
pub async fn generate_invoice(store: &dyn RecordStore, debt_id: i64) -> Result<()> {
    let debt = store
        .find_debt_by_id(debt_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Debt {}", debt_id)))?;

    match store.create_invoice(&debt, InvoiceStatus::Processed).await? {
        Some(invoice) => {
            tracing::info!(
                debt_id = debt.id,
                invoice_id = invoice.id,
                name = %debt.name,
                amount = %debt.amount,
                "Invoice generated"
            );
        }
        None => {
            tracing::info!(debt_id = debt.id, "Invoice already exists, skipping generation");
        }
    }
    Ok(())
}

/// Record the notification for a debt, marked `sent`
///
/// A missing debt is skipped without error.
pub async fn generate_email(store: &dyn RecordStore, debt_id: i64) -> Result<()> {
    let Some(debt) = store.find_debt_by_id(debt_id).await? else {
        tracing::debug!(debt_id, "Debt not found, skipping email");
        return Ok(());
    };

    match store.create_email_log(&debt, EmailStatus::Sent).await? {
        Some(log) => {
            tracing::info!(
                debt_id = debt.id,
                email_log_id = log.id,
                email = %debt.email,
                "Email sent"
            );
        }
        None => {
            tracing::info!(debt_id = debt.id, "Email already sent, skipping");
        }
    }
    Ok(())
}
