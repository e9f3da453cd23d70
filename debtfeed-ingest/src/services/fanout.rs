//! Fan-out: decide whether a debt needs an invoice or an email
//!
//! Debts created by the current ingest skip the guard lookup. Debts seen
//! again in a later feed are checked first so artifacts are never produced
//! twice.

use debtfeed_common::{Error, Result};

use super::guards;
use crate::store::RecordStore;
use crate::tasks::{Task, TaskDispatcher};

pub async fn request_invoice(
    store: &dyn RecordStore,
    dispatcher: &dyn TaskDispatcher,
    debt_id: i64,
    is_new: bool,
) -> Result<()> {
    if is_new {
        dispatcher.dispatch(Task::GenerateInvoice { debt_id });
        return Ok(());
    }

    let debt = store
        .find_debt_by_id(debt_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Debt {}", debt_id)))?;

    if !guards::invoice_already_exists(store, &debt).await? {
        dispatcher.dispatch(Task::GenerateInvoice { debt_id: debt.id });
    }
    Ok(())
}

pub async fn request_email(
    store: &dyn RecordStore,
    dispatcher: &dyn TaskDispatcher,
    debt_id: i64,
    is_new: bool,
) -> Result<()> {
    if is_new {
        dispatcher.dispatch(Task::SendEmail { debt_id });
        return Ok(());
    }

    let debt = store
        .find_debt_by_id(debt_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Debt {}", debt_id)))?;

    if !guards::email_already_exists(store, &debt).await? {
        dispatcher.dispatch(Task::SendEmail { debt_id: debt.id });
    }
    Ok(())
}
