//! Idempotence checks run before dispatching generation work

use debtfeed_common::db::Debt;
use debtfeed_common::Result;

use crate::store::RecordStore;

/// True when an invoice of any status exists for `debt`
pub async fn invoice_already_exists(store: &dyn RecordStore, debt: &Debt) -> Result<bool> {
    if store.invoice_exists_for_debt(debt).await? {
        tracing::info!(debt_id = debt.id, name = %debt.name, "Invoice already generated for debt");
        return Ok(true);
    }
    Ok(false)
}

/// True when an email log of any status exists for `debt`
pub async fn email_already_exists(store: &dyn RecordStore, debt: &Debt) -> Result<bool> {
    if store.email_log_exists_for_debt(debt).await? {
        tracing::info!(debt_id = debt.id, name = %debt.name, "Email already sent for debt");
        return Ok(true);
    }
    Ok(false)
}
