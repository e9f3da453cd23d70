//! Debt lookup endpoint
//!
//! Shows what ingestion produced for one feed entry: the stored debt and
//! any invoice / email log generated for it.

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use debtfeed_common::db::{Debt, EmailLog, Invoice};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct DebtStatusResponse {
    pub debt: Debt,
    pub invoices: Vec<Invoice>,
    pub email_logs: Vec<EmailLog>,
}

/// GET /debts/:external_id
pub async fn get_debt(
    State(state): State<AppState>,
    Path(external_id): Path<Uuid>,
) -> ApiResult<Json<DebtStatusResponse>> {
    let debt = state
        .store
        .find_debt_by_external_id(external_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Debt with debtId {}", external_id)))?;

    let invoices = state.store.invoices_for_debt(debt.id).await?;
    let email_logs = state.store.email_logs_for_debt(debt.id).await?;

    Ok(Json(DebtStatusResponse {
        debt,
        invoices,
        email_logs,
    }))
}

pub fn debt_routes() -> Router<AppState> {
    Router::new().route("/debts/:external_id", get(get_debt))
}
