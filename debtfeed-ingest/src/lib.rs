//! debtfeed-ingest library interface
//!
//! Exposes the pipeline, task system and HTTP router for the binary and for
//! integration tests.

pub mod api;
pub mod error;
pub mod pipeline;
pub mod services;
pub mod store;
pub mod tasks;

pub use crate::error::{ApiError, ApiResult};

use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use debtfeed_common::config::IngestSettings;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::store::RecordStore;
use crate::tasks::TaskDispatcher;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    /// Where uploads are handed off for background processing
    pub dispatcher: Arc<dyn TaskDispatcher>,
    pub settings: IngestSettings,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn RecordStore>,
        dispatcher: Arc<dyn TaskDispatcher>,
        settings: IngestSettings,
    ) -> Self {
        Self {
            store,
            dispatcher,
            settings,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.settings.max_upload_bytes;

    Router::new()
        .merge(api::upload_routes())
        .merge(api::debt_routes())
        .merge(api::health_routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
