//! HTTP API handlers for debtfeed-ingest

pub mod debts;
pub mod health;
pub mod upload;

pub use debts::debt_routes;
pub use health::health_routes;
pub use upload::upload_routes;
