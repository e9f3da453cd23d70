//! # debtfeed Common Library
//!
//! Shared code for the debtfeed services:
//! - Database schema initialization and models (debts, invoices, email logs)
//! - Bootstrap configuration loading
//! - Tracing subscriber setup
//! - Common error type

pub mod config;
pub mod db;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
