//! Background tasks and their dispatch
//!
//! Every unit of background work is a [`Task`]. Callers hand tasks to a
//! [`TaskDispatcher`] and never observe the result. [`run_task`] is the single
//! place that maps a task to the operation executing it, shared by the
//! production queue and the in-process recording dispatcher.

mod queue;
mod recording;

pub use queue::{spawn_worker, TaskQueue};
pub use recording::RecordingDispatcher;

use debtfeed_common::config::IngestSettings;
use debtfeed_common::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::pipeline::IngestPipeline;
use crate::services::{fanout, generators};
use crate::store::RecordStore;

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "task", rename_all = "snake_case")]
pub enum Task {
    /// Run the ingestion pipeline over an uploaded CSV body
    ProcessCsv { content: String },
    /// Decide whether an invoice should be generated for a debt
    CheckInvoice { debt_id: i64, is_new: bool },
    /// Decide whether a notification should be sent for a debt
    CheckEmail { debt_id: i64, is_new: bool },
    GenerateInvoice { debt_id: i64 },
    SendEmail { debt_id: i64 },
}

impl Task {
    /// Stable name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Task::ProcessCsv { .. } => "process_csv_file",
            Task::CheckInvoice { .. } => "check_invoice",
            Task::CheckEmail { .. } => "check_email",
            Task::GenerateInvoice { .. } => "generate_invoice",
            Task::SendEmail { .. } => "send_email",
        }
    }
}

// Hand-written so CSV bodies never end up in log lines.
impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Task::ProcessCsv { content } => f
                .debug_struct("ProcessCsv")
                .field("bytes", &content.len())
                .finish(),
            Task::CheckInvoice { debt_id, is_new } => f
                .debug_struct("CheckInvoice")
                .field("debt_id", debt_id)
                .field("is_new", is_new)
                .finish(),
            Task::CheckEmail { debt_id, is_new } => f
                .debug_struct("CheckEmail")
                .field("debt_id", debt_id)
                .field("is_new", is_new)
                .finish(),
            Task::GenerateInvoice { debt_id } => {
                f.debug_struct("GenerateInvoice").field("debt_id", debt_id).finish()
            }
            Task::SendEmail { debt_id } => {
                f.debug_struct("SendEmail").field("debt_id", debt_id).finish()
            }
        }
    }
}

/// Fire-and-forget task submission
///
/// Implementations must not block the caller. Delivery is at-least-once and
/// two dispatched tasks have no ordering guarantee.
pub trait TaskDispatcher: Send + Sync {
    fn dispatch(&self, task: Task);
}

/// Everything a task needs to run
#[derive(Clone)]
pub struct TaskContext {
    pub store: Arc<dyn RecordStore>,
    pub dispatcher: Arc<dyn TaskDispatcher>,
    pub settings: IngestSettings,
}

/// Execute one task
///
/// `ProcessCsv` never fails: the pipeline logs and absorbs its own errors.
pub async fn run_task(ctx: &TaskContext, task: &Task) -> Result<()> {
    let store = ctx.store.as_ref();
    let dispatcher = ctx.dispatcher.as_ref();

    match task {
        Task::ProcessCsv { content } => {
            IngestPipeline::new(store, dispatcher, ctx.settings.batch_size)
                .ingest(content)
                .await;
            Ok(())
        }
        Task::CheckInvoice { debt_id, is_new } => {
            fanout::request_invoice(store, dispatcher, *debt_id, *is_new).await
        }
        Task::CheckEmail { debt_id, is_new } => {
            fanout::request_email(store, dispatcher, *debt_id, *is_new).await
        }
        Task::GenerateInvoice { debt_id } => generators::generate_invoice(store, *debt_id).await,
        Task::SendEmail { debt_id } => generators::generate_email(store, *debt_id).await,
    }
}
