//! In-process task queue
//!
//! Tasks travel over an unbounded channel so `dispatch` never waits. The
//! worker spawns every received task on its own, retries failures with
//! exponential backoff, and dead-letters a task after `task_max_attempts`.

use debtfeed_common::config::IngestSettings;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

use super::{run_task, Task, TaskContext, TaskDispatcher};
use crate::store::RecordStore;

/// Sending half of the queue; cheap to clone
#[derive(Clone)]
pub struct TaskQueue {
    tx: mpsc::UnboundedSender<Task>,
}

impl TaskDispatcher for TaskQueue {
    fn dispatch(&self, task: Task) {
        let name = task.name();
        if self.tx.send(task).is_err() {
            tracing::error!(task = name, "Task queue is closed, dropping task");
        }
    }
}

/// Start the worker loop; it runs until `cancel` fires
///
/// On cancellation the worker stops waiting for new submissions but keeps
/// running whatever is already queued, including follow-up tasks dispatched
/// by running tasks. The returned handle completes once both are empty.
pub fn spawn_worker(
    store: Arc<dyn RecordStore>,
    settings: IngestSettings,
    cancel: CancellationToken,
) -> (TaskQueue, JoinHandle<()>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let queue = TaskQueue { tx };
    let ctx = TaskContext {
        store,
        dispatcher: Arc::new(queue.clone()),
        settings,
    };

    let handle = tokio::spawn(run_worker(rx, ctx, cancel));
    (queue, handle)
}

async fn run_worker(
    mut rx: mpsc::UnboundedReceiver<Task>,
    ctx: TaskContext,
    cancel: CancellationToken,
) {
    let mut in_flight = JoinSet::new();
    tracing::info!("Task worker started");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            received = rx.recv() => match received {
                Some(task) => {
                    in_flight.spawn(execute_with_retry(ctx.clone(), task));
                }
                None => break,
            },
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                if let Err(e) = joined {
                    tracing::error!(error = %e, "Task panicked");
                }
            }
        }
    }

    let pending = in_flight.len();
    if pending > 0 {
        tracing::info!(pending, "Finishing queued tasks before shutdown");
    }
    loop {
        while let Ok(task) = rx.try_recv() {
            in_flight.spawn(execute_with_retry(ctx.clone(), task));
        }
        let Some(joined) = in_flight.join_next().await else {
            break;
        };
        if let Err(e) = joined {
            tracing::error!(error = %e, "Task panicked");
        }
    }

    tracing::info!("Task worker stopped");
}

async fn execute_with_retry(ctx: TaskContext, task: Task) {
    let max_attempts = ctx.settings.task_max_attempts.max(1);
    let mut backoff_ms = ctx.settings.task_retry_backoff_ms;
    let mut attempt = 1;

    loop {
        match run_task(&ctx, &task).await {
            Ok(()) => {
                tracing::debug!(task = task.name(), attempt, "Task completed");
                return;
            }
            Err(e) if attempt < max_attempts => {
                tracing::warn!(
                    task = task.name(),
                    ?task,
                    attempt,
                    max_attempts,
                    backoff_ms,
                    error = %e,
                    "Task failed, retrying"
                );
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                backoff_ms = backoff_ms.saturating_mul(2);
                attempt += 1;
            }
            Err(e) => {
                tracing::error!(
                    task = task.name(),
                    ?task,
                    attempts = attempt,
                    error = %e,
                    "Task failed on final attempt, dead-lettering"
                );
                return;
            }
        }
    }
}
