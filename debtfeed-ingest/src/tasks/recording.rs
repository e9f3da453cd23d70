//! Dispatcher that records tasks instead of scheduling them
//!
//! Lets tests assert exactly what was dispatched, then execute the recorded
//! work synchronously and in FIFO order with [`RecordingDispatcher::drain`].

use debtfeed_common::Result;
use std::collections::VecDeque;
use std::sync::Mutex;

use super::{run_task, Task, TaskContext, TaskDispatcher};

#[derive(Default)]
pub struct RecordingDispatcher {
    queue: Mutex<VecDeque<Task>>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tasks recorded and not yet drained, oldest first
    pub fn tasks(&self) -> Vec<Task> {
        self.lock().iter().cloned().collect()
    }

    /// Remove and return every recorded task
    pub fn take(&self) -> Vec<Task> {
        self.lock().drain(..).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Run recorded tasks, including any they dispatch, until none remain
    ///
    /// `ctx.dispatcher` must be this dispatcher for follow-up tasks to be
    /// picked up. Stops at the first failing task. Returns the number of
    /// tasks executed.
    pub async fn drain(&self, ctx: &TaskContext) -> Result<usize> {
        let mut executed = 0;
        loop {
            let next = self.lock().pop_front();
            let Some(task) = next else {
                return Ok(executed);
            };
            run_task(ctx, &task).await?;
            executed += 1;
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Task>> {
        // A poisoned queue still holds valid tasks
        self.queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl TaskDispatcher for RecordingDispatcher {
    fn dispatch(&self, task: Task) {
        tracing::debug!(task = task.name(), "Recorded task");
        self.lock().push_back(task);
    }
}
