//! Tracking and polling of backend tasks.

use serde_json::Value;
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, PoisonError,
    },
    time::Duration,
};

use crate::{
    backend::TaskBackend,
    error::{AppError, Result},
    types::{Location, TaskId, TaskKind, TaskMeta, TaskStatus},
};

#[derive(Debug, Clone)]
struct RunningTask {
    kind: TaskKind,
    meta: TaskMeta,
    task_id: Option<TaskId>,
}

type RunningTasks = Arc<Mutex<HashMap<u64, RunningTask>>>;

/// Reservation of a (kind, location) slot in the task registry.
///
/// The slot is released when the reservation is dropped.
#[derive(Debug)]
pub struct PendingTask {
    slot: u64,
    running: RunningTasks,
}

impl PendingTask {
    fn attach(&self, task_id: TaskId) {
        let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(task) = running.get_mut(&self.slot) {
            task.task_id = Some(task_id);
        }
    }
}

impl Drop for PendingTask {
    fn drop(&mut self) {
        let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        running.remove(&self.slot);
    }
}

/// Registry of in-flight backend tasks.
///
/// Prevents duplicate tasks for the same kind and location and polls the
/// backend until a task reaches a terminal state.
pub struct TaskRegistry {
    backend: Arc<dyn TaskBackend>,
    poll_interval: Duration,
    running: RunningTasks,
    next_slot: AtomicU64,
}

impl TaskRegistry {
    pub fn new(backend: Arc<dyn TaskBackend>, poll_interval: Duration) -> Self {
        Self {
            backend,
            poll_interval,
            running: Arc::new(Mutex::new(HashMap::new())),
            next_slot: AtomicU64::new(0),
        }
    }

    /// Reserve the slot for a task of `kind` scoped to `meta.location`.
    ///
    /// Returns `None` when a task with the same kind and location is already
    /// running. Takes effect immediately, before any suspension point.
    pub fn reserve(&self, kind: TaskKind, meta: TaskMeta) -> Option<PendingTask> {
        let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        let busy =
            running.values().any(|task| task.kind == kind && task.meta.location == meta.location);
        if busy {
            return None;
        }

        let slot = self.next_slot.fetch_add(1, Ordering::Relaxed);
        running.insert(slot, RunningTask { kind, meta, task_id: None });
        Some(PendingTask { slot, running: self.running.clone() })
    }

    /// Whether a task of `kind` is running, optionally for one location only.
    pub fn is_task_running(&self, kind: TaskKind, location: Option<Location>) -> bool {
        let running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        running
            .values()
            .any(|task| task.kind == kind && (location.is_none() || task.meta.location == location))
    }

    /// Metadata of a running task of `kind`.
    pub fn task_metadata(&self, kind: TaskKind) -> Option<TaskMeta> {
        let running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        running.values().find(|task| task.kind == kind).map(|task| task.meta.clone())
    }

    /// Poll `task_id` until it finishes and return its result.
    ///
    /// Waits as long as the backend reports the task as pending; the slot
    /// held by `pending` is released once this returns.
    pub async fn await_task(&self, pending: PendingTask, task_id: TaskId) -> Result<Value> {
        pending.attach(task_id);
        tracing::debug!(task_id, "Awaiting backend task");

        loop {
            match self.backend.query_task(task_id).await? {
                TaskStatus::Pending => tokio::time::sleep(self.poll_interval).await,
                TaskStatus::Completed { outcome } => {
                    return match outcome.result {
                        Some(result) => Ok(result),
                        None => Err(AppError::TaskFailed {
                            task_id,
                            message: outcome
                                .message
                                .filter(|message| !message.is_empty())
                                .unwrap_or_else(|| "Task returned no result".to_string()),
                        }),
                    };
                }
                TaskStatus::NotFound => {
                    return Err(AppError::TaskFailed {
                        task_id,
                        message: "Task not found".to_string(),
                    })
                }
            }
        }
    }
}
