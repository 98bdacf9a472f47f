//! Task Coordinator: a small poll-based executor framework. A `Server`
//! dequeues ready tasks from a Postgres-backed store via
//! `FOR UPDATE SKIP LOCKED`, runs a registered `Executor` under a
//! semaphore-bounded worker pool, and fans out state transitions over a
//! per-task broadcast channel.
//!
//! This system runs exactly one task type (ingestion), so there is no
//! `TaskType` registry to dispatch on; `Executor` is a single trait
//! implemented once by the `ingest` crate.

mod events;
mod server;
pub mod store;

pub use events::EventBus;
pub use server::{Server, ServerConfig};
pub use store::{PgTaskStore, TaskStore};

use models::Task;

/// The outcome of one `Executor::step` call. This execution model has no
/// cross-task spawn/send, only self-directed continue/sleep/suspend/done.
#[derive(Debug)]
pub enum PollOutcome {
    /// Run another step immediately without yielding to the worker pool.
    Continue,
    /// Persist current state and sleep at most the given duration before the
    /// next step, e.g. while polling a slow upstream.
    Sleep(std::time::Duration),
    /// Persist current state and stop; the task will not be re-polled until
    /// something external (a new submission, a cancel request) wakes it.
    Suspend,
    /// The task has reached a terminal state; retire its event channel.
    Done,
}

/// TaskContext is the handle an `Executor::step` implementation receives: the
/// mutable `Task` it is advancing, cancellation visibility, and the event bus
/// to publish state-change notifications on.
pub struct TaskContext<'a> {
    pub task: &'a mut Task,
    store: &'a dyn TaskStore,
    events: &'a EventBus,
}

impl<'a> TaskContext<'a> {
    pub fn new(task: &'a mut Task, store: &'a dyn TaskStore, events: &'a EventBus) -> Self {
        TaskContext { task, store, events }
    }

    /// Cooperative cancellation check: executors should call
    /// this between plan steps and before each outbound request.
    pub async fn is_cancel_requested(&self) -> bool {
        self.store.is_cancel_requested(self.task.task_id).await.unwrap_or(false)
    }

    pub fn publish(&self, kind: models::TaskEventKind) {
        self.events.publish(models::TaskEvent {
            task_id: self.task.task_id,
            kind,
            at: chrono::Utc::now(),
            payload: self.task.snapshot(),
        });
    }
}

#[async_trait::async_trait]
pub trait Executor: Send + Sync + 'static {
    async fn step(&self, ctx: &mut TaskContext<'_>) -> anyhow::Result<PollOutcome>;
}

