use crate::{Executor, PollOutcome, TaskContext, TaskStore};
use crate::events::EventBus;
use models::{ExecutionStatus, TaskEventKind};
use std::sync::Arc;
use std::time::Duration;

/// ServerConfig holds the dequeue tuning this single-executor server needs.
///
/// `permits` bounds concurrent task execution. There is no separate prefetch
/// pool: a task is only dequeued once a permit is already held, so the
/// worker-count and prefetch knobs collapse into the one semaphore. The
/// default tracks the intended worker concurrency.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub permits: u32,
    pub dequeue_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig { permits: 4, dequeue_interval: Duration::from_secs(2) }
    }
}

/// Server drives a single registered `Executor` against a `TaskStore`; there
/// is exactly one task type, so no registry dispatch is needed.
pub struct Server<E: Executor> {
    executor: Arc<E>,
    store: Arc<dyn TaskStore>,
    events: Arc<EventBus>,
    config: ServerConfig,
}

impl<E: Executor> Server<E> {
    pub fn new(executor: E, store: Arc<dyn TaskStore>, events: Arc<EventBus>, config: ServerConfig) -> Self {
        Server { executor: Arc::new(executor), store, events, config }
    }

    /// Serves until `shutdown` resolves, then waits for in-flight tasks to
    /// drain by reacquiring every permit via `acquire_many_owned`.
    pub async fn serve(self, shutdown: impl std::future::Future<Output = ()>) {
        let semaphore = Arc::new(tokio::sync::Semaphore::new(self.config.permits as usize));
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;
                () = &mut shutdown => break,
                permit = semaphore.clone().acquire_owned() => {
                    let permit = permit.expect("semaphore not closed");
                    match self.store.dequeue(1).await {
                        Ok(tasks) if tasks.is_empty() => {
                            drop(permit);
                            tokio::select! {
                                () = tokio::time::sleep(jittered(self.config.dequeue_interval)) => (),
                                () = &mut shutdown => break,
                            }
                        }
                        Ok(mut tasks) => {
                            let task = tasks.remove(0);
                            let executor = self.executor.clone();
                            let store = self.store.clone();
                            let events = self.events.clone();
                            tokio::spawn(async move {
                                let _permit = permit;
                                let task_id = task.task_id;
                                if let Err(err) = run_task(executor.as_ref(), task, store.as_ref(), events.as_ref()).await {
                                    tracing::warn!(?task_id, ?err, "task step failed; will retry on next dequeue");
                                }
                            });
                        }
                        Err(err) => {
                            tracing::error!(?err, "failed to dequeue tasks (will retry)");
                            drop(permit);
                            tokio::time::sleep(jittered(self.config.dequeue_interval)).await;
                        }
                    }
                }
            }
        }

        tracing::info!("task server signaled to stop, awaiting in-flight tasks");
        let _ = semaphore.acquire_many_owned(self.config.permits).await;
    }
}

/// Jitter the dequeue sleep by +/-10% to avoid multiple workers waking in
/// lockstep.
fn jittered(interval: Duration) -> Duration {
    let jitter = 0.9 + rand::random::<f64>() * 0.2;
    interval.mul_f64(jitter)
}

/// Runs one dequeued task to completion (Sleep/Suspend/Done), stepping the
/// executor and persisting + publishing after every step.
async fn run_task(
    executor: &dyn Executor,
    mut task: models::Task,
    store: &dyn TaskStore,
    events: &EventBus,
) -> anyhow::Result<()> {
    loop {
        let mut ctx = TaskContext::new(&mut task, store, events);
        let outcome = executor.step(&mut ctx).await;

        match outcome {
            Ok(PollOutcome::Continue) => {
                store.save(&task).await?;
                ctx_publish_status(&task, events);
            }
            Ok(PollOutcome::Sleep(_)) => {
                store.save(&task).await?;
                ctx_publish_status(&task, events);
                return Ok(());
            }
            Ok(PollOutcome::Suspend) => {
                store.save(&task).await?;
                ctx_publish_status(&task, events);
                return Ok(());
            }
            Ok(PollOutcome::Done) => {
                store.save(&task).await?;
                ctx_publish_terminal(&task, events);
                events.retire(task.task_id);
                return Ok(());
            }
            Err(err) => {
                task.execution_status = ExecutionStatus::Failed;
                task.error_info = Some(models::ErrorInfo {
                    kind: models::ErrorKind::Internal,
                    message: err.to_string(),
                    details: None,
                });
                store.save(&task).await?;
                ctx_publish_terminal(&task, events);
                events.retire(task.task_id);
                return Err(err);
            }
        }

        if task.execution_status.is_terminal() {
            events.retire(task.task_id);
            return Ok(());
        }
    }
}

fn ctx_publish_status(task: &models::Task, events: &EventBus) {
    events.publish(models::TaskEvent {
        task_id: task.task_id,
        kind: TaskEventKind::Status,
        at: chrono::Utc::now(),
        payload: task.snapshot(),
    });
}

fn ctx_publish_terminal(task: &models::Task, events: &EventBus) {
    let kind = match task.execution_status {
        ExecutionStatus::Failed => TaskEventKind::Failed,
        ExecutionStatus::Cancelled => TaskEventKind::Error,
        _ => TaskEventKind::Completed,
    };
    events.publish(models::TaskEvent {
        task_id: task.task_id,
        kind,
        at: chrono::Utc::now(),
        payload: task.snapshot(),
    });
}
