use models::{Task, TaskId};

/// TaskStore is the persistence seam the `Server` dequeues work through and
/// executors check cancellation against. Kept as a trait (rather than a
/// concrete `PgTaskStore` reference everywhere) so tests can swap in an
/// in-memory fake.
#[async_trait::async_trait]
pub trait TaskStore: Send + Sync {
    /// Dequeues up to `limit` tasks that are ready to run (not sleeping, not
    /// terminal), marking them as claimed so a concurrent dequeue does not
    /// also pick them up.
    async fn dequeue(&self, limit: u32) -> anyhow::Result<Vec<Task>>;
    async fn save(&self, task: &Task) -> anyhow::Result<()>;
    async fn get(&self, task_id: TaskId) -> anyhow::Result<Option<Task>>;
    async fn request_cancel(&self, task_id: TaskId) -> anyhow::Result<()>;
    async fn is_cancel_requested(&self, task_id: TaskId) -> anyhow::Result<bool>;
    /// Non-terminal tasks created at or after `since`, for the dedup engine's
    /// in-flight-task phase. Matching on normalized
    /// `submitted_source` is left to the caller since normalization is a
    /// dedup concern, not a task-store one.
    async fn list_active_since(&self, since: chrono::DateTime<chrono::Utc>) -> anyhow::Result<Vec<Task>>;
}

/// PgTaskStore persists `Task` as a JSONB blob alongside the columns the
/// dequeue query needs: task_id / wake_at / heartbeat, claimed via
/// `FOR UPDATE SKIP LOCKED`.
pub struct PgTaskStore {
    pool: sqlx::PgPool,
    claim_timeout: chrono::Duration,
}

impl PgTaskStore {
    pub fn new(pool: sqlx::PgPool) -> Self {
        PgTaskStore { pool, claim_timeout: chrono::Duration::seconds(30) }
    }
}

#[async_trait::async_trait]
impl TaskStore for PgTaskStore {
    async fn dequeue(&self, limit: u32) -> anyhow::Result<Vec<Task>> {
        let rows = sqlx::query!(
            r#"
            WITH picked AS (
                SELECT task_id
                FROM tasks
                WHERE execution_status IN ('pending', 'processing')
                  AND wake_at < NOW()
                  AND heartbeat < NOW() - $2::INTERVAL
                ORDER BY wake_at
                LIMIT $1
                FOR UPDATE SKIP LOCKED
            )
            UPDATE tasks
            SET heartbeat = NOW()
            WHERE task_id IN (SELECT task_id FROM picked)
            RETURNING task_json
            "#,
            limit as i64,
            sqlx::postgres::types::PgInterval::try_from(self.claim_timeout)
                .map_err(|e| anyhow::anyhow!(e))?,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| serde_json::from_value(row.task_json).map_err(anyhow::Error::from))
            .collect()
    }

    async fn save(&self, task: &Task) -> anyhow::Result<()> {
        let json = serde_json::to_value(task)?;
        let status = status_column(task.execution_status);
        let wake_at = if task.execution_status.is_terminal() {
            chrono::DateTime::<chrono::Utc>::MAX_UTC
        } else {
            chrono::Utc::now()
        };

        sqlx::query!(
            r#"
            INSERT INTO tasks (task_id, execution_status, wake_at, heartbeat, cancel_requested, task_json, created_at)
            VALUES ($1, $2, $3, NOW(), FALSE, $4, $5)
            ON CONFLICT (task_id) DO UPDATE SET
                execution_status = EXCLUDED.execution_status,
                wake_at = EXCLUDED.wake_at,
                task_json = EXCLUDED.task_json
            "#,
            task.task_id.0,
            status,
            wake_at,
            json,
            task.created_at,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, task_id: TaskId) -> anyhow::Result<Option<Task>> {
        let row = sqlx::query!("SELECT task_json FROM tasks WHERE task_id = $1", task_id.0)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| serde_json::from_value(r.task_json).map_err(anyhow::Error::from)).transpose()
    }

    async fn request_cancel(&self, task_id: TaskId) -> anyhow::Result<()> {
        sqlx::query!("UPDATE tasks SET cancel_requested = TRUE WHERE task_id = $1", task_id.0)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn is_cancel_requested(&self, task_id: TaskId) -> anyhow::Result<bool> {
        let row = sqlx::query!(
            "SELECT cancel_requested FROM tasks WHERE task_id = $1",
            task_id.0
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| r.cancel_requested).unwrap_or(false))
    }

    async fn list_active_since(&self, since: chrono::DateTime<chrono::Utc>) -> anyhow::Result<Vec<Task>> {
        let rows = sqlx::query!(
            r#"
            SELECT task_json FROM tasks
            WHERE execution_status IN ('pending', 'processing')
              AND created_at >= $1
            "#,
            since,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| serde_json::from_value(row.task_json).map_err(anyhow::Error::from))
            .collect()
    }
}

fn status_column(status: models::ExecutionStatus) -> &'static str {
    match status {
        models::ExecutionStatus::Pending => "pending",
        models::ExecutionStatus::Processing => "processing",
        models::ExecutionStatus::Completed => "completed",
        models::ExecutionStatus::Failed => "failed",
        models::ExecutionStatus::Cancelled => "cancelled",
    }
}
