use crate::{Lid, TaskId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl ExecutionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionStatus::Completed | ExecutionStatus::Failed | ExecutionStatus::Cancelled
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentName {
    Metadata,
    Content,
    References,
}

impl ComponentName {
    pub const ALL: [ComponentName; 3] = [
        ComponentName::Metadata,
        ComponentName::Content,
        ComponentName::References,
    ];

    /// Weight of this component in the `overall_progress` weighted average:
    /// metadata 40%, content 30%, references 30%.
    pub fn weight(&self) -> f32 {
        match self {
            ComponentName::Metadata => 0.40,
            ComponentName::Content => 0.30,
            ComponentName::References => 0.30,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentState {
    Pending,
    Processing,
    Waiting,
    Success,
    Failed,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ErrorInfo {
    pub kind: crate::error::ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ComponentStatus {
    pub status: ComponentState,
    pub stage: String,
    pub progress: u8,
    pub source: Option<String>,
    pub attempts: u32,
    pub next_action: Option<String>,
    pub error_info: Option<ErrorInfo>,
}

impl ComponentStatus {
    pub fn pending() -> Self {
        ComponentStatus {
            status: ComponentState::Pending,
            stage: "queued".to_string(),
            progress: 0,
            source: None,
            attempts: 0,
            next_action: None,
            error_info: None,
        }
    }

    /// Advance this component's state, enforcing the monotonicity invariant:
    /// `progress` never decreases.
    pub fn advance(&mut self, status: ComponentState, stage: impl Into<String>, progress: u8) {
        self.status = status;
        self.stage = stage.into();
        self.progress = self.progress.max(progress);
    }

    pub fn fail(&mut self, error: ErrorInfo, next_action: Option<String>) {
        self.status = ComponentState::Failed;
        self.error_info = Some(error);
        self.next_action = next_action;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultType {
    Created,
    Duplicate,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ComponentStatuses {
    pub metadata: ComponentStatus,
    pub content: ComponentStatus,
    pub references: ComponentStatus,
}

impl ComponentStatuses {
    pub fn pending() -> Self {
        ComponentStatuses {
            metadata: ComponentStatus::pending(),
            content: ComponentStatus::pending(),
            references: ComponentStatus::pending(),
        }
    }

    pub fn get(&self, name: ComponentName) -> &ComponentStatus {
        match name {
            ComponentName::Metadata => &self.metadata,
            ComponentName::Content => &self.content,
            ComponentName::References => &self.references,
        }
    }

    pub fn get_mut(&mut self, name: ComponentName) -> &mut ComponentStatus {
        match name {
            ComponentName::Metadata => &mut self.metadata,
            ComponentName::Content => &mut self.content,
            ComponentName::References => &mut self.references,
        }
    }

    /// Weighted-average progress across the three components.
    pub fn overall_progress(&self) -> u8 {
        let total: f32 = ComponentName::ALL
            .iter()
            .map(|name| self.get(*name).progress as f32 * name.weight())
            .sum();
        total.round().clamp(0.0, 100.0) as u8
    }

    /// The human-readable stage of the most-advanced active component.
    pub fn current_stage(&self) -> String {
        ComponentName::ALL
            .iter()
            .map(|name| self.get(*name))
            .filter(|c| matches!(c.status, ComponentState::Processing | ComponentState::Waiting))
            .max_by_key(|c| c.progress)
            .map(|c| c.stage.clone())
            .unwrap_or_else(|| "idle".to_string())
    }
}

/// Task is the ingestion job record. It lives in the task/result
/// store, not the graph store: no cross-store transactions are assumed.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Task {
    pub task_id: TaskId,
    pub submitted_source: String,
    pub execution_status: ExecutionStatus,
    pub components: ComponentStatuses,
    pub result_type: Option<ResultType>,
    pub literature_id: Option<Lid>,
    pub error_info: Option<ErrorInfo>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl Task {
    pub fn new(submitted_source: impl Into<String>) -> Self {
        let now = chrono::Utc::now();
        Task {
            task_id: TaskId::new(),
            submitted_source: submitted_source.into(),
            execution_status: ExecutionStatus::Pending,
            components: ComponentStatuses::pending(),
            result_type: None,
            literature_id: None,
            error_info: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn overall_progress(&self) -> u8 {
        self.components.overall_progress()
    }

    pub fn current_stage(&self) -> String {
        self.components.current_stage()
    }

    pub fn snapshot(&self) -> TaskStatusSnapshot {
        TaskStatusSnapshot {
            task_id: self.task_id,
            execution_status: self.execution_status,
            overall_progress: self.overall_progress(),
            current_stage: self.current_stage(),
            component_status: self.components.clone(),
            result_type: self.result_type,
            literature_id: self.literature_id.clone(),
            error_info: self.error_info.clone(),
        }
    }
}

/// TaskStatusSnapshot is the read-side shape exposed by `get_task`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TaskStatusSnapshot {
    pub task_id: TaskId,
    pub execution_status: ExecutionStatus,
    pub overall_progress: u8,
    pub current_stage: String,
    pub component_status: ComponentStatuses,
    pub result_type: Option<ResultType>,
    pub literature_id: Option<Lid>,
    pub error_info: Option<ErrorInfo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskEventKind {
    Status,
    Completed,
    Error,
    Failed,
}

/// TaskEvent is one entry in a task's event stream. Terminal events are
/// exclusive: a task never publishes `Completed` after a `Cancelled`/`Failed`
/// event for the same `task_id`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TaskEvent {
    pub task_id: TaskId,
    pub kind: TaskEventKind,
    pub at: chrono::DateTime<chrono::Utc>,
    pub payload: TaskStatusSnapshot,
}
