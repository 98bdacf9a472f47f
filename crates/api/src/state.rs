use std::sync::Arc;

/// AppState is the shared handle every axum route pulls from `State`: a
/// single shared-pool-plus-config bundle passed through axum's typed
/// `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub graph: Arc<graph_store::GraphStore>,
    pub tasks: Arc<dyn task_engine::TaskStore>,
    pub events: Arc<task_engine::EventBus>,
    pub dedup: Arc<dedup::DedupEngine>,
    pub config: Arc<crate::startup::ApiConfig>,
}
