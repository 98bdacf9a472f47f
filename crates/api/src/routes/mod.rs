pub mod graph;
pub mod health;
pub mod literature;
pub mod submit;
pub mod tasks;

use crate::state::AppState;
use axum::routing::{get, post};
use axum::Router;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health::healthz))
        .route("/readyz", get(health::readyz))
        .route("/submit", post(submit::submit))
        .route("/by-identifier", get(submit::by_identifier))
        .route("/tasks/:task_id", get(tasks::get_task))
        .route("/tasks/:task_id/stream", get(tasks::stream_task))
        .route("/literature/batch", post(literature::batch_get))
        .route("/literature/:lid", get(literature::get_literature))
        .route("/literature/:lid/fulltext", get(literature::get_literature_fulltext))
        .route("/graph", get(graph::graph))
        .with_state(state)
}
