use crate::dto::GraphQuery;
use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Query, State};
use axum::Json;
use models::{GraphReadResult, Lid, MAX_GRAPH_SEEDS};

/// `graph(lids, depth?)`: bounded-neighborhood read from a
/// seed set, depth clamped server-side to `[0, MAX_GRAPH_DEPTH]`.
pub async fn graph(
    State(state): State<AppState>,
    Query(q): Query<GraphQuery>,
) -> Result<Json<GraphReadResult>, ApiError> {
    let seeds: Vec<Lid> = q
        .lids
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(Lid::from_raw)
        .collect();

    if seeds.is_empty() {
        return Err(ApiError::Domain(models::IngestError::InvalidInput(
            "graph read requires at least one lid".to_string(),
        )));
    }
    if seeds.len() > MAX_GRAPH_SEEDS {
        return Err(ApiError::Domain(models::IngestError::InvalidInput(format!(
            "graph read accepts at most {MAX_GRAPH_SEEDS} seed lids"
        ))));
    }

    let result = state.graph.read_graph(&seeds, q.depth).await?;
    Ok(Json(result))
}
