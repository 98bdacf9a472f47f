use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;

/// Liveness probe: the process is up and serving requests.
pub async fn healthz() -> &'static str {
    "ok"
}

/// Readiness probe: the graph store connection is actually usable, following
/// the common axum convention of a separate liveness/readiness pair so a
/// load balancer can distinguish "restarting" from "degraded".
pub async fn readyz(State(state): State<AppState>) -> (StatusCode, &'static str) {
    match state.graph.read_graph(&[], Some(0)).await {
        Ok(_) => (StatusCode::OK, "ready"),
        Err(_) => (StatusCode::SERVICE_UNAVAILABLE, "not ready"),
    }
}
