use crate::dto::{LiteratureFulltext, LiteratureSummary};
use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::Json;
use models::Lid;
use serde::Deserialize;

/// `get_literature(lid)`: summary omits `fulltext` and raw
/// reference text.
pub async fn get_literature(
    State(state): State<AppState>,
    Path(lid): Path<String>,
) -> Result<Json<LiteratureSummary>, ApiError> {
    let lid = Lid::from_raw(lid);
    let literature = state.graph.get_literature(&lid).await?.ok_or(ApiError::LiteratureNotFound)?;
    Ok(Json(LiteratureSummary::from(&literature)))
}

/// `get_literature_fulltext(lid)`: the variant that includes
/// extracted full text and parsing provenance.
pub async fn get_literature_fulltext(
    State(state): State<AppState>,
    Path(lid): Path<String>,
) -> Result<Json<LiteratureFulltext>, ApiError> {
    let lid = Lid::from_raw(lid);
    let literature = state.graph.get_literature(&lid).await?.ok_or(ApiError::LiteratureNotFound)?;
    Ok(Json(LiteratureFulltext::from(&literature)))
}

#[derive(Debug, Deserialize)]
pub struct BatchGetRequest {
    pub lids: Vec<String>,
}

/// `batch_get([lid])`. Missing records are silently omitted
/// rather than failing the whole batch, since a caller requesting 20 lids
/// expects partial results when some have since been removed: the
/// failure-doc cleanup rule can delete a `Literature` after it was cited.
pub async fn batch_get(
    State(state): State<AppState>,
    Json(req): Json<BatchGetRequest>,
) -> Result<Json<Vec<LiteratureSummary>>, ApiError> {
    let mut out = Vec::with_capacity(req.lids.len());
    for raw in req.lids {
        let lid = Lid::from_raw(raw);
        if let Some(literature) = state.graph.get_literature(&lid).await? {
            out.push(LiteratureSummary::from(&literature));
        }
    }
    Ok(Json(out))
}
