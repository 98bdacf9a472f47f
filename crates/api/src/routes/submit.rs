use crate::dto::{IdentifierKind, LiteratureSummary, SubmitRequest, SubmitResponse};
use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Query, State};
use axum::Json;
use dedup::{DedupCandidate, DedupOutcome};
use models::{ExecutionStatus, Submission, Task, TaskEventKind};
use serde::Deserialize;
use std::time::Duration;

/// `submit(source)`: checks dedup phase 1 using only the
/// identifiers supplied in the request; on no hit, schedules a task.
pub async fn submit(
    State(state): State<AppState>,
    Json(req): Json<SubmitRequest>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let submission: Submission = req.into();
    if !submission.has_identifier() && submission.url.is_none() && submission.pdf_url.is_none() {
        return Err(ApiError::Domain(models::IngestError::InvalidInput(
            "submission must include at least one of doi, arxiv_id, pmid, url, pdf_url".to_string(),
        )));
    }

    let response = submit_internal(&state, &submission).await?;
    Ok(Json(response))
}

pub(crate) async fn submit_internal(
    state: &AppState,
    submission: &Submission,
) -> Result<SubmitResponse, ApiError> {
    let candidate = DedupCandidate {
        submitted_source: submission.normalized_source(),
        doi: submission.doi.clone(),
        arxiv_id: submission.arxiv_id.clone(),
        pmid: submission.pmid.clone(),
        ..Default::default()
    };

    if let DedupOutcome::Existing(lid) = state.dedup.by_identifier(&candidate).await.map_err(anyhow::Error::from)? {
        return Ok(SubmitResponse::Exists {
            resource_url: format!("/literature/{lid}"),
            lid,
        });
    }

    let task = Task::new(submission.normalized_source());
    let task_id = task.task_id;
    state.tasks.save(&task).await?;

    Ok(SubmitResponse::Accepted {
        task_id,
        status_url: format!("/tasks/{task_id}"),
        stream_url: format!("/tasks/{task_id}/stream"),
    })
}

#[derive(Debug, Deserialize)]
pub struct ByIdentifierQuery {
    pub kind: IdentifierKind,
    pub value: String,
}

/// `by_identifier(kind, value)`: convenience wrapper that
/// submits, waits (bounded) for a terminal event, then reads the record back.
pub async fn by_identifier(
    State(state): State<AppState>,
    Query(q): Query<ByIdentifierQuery>,
) -> Result<Json<LiteratureSummary>, ApiError> {
    let submission = match q.kind {
        IdentifierKind::Doi => Submission { doi: Some(q.value), ..Default::default() },
        IdentifierKind::Arxiv => Submission { arxiv_id: Some(q.value), ..Default::default() },
        IdentifierKind::Pmid => Submission { pmid: Some(q.value), ..Default::default() },
        IdentifierKind::Url => Submission { url: Some(q.value), ..Default::default() },
    };

    let lid = match submit_internal(&state, &submission).await? {
        SubmitResponse::Exists { lid, .. } => lid,
        SubmitResponse::Accepted { task_id, .. } => wait_for_literature(&state, task_id).await?,
    };

    let literature = state.graph.get_literature(&lid).await?.ok_or(ApiError::LiteratureNotFound)?;
    Ok(Json(LiteratureSummary::from(&literature)))
}

/// Bounded wait: subscribes to the task's
/// event stream and blocks until a terminal event arrives or the deadline
/// passes, whichever is first.
async fn wait_for_literature(state: &AppState, task_id: models::TaskId) -> Result<models::Lid, ApiError> {
    let mut rx = state.events.subscribe(task_id);
    let deadline = tokio::time::Instant::now() + Duration::from_secs(state.config.by_identifier_wait_secs);

    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        if remaining.is_zero() {
            break;
        }
        match tokio::time::timeout(remaining, rx.recv()).await {
            Ok(Ok(event)) => match event.kind {
                TaskEventKind::Completed => {
                    if let Some(lid) = event.payload.literature_id {
                        return Ok(lid);
                    }
                    break;
                }
                TaskEventKind::Failed | TaskEventKind::Error => break,
                TaskEventKind::Status => continue,
            },
            Ok(Err(_)) | Err(_) => break,
        }
    }

    // The event may have been missed if the task already finished by the
    // time we subscribed; fall back to reading current persisted state.
    let task = state.tasks.get(task_id).await?.ok_or(ApiError::TaskNotFound)?;
    if task.execution_status == ExecutionStatus::Completed {
        if let Some(lid) = task.literature_id {
            return Ok(lid);
        }
    }
    Err(ApiError::Domain(models::IngestError::Timeout))
}
