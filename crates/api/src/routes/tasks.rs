use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::Json;
use futures::stream;
use models::{TaskEvent, TaskEventKind, TaskId};
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;

/// `get_task(task_id)`.
pub async fn get_task(
    State(state): State<AppState>,
    Path(task_id): Path<TaskId>,
) -> Result<Json<models::TaskStatusSnapshot>, ApiError> {
    let task = state.tasks.get(task_id).await?.ok_or(ApiError::TaskNotFound)?;
    Ok(Json(task.snapshot()))
}

/// `stream_task(task_id)`: delivers status updates over SSE,
/// closing after a terminal event.
pub async fn stream_task(
    State(state): State<AppState>,
    Path(task_id): Path<TaskId>,
) -> Result<impl IntoResponse, ApiError> {
    // Confirm the task exists before opening the stream; an unknown task_id
    // should 404 rather than hang on an empty broadcast channel.
    state.tasks.get(task_id).await?.ok_or(ApiError::TaskNotFound)?;

    let rx = state.events.subscribe(task_id);
    let inner = BroadcastStream::new(rx);

    let sse_stream = stream::unfold((inner, false), |(mut inner, done)| async move {
        if done {
            return None;
        }
        match inner.next().await {
            Some(Ok(event)) => {
                let terminal = matches!(
                    event.kind,
                    TaskEventKind::Completed | TaskEventKind::Failed | TaskEventKind::Error
                );
                let sse_event: Result<Event, Infallible> = Ok(to_sse_event(&event));
                Some((sse_event, (inner, terminal)))
            }
            Some(Err(_)) => {
                let sse_event: Result<Event, Infallible> =
                    Ok(Event::default().event("lagged").data("events dropped, reconnect"));
                Some((sse_event, (inner, true)))
            }
            None => None,
        }
    });

    Ok(Sse::new(sse_stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15))))
}

fn to_sse_event(event: &TaskEvent) -> Event {
    Event::default()
        .event(match event.kind {
            TaskEventKind::Status => "status",
            TaskEventKind::Completed => "completed",
            TaskEventKind::Error => "error",
            TaskEventKind::Failed => "failed",
        })
        .json_data(event)
        .unwrap_or_else(|_| Event::default().data("{}"))
}
