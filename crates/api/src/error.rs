use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use models::ErrorKind;
use serde::Serialize;

/// ApiError maps the domain error kinds onto HTTP statuses: a single enum
/// implementing `IntoResponse`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Domain(models::IngestError),
    #[error("task not found")]
    TaskNotFound,
    #[error("literature not found")]
    LiteratureNotFound,
    #[error(transparent)]
    Graph(#[from] graph_store::GraphStoreError),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    kind: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_action: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, kind, message, next_action) = match &self {
            ApiError::Domain(err) => (status_for(err.kind()), err.kind(), err.to_string(), err.next_action()),
            ApiError::TaskNotFound => (StatusCode::NOT_FOUND, ErrorKind::NotFound, self.to_string(), None),
            ApiError::LiteratureNotFound => (StatusCode::NOT_FOUND, ErrorKind::NotFound, self.to_string(), None),
            ApiError::Graph(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorKind::Internal, self.to_string(), None),
            ApiError::Other(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorKind::Internal, self.to_string(), None),
        };

        if status.is_server_error() {
            tracing::error!(?status, %message, "request failed");
        }

        let body = Json(ErrorBody { kind: kind.to_string(), message, next_action });
        (status, body).into_response()
    }
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidInput | ErrorKind::UnsupportedSource | ErrorKind::InvalidPdf | ErrorKind::TooLarge => {
            StatusCode::BAD_REQUEST
        }
        ErrorKind::SsrfBlocked => StatusCode::FORBIDDEN,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Cancelled => StatusCode::GONE,
        ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::Network | ErrorKind::ProviderUnavailable => StatusCode::BAD_GATEWAY,
        ErrorKind::ParseFailure | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn ssrf_blocked_maps_to_forbidden() {
        assert_eq!(status_for(ErrorKind::SsrfBlocked), StatusCode::FORBIDDEN);
    }

    #[test]
    fn provider_unavailable_maps_to_bad_gateway() {
        assert_eq!(status_for(ErrorKind::ProviderUnavailable), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn domain_error_response_carries_next_action() {
        let err = ApiError::Domain(models::IngestError::ProviderUnavailable("crossref".to_string()));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["kind"], "provider_unavailable");
        assert!(parsed["next_action"].as_str().unwrap().contains("crossref"));
    }

    #[tokio::test]
    async fn task_not_found_has_no_next_action_field() {
        let response = ApiError::TaskNotFound.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(parsed.get("next_action").is_none());
    }
}
