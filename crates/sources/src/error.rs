/// SourceError is the error surface of every source client: a kind, whether
/// it is safely retryable, which provider raised it, and the original
/// message for diagnostics (never surfaced as primary user-facing text).
#[derive(Debug, thiserror::Error)]
#[error("{provider}: {kind}: {original}")]
pub struct SourceError {
    pub kind: models::ErrorKind,
    pub retryable: bool,
    pub provider: &'static str,
    pub original: String,
}

impl SourceError {
    pub fn from_ingest(provider: &'static str, err: models::IngestError) -> Self {
        SourceError {
            kind: err.kind(),
            retryable: err.kind().retryable(),
            provider,
            original: err.to_string(),
        }
    }

    pub fn not_found(provider: &'static str) -> Self {
        SourceError {
            kind: models::ErrorKind::NotFound,
            retryable: false,
            provider,
            original: "not found".to_string(),
        }
    }

    pub fn parse_failure(provider: &'static str, detail: impl Into<String>) -> Self {
        SourceError {
            kind: models::ErrorKind::ParseFailure,
            retryable: false,
            provider,
            original: detail.into(),
        }
    }
}
