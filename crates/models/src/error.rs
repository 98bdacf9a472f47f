/// ErrorKind enumerates the domain-level error kinds the system can surface. These are
/// carried on `ComponentStatus`/`Task` error info and mapped to HTTP statuses at
/// the `api` boundary; they are distinct from any particular client library's
/// own error type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    UnsupportedSource,
    SsrfBlocked,
    TooLarge,
    InvalidPdf,
    Network,
    Timeout,
    ProviderUnavailable,
    NotFound,
    ParseFailure,
    Conflict,
    Cancelled,
    Internal,
}

impl ErrorKind {
    /// Whether the request broker should retry an error of this kind.
    pub fn retryable(&self) -> bool {
        matches!(
            self,
            ErrorKind::Network | ErrorKind::Timeout | ErrorKind::ProviderUnavailable
        )
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::UnsupportedSource => "unsupported_source",
            ErrorKind::SsrfBlocked => "ssrf_blocked",
            ErrorKind::TooLarge => "too_large",
            ErrorKind::InvalidPdf => "invalid_pdf",
            ErrorKind::Network => "network",
            ErrorKind::Timeout => "timeout",
            ErrorKind::ProviderUnavailable => "provider_unavailable",
            ErrorKind::NotFound => "not_found",
            ErrorKind::ParseFailure => "parse_failure",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Internal => "internal",
        };
        f.write_str(s)
    }
}

/// IngestError is the shared domain error type threaded through every stage of
/// ingestion. Each variant carries enough context for `ComponentStatus::fail`
/// to populate a user-visible `next_action` propagation policy.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("unsupported source: {0}")]
    UnsupportedSource(String),
    #[error("request blocked: target resolves to a private address")]
    SsrfBlocked,
    #[error("response exceeded the configured size cap ({0} bytes)")]
    TooLarge(u64),
    #[error("bytes did not validate as a PDF")]
    InvalidPdf,
    #[error("network error: {0}")]
    Network(String),
    #[error("request timed out")]
    Timeout,
    #[error("upstream provider {0} is unavailable")]
    ProviderUnavailable(String),
    #[error("not found")]
    NotFound,
    #[error("failed to parse response: {0}")]
    ParseFailure(String),
    #[error("conflict: existing record {0}")]
    Conflict(String),
    #[error("task was cancelled")]
    Cancelled,
    #[error("internal error: {0}")]
    Internal(String),
}

impl IngestError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            IngestError::InvalidInput(_) => ErrorKind::InvalidInput,
            IngestError::UnsupportedSource(_) => ErrorKind::UnsupportedSource,
            IngestError::SsrfBlocked => ErrorKind::SsrfBlocked,
            IngestError::TooLarge(_) => ErrorKind::TooLarge,
            IngestError::InvalidPdf => ErrorKind::InvalidPdf,
            IngestError::Network(_) => ErrorKind::Network,
            IngestError::Timeout => ErrorKind::Timeout,
            IngestError::ProviderUnavailable(_) => ErrorKind::ProviderUnavailable,
            IngestError::NotFound => ErrorKind::NotFound,
            IngestError::ParseFailure(_) => ErrorKind::ParseFailure,
            IngestError::Conflict(_) => ErrorKind::Conflict,
            IngestError::Cancelled => ErrorKind::Cancelled,
            IngestError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// A short suggested next action, surfaced on `ComponentStatus::next_action`.
    pub fn next_action(&self) -> Option<String> {
        match self {
            IngestError::InvalidPdf | IngestError::TooLarge(_) => {
                Some("provide a different PDF".to_string())
            }
            IngestError::NotFound => Some("provide DOI".to_string()),
            IngestError::ProviderUnavailable(provider) => {
                Some(format!("retry later; {provider} is unavailable"))
            }
            IngestError::UnsupportedSource(_) => Some("provide DOI or PDF".to_string()),
            _ => None,
        }
    }

    pub fn to_error_info(&self) -> crate::task::ErrorInfo {
        crate::task::ErrorInfo {
            kind: self.kind(),
            message: self.to_string(),
            details: None,
        }
    }
}
