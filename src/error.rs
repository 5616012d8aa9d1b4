use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Error taxonomy for the pulse pipeline. `BudgetExceeded`,
/// `ModelUnavailable` and `ModelParseError` are deliberately absent here —
/// those are admission/enrichment *outcomes*, represented as data
/// (`budget::Decision`, `llm::EnrichError`), not failures of the pipeline
/// itself.
#[derive(Debug, thiserror::Error)]
pub enum PulseError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("a pulse is already running for this user")]
    AlreadyStarted,

    #[error("no pulse is currently running for this user")]
    NotStarted,

    #[error("pulse has already been archived")]
    AlreadyArchived,

    #[error("storage is temporarily unavailable")]
    Transient(#[from] crate::store::StoreError),

    #[error("internal error")]
    Fatal(#[source] anyhow::Error),
}

impl From<crate::repository::RepoError> for PulseError {
    fn from(err: crate::repository::RepoError) -> Self {
        use crate::repository::RepoError;
        match err {
            RepoError::AlreadyStarted => PulseError::AlreadyStarted,
            RepoError::NotStarted => PulseError::NotStarted,
            RepoError::Store(e) => PulseError::Transient(e),
            RepoError::StopFailed | RepoError::Corrupt(_) => PulseError::Fatal(err.into()),
        }
    }
}

impl PulseError {
    pub fn fatal(err: impl Into<anyhow::Error>) -> Self {
        PulseError::Fatal(err.into())
    }

    fn status(&self) -> StatusCode {
        match self {
            PulseError::Validation(_) => StatusCode::BAD_REQUEST,
            PulseError::AlreadyStarted => StatusCode::CONFLICT,
            PulseError::NotStarted => StatusCode::BAD_REQUEST,
            PulseError::AlreadyArchived => StatusCode::CONFLICT,
            PulseError::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
            PulseError::Fatal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            PulseError::Validation(_) => "Validation",
            PulseError::AlreadyStarted => "AlreadyStarted",
            PulseError::NotStarted => "NotStarted",
            PulseError::AlreadyArchived => "AlreadyArchived",
            PulseError::Transient(_) => "Transient",
            PulseError::Fatal(_) => "Fatal",
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl IntoResponse for PulseError {
    /// The façade never leaks internal error text: `Fatal` is
    /// logged by the caller before conversion and rendered generically here.
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            PulseError::Fatal(_) | PulseError::Transient(_) => "internal error".to_string(),
            other => other.to_string(),
        };
        let body = ErrorBody {
            error: self.kind(),
            message,
        };
        (status, axum::Json(body)).into_response()
    }
}
