use axum::{Json, response::IntoResponse};
use chip_index::IndexError;
use chip_models::ValidationError;
use http::StatusCode;
use serde_json::json;

#[derive(thiserror::Error, Debug)]
pub enum UpstreamError {
    #[error("request to upstream failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("upstream request timed out: {0}")]
    Timeout(String),

    #[error("upstream {url} answered {status}: {body}")]
    Status {
        url: String,
        status: StatusCode,
        body: String,
    },

    #[error("malformed upstream response from {url}: {reason}")]
    Decode { url: String, reason: String },

    #[error("upstream has no record for {0}")]
    NotFound(String),
}

impl UpstreamError {
    pub(crate) fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            UpstreamError::Timeout(url.to_string())
        } else {
            UpstreamError::Request(err)
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ProcessorError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("index error: {0}")]
    Index(#[from] IndexError),

    #[error("upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("no handler is configured for topic {0}")]
    UnknownTopic(String),

    #[error("message topic {actual} does not match delivery topic {expected}")]
    TopicMismatch { expected: String, actual: String },

    #[error("message is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("upstream reported a negative {field} count ({value})")]
    NegativeCount { field: String, value: i64 },
}

impl ProcessorError {
    /// Whether redelivering the same message can succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProcessorError::Index(e) => e.is_transient(),
            ProcessorError::Upstream(UpstreamError::NotFound(_)) => false,
            ProcessorError::Upstream(_) => true,
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ProcessorError::Index(IndexError::NotFound(_))
                | ProcessorError::Upstream(UpstreamError::NotFound(_))
        )
    }

    fn status(&self) -> StatusCode {
        match self {
            ProcessorError::Validation(_)
            | ProcessorError::InvalidJson(_)
            | ProcessorError::TopicMismatch { .. } => StatusCode::BAD_REQUEST,
            ProcessorError::UnknownTopic(_) => StatusCode::NOT_FOUND,
            ProcessorError::NegativeCount { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ProcessorError::Index(IndexError::NotFound(_)) => StatusCode::NOT_FOUND,
            ProcessorError::Index(
                IndexError::Conflict(_) | IndexError::VersionConflict { .. },
            ) => StatusCode::CONFLICT,
            ProcessorError::Index(e) if e.is_transient() => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ProcessorError::Index(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ProcessorError::Upstream(UpstreamError::NotFound(_)) => {
                StatusCode::NOT_FOUND
            }
            ProcessorError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ProcessorError {
    fn into_response(self) -> axum::response::Response {
        let body = Json(json!({
            "error": self.to_string(),
            "retryable": self.is_retryable(),
        }));
        (self.status(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_policy_follows_error_kind() {
        let validation = ProcessorError::from(ValidationError::Required("topic".into()));
        assert!(!validation.is_retryable());

        let raced = ProcessorError::from(IndexError::VersionConflict {
            id: "c1".into(),
            expected: "seq_no=1 primary_term=1".into(),
        });
        assert!(raced.is_retryable());
        assert_eq!(raced.status(), StatusCode::CONFLICT);

        let timeout = ProcessorError::from(UpstreamError::Timeout("http://up".into()));
        assert!(timeout.is_retryable());
        assert_eq!(timeout.status(), StatusCode::BAD_GATEWAY);

        let unknown = ProcessorError::UnknownTopic("x".into());
        assert!(!unknown.is_retryable());
        assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn missing_document_is_not_found() {
        let err = ProcessorError::from(IndexError::NotFound("c1".into()));
        assert!(err.is_not_found());
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }
}
