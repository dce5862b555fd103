use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Bad request: {message}")]
    BadRequest {
        message: String,
        details: Option<String>,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Too many requests: {0}")]
    TooManyRequests(String, Option<u64>),

    /// The upstream provider refused the call because its own quota ran out.
    #[error("Upstream quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Upstream failure: {message}")]
    UpstreamFailure {
        message: String,
        details: Option<String>,
    },

    #[error("Not implemented: {message}")]
    NotImplemented {
        message: String,
        details: Option<String>,
    },

    #[error("Internal server error: {0}")]
    InternalError(#[from] anyhow::Error),

    #[error("Configuration error: {0}")]
    ConfigError(anyhow::Error),
}

impl AppError {
    pub fn bad_request(message: impl Into<String>, details: Option<String>) -> Self {
        AppError::BadRequest {
            message: message.into(),
            details,
        }
    }

    pub fn upstream(message: impl Into<String>, details: impl Into<String>) -> Self {
        AppError::UpstreamFailure {
            message: message.into(),
            details: Some(details.into()),
        }
    }

    pub fn config(err: impl Into<anyhow::Error>) -> Self {
        AppError::ConfigError(err.into())
    }

    /// Status code this error renders with.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::TooManyRequests(..) | AppError::QuotaExceeded(_) => {
                StatusCode::TOO_MANY_REQUESTS
            }
            AppError::NotImplemented { .. } => StatusCode::NOT_IMPLEMENTED,
            AppError::UpstreamFailure { .. }
            | AppError::InternalError(_)
            | AppError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(anyhow::Error::new(err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(anyhow::Error::new(err))
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let (error_message, details, retry_after) = match self {
            AppError::BadRequest { message, details } => (message, details, None),
            AppError::NotFound(path) => ("Not found".to_string(), Some(path), None),
            AppError::TooManyRequests(msg, retry) => (msg, None, retry),
            AppError::QuotaExceeded(guidance) => {
                ("API quota exceeded".to_string(), Some(guidance), None)
            }
            AppError::UpstreamFailure { message, details } => (message, details, None),
            AppError::NotImplemented { message, details } => (message, details, None),
            // Only the top-level message leaves the process; the chain is logged by callers.
            AppError::InternalError(err) => (
                "Internal server error".to_string(),
                Some(err.to_string()),
                None,
            ),
            AppError::ConfigError(err) => (
                "Server configuration error".to_string(),
                Some(err.to_string()),
                None,
            ),
        };

        let mut res = (
            status,
            Json(ErrorResponse {
                error: error_message,
                details,
            }),
        )
            .into_response();

        if let Some(retry) = retry_after {
            res.headers_mut()
                .insert(axum::http::header::RETRY_AFTER, retry.into());
        }

        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn render(err: AppError) -> (StatusCode, Option<String>, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let retry = response
            .headers()
            .get(axum::http::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, retry, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_bad_request_without_details_omits_field() {
        let (status, _, body) = render(AppError::bad_request("Invalid prompt", None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid prompt");
        assert!(body.get("details").is_none());
    }

    #[tokio::test]
    async fn test_too_many_requests_sets_retry_after() {
        let (status, retry, body) =
            render(AppError::TooManyRequests("slow down".to_string(), Some(42))).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(retry.as_deref(), Some("42"));
        assert_eq!(body["error"], "slow down");
    }

    #[tokio::test]
    async fn test_quota_exceeded_is_429_with_guidance() {
        let (status, retry, body) =
            render(AppError::QuotaExceeded("wait a bit".to_string())).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert!(retry.is_none());
        assert_eq!(body["error"], "API quota exceeded");
        assert_eq!(body["details"], "wait a bit");
    }

    #[tokio::test]
    async fn test_internal_error_hides_cause_chain() {
        let err = anyhow::anyhow!("root cause").context("outer context");
        let (status, _, body) = render(AppError::InternalError(err)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal server error");
        assert_eq!(body["details"], "outer context");
    }

    #[tokio::test]
    async fn test_not_implemented_status() {
        let err = AppError::NotImplemented {
            message: "nope".to_string(),
            details: None,
        };
        assert_eq!(err.status(), StatusCode::NOT_IMPLEMENTED);
    }
}
