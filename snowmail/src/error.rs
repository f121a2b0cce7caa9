//! Error taxonomy shared by the gateways, the pipeline and the HTTP layer.

use std::fmt;

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// The pipeline stage an upstream failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Moderation,
    Rewrite,
    ThreatDetection,
    LinkExtraction,
    Delivery,
    Bookmark,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Moderation => "moderation",
            Stage::Rewrite => "rewrite",
            Stage::ThreatDetection => "threat detection",
            Stage::LinkExtraction => "link extraction",
            Stage::Delivery => "delivery",
            Stage::Bookmark => "bookmark",
        };
        f.write_str(name)
    }
}

/// Failure talking to an upstream HTTP service.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upstream returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected upstream response: {0}")]
    UnexpectedResponse(String),
}

/// Errors surfaced by gateway and pipeline operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The endpoint is switched off by configuration, or does not exist.
    #[error("endpoint not found")]
    Disabled,

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("webhook signature verification failed")]
    Authentication,

    #[error("{stage} failed: {source}")]
    Dependency {
        stage: Stage,
        #[source]
        source: ClientError,
    },
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }

    pub fn dependency(stage: Stage, source: ClientError) -> Self {
        Error::Dependency { stage, source }
    }

    /// Shorthand for a well-formed HTTP exchange whose payload was unusable.
    pub fn unexpected(stage: Stage, detail: impl Into<String>) -> Self {
        Error::Dependency {
            stage,
            source: ClientError::UnexpectedResponse(detail.into()),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Disabled => StatusCode::NOT_FOUND,
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::Authentication => StatusCode::UNAUTHORIZED,
            Error::Dependency { .. } => StatusCode::BAD_GATEWAY,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Malformed, mistyped or unreadable JSON bodies are validation failures.
impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Error::Validation(rejection.body_text())
    }
}

/// JSON error body returned to direct callers.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub error: String,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::Disabled => "not_found",
            Error::Validation(_) => "invalid_request",
            Error::Authentication => "unauthorized",
            Error::Dependency { .. } => "upstream_error",
        };

        (
            self.status_code(),
            Json(ErrorResponse {
                status,
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(Error::Disabled.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(Error::validation("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(Error::Authentication.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            Error::unexpected(Stage::Rewrite, "no choices").status_code(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_dependency_message_names_stage() {
        let err = Error::unexpected(Stage::Moderation, "empty results");
        assert_eq!(
            err.to_string(),
            "moderation failed: unexpected upstream response: empty results"
        );

        let err = Error::dependency(
            Stage::LinkExtraction,
            ClientError::Status {
                status: 500,
                body: "boom".to_string(),
            },
        );
        assert!(err.to_string().starts_with("link extraction failed"));
    }
}
