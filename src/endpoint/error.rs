use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::types::{ErrorDetail, ErrorResponse};
use crate::RuleError;

/// Why a resolution request was not answered with a decision.
#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("resource type mismatch: expected '{expected}', got '{actual}'")]
    ResourceTypeMismatch { expected: String, actual: String },

    #[error("resource '{resource_ref}' not found")]
    ResourceNotFound { resource_ref: String },

    #[error("malformed criteria: {0}")]
    MalformedCriteria(String),

    #[error(transparent)]
    Rule(#[from] RuleError),

    #[error("failed to fetch resource: {0:#}")]
    FetchFailed(anyhow::Error),
}

impl ResolutionError {
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ResourceTypeMismatch { .. }
            | Self::ResourceNotFound { .. }
            | Self::MalformedCriteria(_)
            | Self::Rule(RuleError::InvalidParams { .. } | RuleError::ReservedName { .. }) => {
                StatusCode::BAD_REQUEST
            }
            Self::Rule(RuleError::UnknownRule { .. } | RuleError::DuplicateRule { .. })
            | Self::FetchFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ResourceTypeMismatch { .. } => "RESOURCE_TYPE_MISMATCH",
            Self::ResourceNotFound { .. } => "RESOURCE_NOT_FOUND",
            Self::MalformedCriteria(_) => "MALFORMED_CRITERIA",
            Self::Rule(RuleError::InvalidParams { .. }) => "INVALID_PARAMS",
            Self::Rule(RuleError::UnknownRule { .. }) => "UNKNOWN_RULE",
            Self::Rule(RuleError::ReservedName { .. }) => "MALFORMED_CRITERIA",
            Self::Rule(RuleError::DuplicateRule { .. }) => "INTERNAL_ERROR",
            Self::FetchFailed(_) => "FETCH_FAILED",
        }
    }
}

impl IntoResponse for ResolutionError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Collaborator failures are logged in full and answered generically.
        let message = match &self {
            Self::FetchFailed(err) => {
                tracing::error!(error = %format!("{err:#}"), "resource fetch failed");
                "internal error while fetching the resource".to_owned()
            }
            other => {
                tracing::warn!(code = other.error_code(), error = %other, "rejected resolution request");
                other.to_string()
            }
        };

        let body = ErrorResponse {
            error: ErrorDetail {
                code: self.error_code().to_owned(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}
