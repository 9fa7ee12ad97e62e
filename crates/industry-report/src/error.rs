use std::path::PathBuf;
use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use report_common::error::CommonError;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Common(#[from] CommonError),

    #[error("config error: {0}")]
    Config(String),

    #[error("missing parameter: {0}")]
    MissingParameter(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("document not found: {}", .0.display())]
    DocumentNotFound(PathBuf),

    #[error("invalid document: {0}")]
    InvalidDocument(String),

    #[error("EV/EBITDA median not found in any table")]
    MetricNotFound,

    #[error("summarization failed for {topic}: {message}")]
    Summarization { topic: &'static str, message: String },

    #[error("summarization for {topic} timed out after {}s", .timeout.as_secs())]
    SummarizationTimeout {
        topic: &'static str,
        timeout: Duration,
    },

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MissingParameter(_) | AppError::InvalidParameter(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::DocumentNotFound(_) | AppError::MetricNotFound => StatusCode::NOT_FOUND,
            AppError::SummarizationTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            AppError::Common(_)
            | AppError::Config(_)
            | AppError::InvalidDocument(_)
            | AppError::Summarization { .. }
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message returned to HTTP clients in the `detail` field.
    pub fn detail(&self) -> String {
        match self {
            AppError::Summarization { message, .. } => format!("OpenAI API error: {message}"),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, status = status.as_u16(), "request failed");
        } else {
            tracing::warn!(error = %self, status = status.as_u16(), "request rejected");
        }
        (status, Json(json!({ "detail": self.detail() }))).into_response()
    }
}
