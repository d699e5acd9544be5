use crate::store::StoreError;
use crate::vapi::GatewayError;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// What a request handler can fail with.  Each variant maps to one HTTP status.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required field is missing or the body is malformed (400).
    #[error("{0}")]
    Validation(String),

    /// Unknown local id (404).
    #[error("{0}")]
    NotFound(String),

    /// The provider rejected a call; its status and message are passed through.
    #[error("{message}")]
    Remote { status: StatusCode, message: String },

    /// Anything else (500).  `context` names the operation that failed.
    #[error("{context}: {details}")]
    Failure {
        context: &'static str,
        details: String,
    },
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        AppError::NotFound(message.into())
    }

    /// Name the operation on generic failures; other variants are left as they are.
    pub fn during(self, operation: &'static str) -> Self {
        match self {
            AppError::Failure { details, .. } => AppError::Failure {
                context: operation,
                details,
            },
            other => other,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Remote { status, .. } => *status,
            AppError::Failure { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<GatewayError> for AppError {
    fn from(e: GatewayError) -> Self {
        match e {
            GatewayError::Provider { status, message } => AppError::Remote { status, message },
            other => AppError::Failure {
                context: "Remote provider call failed",
                details: other.to_string(),
            },
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        AppError::Failure {
            context: "Local store operation failed",
            details: e.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            AppError::Validation(message) | AppError::NotFound(message) => {
                json!({ "error": message })
            }
            AppError::Remote { message, .. } => json!({ "error": message }),
            AppError::Failure { context, details } => {
                json!({ "error": context, "details": details })
            }
        };
        if status.is_server_error() {
            error!(error=%self, %status, "request failed");
        }
        (status, Json(body)).into_response()
    }
}

pub async fn handle_error(e: impl std::error::Error) {
    error!("ERROR: {e}")
}
