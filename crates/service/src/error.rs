use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;
use serde::Serialize;

use common::model::RecordError;
use object_store::StoreError;

use crate::notify::NotifyError;

pub const NOT_FOUND_MESSAGE: &str = "Resource not found";
const IO_ERROR_MESSAGE: &str = "Service I/O error";
const SEND_FAILED_MESSAGE: &str = "Something went wrong sending message";

/// Body of every message-only response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, serde::Deserialize)]
pub struct Message {
    pub message: String,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Every way an escrow operation can be refused.
///
/// Failed ownership proofs are reported as [`ServiceError::NotFound`] so a
/// caller cannot tell a missing resource from one it may not see.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),
    #[error("resource not found")]
    NotFound,
    /// A not-found carrying its own message.
    #[error("{0}")]
    Missing(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("store error: {0}")]
    Storage(#[from] StoreError),
    #[error("stored record unreadable: {0}")]
    Record(#[from] RecordError),
    #[error("notification failed: {0}")]
    Notify(#[from] NotifyError),
}

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::NotFound | ServiceError::Missing(_) => StatusCode::NOT_FOUND,
            ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServiceError::Storage(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            ServiceError::Storage(_) | ServiceError::Record(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ServiceError::Notify(NotifyError::Rejected(_)) => StatusCode::BAD_REQUEST,
            ServiceError::Notify(NotifyError::Transport(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            ServiceError::Validation(msg)
            | ServiceError::Missing(msg)
            | ServiceError::Forbidden(msg) => msg.clone(),
            ServiceError::NotFound | ServiceError::Storage(StoreError::NotFound(_)) => {
                NOT_FOUND_MESSAGE.to_string()
            }
            ServiceError::Storage(_) | ServiceError::Record(_) => IO_ERROR_MESSAGE.to_string(),
            ServiceError::Notify(_) => SEND_FAILED_MESSAGE.to_string(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(Message::new(self.message()))).into_response()
    }
}
