use axum::{
    response::{IntoResponse, Response},
    http::StatusCode,
};
use serde_json::json;
use axum::Json;
use thiserror::Error;

use crate::services::excel::DecodeError;
use crate::services::store::StoreError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Please select a valid Excel or CSV file. Unsupported file: {0}")]
    UnsupportedExtension(String),
    #[error("Failed to parse file: {0}")]
    Decode(#[from] DecodeError),
    #[error("Failed to read the file: {0}")]
    Read(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("File of {size} bytes exceeds the {limit} byte limit")]
    FileTooLarge { size: usize, limit: usize },
    #[error("Authentication required")]
    Unauthorized,
    #[error("Not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::UnsupportedExtension(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            AppError::Decode(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Read(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::FileTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Store(StoreError::MissingField(_)) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{}", self);
        } else {
            tracing::warn!("{}", self);
        }

        let body = Json(json!({
            "success": false,
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}
