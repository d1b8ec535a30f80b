// src/api/error.rs - HTTP error mapping
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::error::AnalysisError;
use crate::models::ModelError;
use crate::storage::StorageError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Download(StorageError),

    #[error("{0}")]
    Storage(StorageError),

    #[error("{0}")]
    Analysis(#[from] AnalysisError),

    #[error("{0}")]
    Model(ModelError),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Download(_) => StatusCode::BAD_GATEWAY,
            ApiError::Storage(_) | ApiError::Analysis(_) | ApiError::Model(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation_error",
            ApiError::Download(_) => "download_failed",
            ApiError::Storage(_) => "storage_error",
            ApiError::Analysis(_) => "analysis_failed",
            ApiError::Model(_) => "model_error",
            ApiError::Internal(_) => "internal_error",
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::DownloadFailed { .. } => ApiError::Download(e),
            other => ApiError::Storage(other),
        }
    }
}

impl From<ModelError> for ApiError {
    fn from(e: ModelError) -> Self {
        match e {
            ModelError::InvalidInput(msg) => ApiError::Validation(msg),
            other => ApiError::Model(other),
        }
    }
}

/// Malformed or incomplete request bodies are the caller's mistake.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }

        let body = ErrorResponse {
            error: self.kind(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_error_kind() {
        assert_eq!(ApiError::validation("x").status_code(), StatusCode::BAD_REQUEST);

        let download: ApiError = StorageError::download_failed("http://a", "404").into();
        assert_eq!(download.status_code(), StatusCode::BAD_GATEWAY);

        let upload: ApiError = StorageError::upload_failed("denied").into();
        assert_eq!(upload.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let analysis: ApiError = AnalysisError::detector("helper exited").into();
        assert_eq!(analysis.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn invalid_model_input_is_a_validation_error() {
        let err: ApiError = ModelError::invalid_input("number_of_meals must be at least 1").into();
        assert!(matches!(err, ApiError::Validation(_)));
        assert_eq!(err.kind(), "validation_error");
    }
}
