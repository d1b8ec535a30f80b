// src/api/extract.rs - Request body extraction
use axum::extract::FromRequest;

use super::error::ApiError;

/// `axum::Json` whose rejections answer with the service's error body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct AppJson<T>(pub T);
