// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! API error taxonomy
//!
//! Every failure class gets its own variant, translated to an HTTP status
//! at the boundary. Error bodies are `{"detail": "..."}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// JSON body returned on every error path
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub detail: String,
}

#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The detection model failed to load at startup
    #[error("Detection model is not available: {0}")]
    ModelUnavailable(String),

    /// Malformed multipart upload or missing file field
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The uploaded bytes could not be decoded as an image
    #[error("Image processing error: {0}")]
    InvalidImage(String),

    /// Unexpected failure inside the model call
    #[error("Inference error: {0}")]
    InferenceFailed(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::ModelUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::InvalidRequest(_) | ApiError::InvalidImage(_) => StatusCode::BAD_REQUEST,
            ApiError::InferenceFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            detail: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
