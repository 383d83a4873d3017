// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use crate::dicom::DicomError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Missing {0} header")]
    MissingHeader(&'static str),

    #[error("Could not validate credentials")]
    InvalidApiKey,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("{0} not configured")]
    NotConfigured(&'static str),

    #[error("Upstream error ({status}): {message}")]
    Upstream { status: StatusCode, message: String },

    #[error("PACS error: {0}")]
    Pacs(String),

    #[error("Invalid DICOM: {0}")]
    Dicom(#[from] DicomError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::MissingHeader(_) => {
                (StatusCode::UNAUTHORIZED, "missing_header", Some(self.to_string()))
            }
            AppError::InvalidApiKey => {
                (StatusCode::UNAUTHORIZED, "unauthorized", Some(self.to_string()))
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::NotConfigured(_) => {
                tracing::error!(error = %self, "Server misconfiguration");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "not_configured",
                    Some(self.to_string()),
                )
            }
            AppError::Upstream { status, message } => {
                tracing::warn!(status = %status, error = %message, "Upstream request failed");
                (*status, "upstream_error", Some(message.clone()))
            }
            AppError::Pacs(msg) => {
                tracing::warn!(error = %msg, "PACS request failed");
                (StatusCode::BAD_GATEWAY, "pacs_error", Some(msg.clone()))
            }
            AppError::Dicom(err) => {
                (StatusCode::BAD_GATEWAY, "invalid_dicom", Some(err.to_string()))
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
