// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP mapping of application errors.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use measurement_api::dicom::DicomError;
use measurement_api::error::AppError;
use serde_json::{json, Value};

mod common;

async fn render(err: AppError) -> (StatusCode, Value) {
    let response = err.into_response();
    let status = response.status();
    (status, common::body_json(response).await)
}

#[tokio::test]
async fn test_client_errors_carry_details() {
    let (status, body) = render(AppError::MissingHeader("X-IOT-Token")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        body,
        json!({"error": "missing_header", "details": "Missing X-IOT-Token header"})
    );

    let (status, body) = render(AppError::InvalidApiKey).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["details"], "Could not validate credentials");

    let (status, body) = render(AppError::NotFound("Study ID not found".to_string())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "not_found", "details": "Study ID not found"}));

    let (status, body) = render(AppError::BadRequest("limit".to_string())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn test_upstream_status_is_passed_through() {
    let (status, body) = render(AppError::Upstream {
        status: StatusCode::FORBIDDEN,
        message: "Failed to find study in RIS".to_string(),
    })
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body,
        json!({"error": "upstream_error", "details": "Failed to find study in RIS"})
    );

    let (status, body) = render(AppError::Pacs("HTTP 500: boom".to_string())).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "pacs_error");

    let (status, body) = render(AppError::from(DicomError::NotDicom)).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "invalid_dicom");
}

#[tokio::test]
async fn test_server_errors_hide_internals() {
    let (status, body) = render(AppError::Database("password authentication failed".into())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "database_error"}));

    let (status, body) = render(AppError::Internal(anyhow::anyhow!("secret detail"))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "internal_error"}));

    let (status, body) = render(AppError::NotConfigured("PACS_PROXY_URL")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body,
        json!({"error": "not_configured", "details": "PACS_PROXY_URL not configured"})
    );
}
