// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! On-the-fly anonymization of PACS studies.

use crate::error::{AppError, Result};
use crate::services::anonymizer::AnonymizerEngine;
use crate::services::pacs::{
    first_value, ANONYMIZER_KEY_HEADER, SERIES_INSTANCE_UID_KEY, SOP_INSTANCE_UID_KEY,
};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use futures_util::{stream, StreamExt};
use serde_json::Value;
use std::io::{Cursor, Write};
use std::sync::Arc;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const IOT_TOKEN_HEADER: &str = "X-IOT-Token";

const MAX_CONCURRENT_FETCHES: usize = 8;

/// Anonymization routes. Each handler checks its own header credentials.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/anonymize/{study}", get(anonymize_study))
        .route(
            "/anonymize/{study}/{series}/{instance}",
            get(anonymize_by_index),
        )
}

fn header_value(headers: &HeaderMap, name: &'static str) -> Result<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or(AppError::MissingHeader(name))
}

/// Download, anonymize and zip every instance of a study.
async fn anonymize_study(
    State(state): State<Arc<AppState>>,
    Path(study_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response> {
    let token = header_value(&headers, IOT_TOKEN_HEADER)?;
    let proxy = state
        .config
        .pacs_proxy_url
        .as_deref()
        .ok_or(AppError::NotConfigured("PACS_PROXY_URL"))?;

    let instances = state
        .pacs
        .list_study_instances(proxy, &study_id, &token)
        .await?;
    tracing::info!(study_id = %study_id, instances = instances.len(), "Anonymizing study");

    let targets: Vec<(String, String)> = instances
        .iter()
        .map(|instance| {
            (
                first_value(instance, SERIES_INSTANCE_UID_KEY),
                first_value(instance, SOP_INSTANCE_UID_KEY),
            )
        })
        .collect();

    let pacs = &state.pacs;
    let study = study_id.as_str();
    let token = token.as_str();
    let downloads: Vec<Option<Vec<u8>>> = stream::iter(targets)
        .map(|(series_uid, instance_uid)| async move {
            match pacs
                .fetch_instance(proxy, study, &series_uid, &instance_uid, token)
                .await
            {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::warn!(instance_uid = %instance_uid, error = %e, "Skipping instance");
                    None
                }
            }
        })
        .buffered(MAX_CONCURRENT_FETCHES)
        .collect()
        .await;

    let engine = state.anonymizer.clone();
    let archive = tokio::task::spawn_blocking(move || build_archive(&engine, downloads))
        .await
        .map_err(|e| AppError::Internal(e.into()))??;

    Ok((
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=study_{}.zip", study_id),
            ),
        ],
        archive,
    )
        .into_response())
}

/// Zip anonymized instances as `instance_<idx>.dcm`, keeping listing indexes.
fn build_archive(engine: &AnonymizerEngine, downloads: Vec<Option<Vec<u8>>>) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (idx, data) in downloads.into_iter().enumerate() {
        let Some(data) = data else {
            continue;
        };
        let anonymized = match engine.anonymize_bytes(&data) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(index = idx, error = %e, "Skipping unreadable instance");
                continue;
            }
        };
        zip.start_file(format!("instance_{}.dcm", idx), options)
            .map_err(|e| AppError::Internal(e.into()))?;
        zip.write_all(&anonymized)
            .map_err(|e| AppError::Internal(e.into()))?;
    }

    let cursor = zip.finish().map_err(|e| AppError::Internal(e.into()))?;
    Ok(cursor.into_inner())
}

/// Anonymize one instance addressed by RIS study index and 1-based
/// series/instance positions.
async fn anonymize_by_index(
    State(state): State<Arc<AppState>>,
    Path((study_idx, series_idx, instance_idx)): Path<(u32, u32, u32)>,
    headers: HeaderMap,
) -> Result<Response> {
    let key = header_value(&headers, ANONYMIZER_KEY_HEADER)?;

    let config = &state.config;
    // The RIS validates the forwarded key; it only has to be configured here.
    config
        .anonymizer_api_key
        .as_deref()
        .ok_or(AppError::NotConfigured("ANONYMIZER_API_KEY"))?;
    let ris = config
        .ris_api_url
        .as_deref()
        .ok_or(AppError::NotConfigured("RIS_API_URL"))?;
    let proxy = config
        .pacs_proxy_url
        .as_deref()
        .ok_or(AppError::NotConfigured("PACS_PROXY_URL"))?;

    let study = state.pacs.resolve_study(ris, study_idx, &key).await?;

    let series = state
        .pacs
        .list_series(proxy, &study.study_uid, &study.token)
        .await?;
    let series_uid = nth_value(&series, series_idx, SERIES_INSTANCE_UID_KEY)
        .ok_or_else(|| AppError::NotFound(format!("Series {} not found", series_idx)))?;

    let instances = state
        .pacs
        .list_series_instances(proxy, &study.study_uid, &series_uid, &study.token)
        .await?;
    let instance_uid = nth_value(&instances, instance_idx, SOP_INSTANCE_UID_KEY)
        .ok_or_else(|| AppError::NotFound(format!("Instance {} not found", instance_idx)))?;

    let data = state
        .pacs
        .fetch_instance(proxy, &study.study_uid, &series_uid, &instance_uid, &study.token)
        .await?
        .ok_or_else(|| AppError::Pacs("Failed to download instance".to_string()))?;

    tracing::info!(
        study_idx,
        series_idx,
        instance_idx,
        "Anonymizing instance"
    );

    let engine = state.anonymizer.clone();
    let anonymized = tokio::task::spawn_blocking(move || engine.anonymize_bytes(&data))
        .await
        .map_err(|e| AppError::Internal(e.into()))??;

    Ok(([(header::CONTENT_TYPE, "application/dicom")], anonymized).into_response())
}

/// Attribute of the `position`-th (1-based) DICOMweb object.
fn nth_value(objects: &[Value], position: u32, key: &str) -> Option<String> {
    let index = usize::try_from(position).ok()?.checked_sub(1)?;
    objects.get(index).map(|object| first_value(object, key))
}
