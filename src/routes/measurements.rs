// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Signed-study measurement routes.

use crate::error::{AppError, Result};
use crate::models::{measurements_or_empty, SimpleStudyResponse, StudySummary, STATUS_SIGNED};
use crate::services::hashing::hash_patient_id;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use validator::Validate;

pub const DEFAULT_LIMIT: u32 = 25;
pub const MAX_LIMIT: u32 = 1000;

/// Measurement routes (require API key via routes/mod.rs).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/measurements", get(list_measurements))
        .route("/measurements/", get(list_measurements))
        .route("/measurements/{study_id}", get(get_measurement_details))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ListQuery {
    #[serde(default)]
    pub skip: u32,
    #[serde(default = "default_limit")]
    #[validate(range(max = 1000))]
    pub limit: u32,
}

fn default_limit() -> u32 {
    DEFAULT_LIMIT
}

/// List signed studies that have at least one study description.
async fn list_measurements(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListQuery>,
) -> Result<Json<Vec<StudySummary>>> {
    params.validate().map_err(|_| {
        AppError::BadRequest(format!("limit must be at most {}", MAX_LIMIT))
    })?;

    let referrals = state
        .db
        .list_referrals(STATUS_SIGNED, params.skip, params.limit)
        .await?;

    // Filtering after pagination can return short pages.
    let results: Vec<StudySummary> = referrals
        .into_iter()
        .filter(|r| r.description_count > 0)
        .map(|r| StudySummary {
            referral_id: r.id,
            patient_id: hash_patient_id(&r.patient_id, &state.config.secret_pepper),
            study_id: r.study_id,
        })
        .collect();

    tracing::debug!(
        skip = params.skip,
        limit = params.limit,
        returned = results.len(),
        "Listed signed studies"
    );
    Ok(Json(results))
}

/// Measurements of every study description for a StudyInstanceUID.
async fn get_measurement_details(
    State(state): State<Arc<AppState>>,
    Path(study_id): Path<String>,
) -> Result<Json<Vec<SimpleStudyResponse>>> {
    let referral = state
        .db
        .get_referral_by_study_id(&study_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Study ID not found".to_string()))?;

    let patient_id = hash_patient_id(&referral.patient_id, &state.config.secret_pepper);

    if referral.descriptions.is_empty() {
        return Ok(Json(vec![SimpleStudyResponse {
            patient_id,
            measurements: Value::Array(Vec::new()),
        }]));
    }

    Ok(Json(
        referral
            .descriptions
            .iter()
            .map(|d| SimpleStudyResponse {
                patient_id: patient_id.clone(),
                measurements: measurements_or_empty(&d.measurements),
            })
            .collect(),
    ))
}
