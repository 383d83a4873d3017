// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Patient lookup routes.

use crate::error::{AppError, Result};
use crate::models::{MeasurementResponse, PatientDataResponse};
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use std::sync::Arc;

/// Patient routes. These return identifying data and sit behind the API key.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/patient/{patient_id}", get(read_patient_data))
}

async fn read_patient_data(
    State(state): State<Arc<AppState>>,
    Path(patient_id): Path<String>,
) -> Result<Json<Vec<PatientDataResponse>>> {
    let referrals = state.db.get_referrals_by_patient_id(&patient_id).await?;
    if referrals.is_empty() {
        return Err(AppError::NotFound("Patient not found".to_string()));
    }

    let results = referrals
        .into_iter()
        .map(|referral| PatientDataResponse {
            referral_id: referral.id,
            patient_id: referral.patient_id,
            first_name: referral.patient_firstname,
            last_name: referral.patient_lastname,
            study_data: referral
                .descriptions
                .into_iter()
                .map(|d| MeasurementResponse {
                    description_id: d.id,
                    description_text: d.description,
                    measurements: d.measurements,
                })
                .collect(),
        })
        .collect();

    Ok(Json(results))
}
