// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! API response shapes for measurement and patient endpoints.

use serde::Serialize;
use serde_json::Value;

/// Entry in the signed-study listing.
#[derive(Debug, Clone, Serialize)]
pub struct StudySummary {
    pub referral_id: i32,
    pub study_id: String,
    /// Peppered hash of the patient identifier
    pub patient_id: String,
}

/// Measurements of one study description.
#[derive(Debug, Clone, Serialize)]
pub struct SimpleStudyResponse {
    pub patient_id: String,
    pub measurements: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct MeasurementResponse {
    pub description_id: i32,
    pub description_text: Option<String>,
    pub measurements: Value,
}

/// All studies of one patient, with identifying data.
#[derive(Debug, Clone, Serialize)]
pub struct PatientDataResponse {
    pub referral_id: i32,
    pub patient_id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub study_data: Vec<MeasurementResponse>,
}

/// Measurement JSON with every falsy value normalised to `[]`.
pub fn measurements_or_empty(value: &Value) -> Value {
    let falsy = match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    };
    if falsy {
        Value::Array(Vec::new())
    } else {
        value.clone()
    }
}
