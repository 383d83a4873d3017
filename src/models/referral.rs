// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! RIS referral records.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Referral status for a signed (reported) study.
pub const STATUS_SIGNED: i32 = 7;

/// A row of `ris_referral` with its study descriptions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Referral {
    /// Primary key
    pub id: i32,
    /// StudyInstanceUID
    pub study_id: String,
    /// Hospital patient identifier (not pseudonymised)
    pub patient_id: String,
    pub patient_firstname: Option<String>,
    pub patient_lastname: Option<String>,
    pub status: i32,
    /// Study descriptions ordered by id
    #[serde(default)]
    pub descriptions: Vec<StudyDescription>,
}

/// A row of `ris_studydescription`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyDescription {
    pub id: i32,
    pub referral_id: i32,
    /// Measurement JSON as written by the RIS
    pub measurements: Value,
    pub description: Option<String>,
}

/// Lightweight referral listing entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferralSummary {
    pub id: i32,
    pub study_id: String,
    pub patient_id: String,
    /// Number of study descriptions attached to the referral
    pub description_count: i64,
}
