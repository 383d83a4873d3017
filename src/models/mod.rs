// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod measurement;
pub mod referral;

pub use measurement::{
    measurements_or_empty, MeasurementResponse, PatientDataResponse, SimpleStudyResponse,
    StudySummary,
};
pub use referral::{Referral, ReferralSummary, StudyDescription, STATUS_SIGNED};
