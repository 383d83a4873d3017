// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Measurement Data API: RIS measurement access and DICOM anonymization.
//!
//! This crate provides the HTTP API over the RIS referral database, the
//! PACS-backed anonymization endpoints, and the `anonym` batch tool.

pub mod config;
pub mod db;
pub mod dicom;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use db::ReferralRepository;
use services::{AnonymizerEngine, PacsClient};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Arc<dyn ReferralRepository>,
    pub anonymizer: Arc<AnonymizerEngine>,
    pub pacs: PacsClient,
}
