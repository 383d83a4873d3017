// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Measurement Data API Server
//!
//! Serves signed-study measurements from the RIS database and anonymized
//! DICOM studies pulled from the PACS proxy.

use measurement_api::{
    config::Config,
    db::PostgresDb,
    services::{AnonymizerEngine, PacsClient, Profile},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(host = %config.host, port = config.port, "Starting Measurement Data API");
    config.warn_insecure_defaults();

    // Connect to the RIS database
    let db = PostgresDb::connect(&config.database)
        .await
        .expect("Failed to connect to PostgreSQL");

    // Load the anonymization profile
    let profile = Profile::load_or_builtin(&config.anonymizer_profile);
    tracing::info!(
        path = %config.anonymizer_profile,
        rules = profile.len(),
        "Anonymization profile loaded"
    );
    let anonymizer = Arc::new(AnonymizerEngine::new(profile, config.pepper.clone()));

    let pacs = PacsClient::new(config.upstream_timeout).expect("Failed to build HTTP client");

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        db: Arc::new(db),
        anonymizer,
        pacs,
    });

    // Build router
    let app = measurement_api::routes::create_router(state);

    // Start server
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("measurement_api=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
