// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! PostgreSQL-backed referral repository.

use crate::config::DatabaseConfig;
use crate::db::{tables, ReferralRepository};
use crate::error::AppError;
use crate::models::{Referral, ReferralSummary, StudyDescription};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_postgres::{NoTls, Row};

/// PostgreSQL database client.
#[derive(Clone)]
pub struct PostgresDb {
    client: Arc<tokio_postgres::Client>,
}

impl PostgresDb {
    /// Connect and spawn the connection driver task.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, AppError> {
        let (client, connection) = tokio_postgres::Config::new()
            .user(&config.user)
            .password(&config.password)
            .dbname(&config.name)
            .host(&config.host)
            .port(config.port)
            .connect(NoTls)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to PostgreSQL: {}", e)))?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!(error = %e, "PostgreSQL connection error");
            }
        });

        tracing::info!(
            host = %config.host,
            database = %config.name,
            "Connected to PostgreSQL"
        );

        Ok(Self {
            client: Arc::new(client),
        })
    }

    /// Attach study descriptions to referrals, ordered by description id.
    async fn with_descriptions(
        &self,
        mut referrals: Vec<Referral>,
    ) -> Result<Vec<Referral>, AppError> {
        if referrals.is_empty() {
            return Ok(referrals);
        }

        let ids: Vec<i32> = referrals.iter().map(|r| r.id).collect();
        let query = format!(
            "SELECT id, referral_id, measurements, description \
             FROM {} WHERE referral_id = ANY($1) ORDER BY id",
            tables::STUDY_DESCRIPTIONS
        );
        let rows = self
            .client
            .query(query.as_str(), &[&ids])
            .await
            .map_err(db_error)?;

        let mut by_referral: HashMap<i32, Vec<StudyDescription>> = HashMap::new();
        for row in &rows {
            let description = description_from_row(row).map_err(db_error)?;
            by_referral
                .entry(description.referral_id)
                .or_default()
                .push(description);
        }

        for referral in &mut referrals {
            referral.descriptions = by_referral.remove(&referral.id).unwrap_or_default();
        }
        Ok(referrals)
    }

    async fn query_referrals(
        &self,
        column: &str,
        value: &str,
        limit: Option<i64>,
    ) -> Result<Vec<Referral>, AppError> {
        let mut query = format!(
            "SELECT id, COALESCE(study_id, '') AS study_id, COALESCE(patient_id, '') AS patient_id, \
             patient_firstname, patient_lastname, COALESCE(status, 0) AS status \
             FROM {} WHERE {} = $1 ORDER BY id",
            tables::REFERRALS,
            column
        );
        if let Some(limit) = limit {
            query.push_str(&format!(" LIMIT {}", limit));
        }

        let rows = self
            .client
            .query(query.as_str(), &[&value])
            .await
            .map_err(db_error)?;

        let referrals = rows
            .iter()
            .map(referral_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_error)?;
        self.with_descriptions(referrals).await
    }
}

#[async_trait]
impl ReferralRepository for PostgresDb {
    async fn list_referrals(
        &self,
        status: i32,
        skip: u32,
        limit: u32,
    ) -> Result<Vec<ReferralSummary>, AppError> {
        let query = format!(
            "SELECT r.id, COALESCE(r.study_id, '') AS study_id, \
             COALESCE(r.patient_id, '') AS patient_id, \
             (SELECT COUNT(*) FROM {descriptions} d WHERE d.referral_id = r.id) AS description_count \
             FROM {referrals} r WHERE r.status = $1 \
             ORDER BY r.id DESC OFFSET $2 LIMIT $3",
            descriptions = tables::STUDY_DESCRIPTIONS,
            referrals = tables::REFERRALS
        );

        let rows = self
            .client
            .query(query.as_str(), &[&status, &i64::from(skip), &i64::from(limit)])
            .await
            .map_err(db_error)?;

        rows.iter()
            .map(|row| {
                Ok(ReferralSummary {
                    id: row.try_get("id")?,
                    study_id: row.try_get("study_id")?,
                    patient_id: row.try_get("patient_id")?,
                    description_count: row.try_get("description_count")?,
                })
            })
            .collect::<Result<Vec<_>, tokio_postgres::Error>>()
            .map_err(db_error)
    }

    async fn get_referral_by_study_id(
        &self,
        study_id: &str,
    ) -> Result<Option<Referral>, AppError> {
        let referrals = self.query_referrals("study_id", study_id, Some(1)).await?;
        Ok(referrals.into_iter().next())
    }

    async fn get_referrals_by_patient_id(
        &self,
        patient_id: &str,
    ) -> Result<Vec<Referral>, AppError> {
        self.query_referrals("patient_id", patient_id, None).await
    }
}

fn referral_from_row(row: &Row) -> Result<Referral, tokio_postgres::Error> {
    Ok(Referral {
        id: row.try_get("id")?,
        study_id: row.try_get("study_id")?,
        patient_id: row.try_get("patient_id")?,
        patient_firstname: row.try_get("patient_firstname")?,
        patient_lastname: row.try_get("patient_lastname")?,
        status: row.try_get("status")?,
        descriptions: Vec::new(),
    })
}

fn description_from_row(row: &Row) -> Result<StudyDescription, tokio_postgres::Error> {
    let measurements: Option<Value> = row.try_get("measurements")?;
    Ok(StudyDescription {
        id: row.try_get("id")?,
        referral_id: row.try_get("referral_id")?,
        measurements: measurements.unwrap_or(Value::Null),
        description: row.try_get("description")?,
    })
}

fn db_error(e: tokio_postgres::Error) -> AppError {
    AppError::Database(e.to_string())
}
