// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory referral repository for tests and local runs.

use crate::db::ReferralRepository;
use crate::error::AppError;
use crate::models::{Referral, ReferralSummary};
use async_trait::async_trait;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct MemoryDb {
    referrals: RwLock<Vec<Referral>>,
}

impl MemoryDb {
    pub fn with_referrals(referrals: Vec<Referral>) -> Self {
        Self {
            referrals: RwLock::new(referrals),
        }
    }

    pub async fn insert(&self, referral: Referral) {
        self.referrals.write().await.push(referral);
    }

    fn sorted(mut referral: Referral) -> Referral {
        referral.descriptions.sort_by_key(|d| d.id);
        referral
    }
}

#[async_trait]
impl ReferralRepository for MemoryDb {
    async fn list_referrals(
        &self,
        status: i32,
        skip: u32,
        limit: u32,
    ) -> Result<Vec<ReferralSummary>, AppError> {
        let referrals = self.referrals.read().await;
        let mut matching: Vec<&Referral> =
            referrals.iter().filter(|r| r.status == status).collect();
        matching.sort_by(|a, b| b.id.cmp(&a.id));

        Ok(matching
            .into_iter()
            .skip(skip as usize)
            .take(limit as usize)
            .map(|r| ReferralSummary {
                id: r.id,
                study_id: r.study_id.clone(),
                patient_id: r.patient_id.clone(),
                description_count: r.descriptions.len() as i64,
            })
            .collect())
    }

    async fn get_referral_by_study_id(
        &self,
        study_id: &str,
    ) -> Result<Option<Referral>, AppError> {
        let referrals = self.referrals.read().await;
        Ok(referrals
            .iter()
            .filter(|r| r.study_id == study_id)
            .min_by_key(|r| r.id)
            .cloned()
            .map(Self::sorted))
    }

    async fn get_referrals_by_patient_id(
        &self,
        patient_id: &str,
    ) -> Result<Vec<Referral>, AppError> {
        let referrals = self.referrals.read().await;
        let mut matching: Vec<Referral> = referrals
            .iter()
            .filter(|r| r.patient_id == patient_id)
            .cloned()
            .map(Self::sorted)
            .collect();
        matching.sort_by_key(|r| r.id);
        Ok(matching)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StudyDescription;
    use serde_json::json;

    fn referral(id: i32, status: i32, descriptions: usize) -> Referral {
        Referral {
            id,
            study_id: format!("1.2.{}", id),
            patient_id: format!("P{}", id % 2),
            patient_firstname: None,
            patient_lastname: None,
            status,
            descriptions: (0..descriptions)
                .map(|i| StudyDescription {
                    id: 100 - i as i32,
                    referral_id: id,
                    measurements: json!([]),
                    description: None,
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_list_filters_orders_and_paginates() {
        let db = MemoryDb::with_referrals((1..=6).map(|id| referral(id, 7, 1)).collect());
        db.insert(referral(7, 3, 1)).await;

        let page = db.list_referrals(7, 1, 2).await.unwrap();
        let ids: Vec<i32> = page.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![5, 4]);
    }

    #[tokio::test]
    async fn test_descriptions_are_ordered_by_id() {
        let db = MemoryDb::with_referrals(vec![referral(1, 7, 3)]);
        let found = db.get_referral_by_study_id("1.2.1").await.unwrap().unwrap();
        let ids: Vec<i32> = found.descriptions.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![98, 99, 100]);

        assert!(db.get_referral_by_study_id("9.9").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_by_patient() {
        let db = MemoryDb::with_referrals((1..=4).map(|id| referral(id, 7, 0)).collect());
        let found = db.get_referrals_by_patient_id("P1").await.unwrap();
        let ids: Vec<i32> = found.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }
}
