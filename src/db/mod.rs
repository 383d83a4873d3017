//! Database layer (RIS PostgreSQL).

pub mod memory;
pub mod postgres;

pub use memory::MemoryDb;
pub use postgres::PostgresDb;

use crate::error::AppError;
use crate::models::{Referral, ReferralSummary};
use async_trait::async_trait;

/// Table names as constants.
pub mod tables {
    pub const REFERRALS: &str = "ris_referral";
    pub const STUDY_DESCRIPTIONS: &str = "ris_studydescription";
}

/// Read access to RIS referrals.
#[async_trait]
pub trait ReferralRepository: Send + Sync {
    /// Referrals with `status`, newest first.
    async fn list_referrals(
        &self,
        status: i32,
        skip: u32,
        limit: u32,
    ) -> Result<Vec<ReferralSummary>, AppError>;

    /// First referral for a StudyInstanceUID, with descriptions.
    async fn get_referral_by_study_id(&self, study_id: &str)
        -> Result<Option<Referral>, AppError>;

    /// All referrals of a patient, with descriptions.
    async fn get_referrals_by_patient_id(&self, patient_id: &str)
        -> Result<Vec<Referral>, AppError>;
}
