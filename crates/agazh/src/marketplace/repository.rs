use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    Employer, EmployerId, HiringId, HiringRequest, HiringStatus, Housekeeper, HousekeeperId,
    HousekeeperUpdate, Review,
};

/// Stored housekeeper account: public profile plus credential hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HousekeeperRecord {
    pub profile: Housekeeper,
    pub password_hash: String,
}

/// Stored employer account: public profile plus credential hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmployerRecord {
    pub profile: Employer,
    pub password_hash: String,
}

/// Storage abstraction so the service can be exercised in isolation.
///
/// Implementations own uniqueness of e-mail addresses per account kind and
/// report a duplicate as [`RepositoryError::Conflict`]. Methods that change
/// part of a stored record do the check and the write as one step, so
/// concurrent callers never write back stale copies.
pub trait MarketplaceRepository: Send + Sync {
    fn insert_housekeeper(&self, record: HousekeeperRecord) -> Result<(), RepositoryError>;
    fn fetch_housekeeper(
        &self,
        id: &HousekeeperId,
    ) -> Result<Option<HousekeeperRecord>, RepositoryError>;
    fn find_housekeeper_by_email(
        &self,
        email: &str,
    ) -> Result<Option<HousekeeperRecord>, RepositoryError>;
    /// Apply a partial update to the stored profile and return the result.
    fn apply_housekeeper_update(
        &self,
        id: &HousekeeperId,
        update: HousekeeperUpdate,
        at: DateTime<Utc>,
    ) -> Result<Housekeeper, RepositoryError>;
    fn delete_housekeeper(&self, id: &HousekeeperId) -> Result<(), RepositoryError>;
    fn list_housekeepers(&self) -> Result<Vec<HousekeeperRecord>, RepositoryError>;

    fn insert_employer(&self, record: EmployerRecord) -> Result<(), RepositoryError>;
    fn fetch_employer(&self, id: &EmployerId) -> Result<Option<EmployerRecord>, RepositoryError>;
    fn find_employer_by_email(&self, email: &str)
        -> Result<Option<EmployerRecord>, RepositoryError>;
    fn update_employer(&self, record: EmployerRecord) -> Result<(), RepositoryError>;

    fn insert_hiring(&self, hiring: HiringRequest) -> Result<(), RepositoryError>;
    fn fetch_hiring(&self, id: &HiringId) -> Result<Option<HiringRequest>, RepositoryError>;
    /// Move a hiring from `expected` to `next`. Fails with
    /// [`RepositoryError::StatusChanged`] when the stored status is no longer `expected`.
    fn transition_hiring(
        &self,
        id: &HiringId,
        expected: HiringStatus,
        next: HiringStatus,
        at: DateTime<Utc>,
    ) -> Result<HiringRequest, RepositoryError>;
    fn hirings_for_employer(
        &self,
        employer_id: &EmployerId,
    ) -> Result<Vec<HiringRequest>, RepositoryError>;
    fn hirings_for_housekeeper(
        &self,
        housekeeper_id: &HousekeeperId,
    ) -> Result<Vec<HiringRequest>, RepositoryError>;

    /// Store the review and set the housekeeper's rating to the average of
    /// all their reviews. Returns the new average.
    fn record_review(&self, review: Review) -> Result<f64, RepositoryError>;
    fn reviews_for_housekeeper(
        &self,
        housekeeper_id: &HousekeeperId,
    ) -> Result<Vec<Review>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("hiring status changed to {actual}")]
    StatusChanged { actual: HiringStatus },
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Outbound hook fired when an employer files a hiring request
/// (e-mail to the operations desk, chat webhook, ...).
pub trait HiringNotifier: Send + Sync {
    fn hiring_created(&self, notice: HiringNotice) -> Result<(), NotifyError>;
}

/// Everything the operations desk needs to follow up on a new request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HiringNotice {
    pub hiring: HiringRequest,
    pub employer: Employer,
    pub housekeeper: Housekeeper,
}

impl HiringNotice {
    pub fn subject(&self) -> &'static str {
        "New Hiring Request"
    }

    pub fn body(&self) -> String {
        let Self {
            hiring,
            employer,
            housekeeper,
        } = self;
        format!(
            "Employer Details:\n\
             Name: {}\nEmail: {}\nPhone: {}\nAddress: {}\nFamily Size: {}\n\n\
             Housekeeper Details:\n\
             Name: {}\nCategory: {}\nEmployment Type: {}\nExperience: {} years\n\n\
             Hiring Details:\n\
             Salary offered: ${:.2}\nStart Date: {}\nDelivery Type: {}\nRequirements: {}\n",
            employer.name,
            employer.email,
            employer.phone_number,
            employer.address,
            employer.family_size,
            housekeeper.name,
            housekeeper.category.label(),
            housekeeper.employment_type.label(),
            housekeeper.experience,
            hiring.salary_offer,
            hiring.start_date.format("%Y-%m-%d"),
            hiring.delivery_type.label(),
            hiring.requirements,
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}
