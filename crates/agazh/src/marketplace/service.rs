use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use validator::{Validate, ValidationErrors};

use super::auth::{hash_password, verify_password, AuthError, TokenIssuer};
use super::domain::{
    Employer, EmployerId, EmployerRegistration, EmployerUpdate, HiringId, HiringRequest,
    HiringStatus, HiringStatusUpdate, Housekeeper, HousekeeperFilter, HousekeeperId,
    HousekeeperRegistration, HousekeeperStats, HousekeeperUpdate, LoginCredentials,
    NewHiringRequest, NewReview, Review, ReviewId, UserType,
};
use super::repository::{
    EmployerRecord, HiringNotice, HiringNotifier, HousekeeperRecord, MarketplaceRepository,
    RepositoryError,
};

/// Authenticated principal on whose behalf a call is made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: String,
    pub user_type: UserType,
}

impl Caller {
    pub fn new(user_id: impl Into<String>, user_type: UserType) -> Self {
        Self {
            user_id: user_id.into(),
            user_type,
        }
    }

    fn is(&self, user_type: UserType, user_id: &str) -> bool {
        self.user_type == user_type && self.user_id == user_id
    }
}

/// Service composing the repository, credential handling, and the hiring lifecycle.
pub struct MarketplaceService<R, N> {
    repository: Arc<R>,
    notifier: Arc<N>,
    tokens: TokenIssuer,
}

impl<R, N> MarketplaceService<R, N>
where
    R: MarketplaceRepository + 'static,
    N: HiringNotifier + 'static,
{
    pub fn new(repository: Arc<R>, notifier: Arc<N>, tokens: TokenIssuer) -> Self {
        Self {
            repository,
            notifier,
            tokens,
        }
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    pub fn register_housekeeper(
        &self,
        registration: HousekeeperRegistration,
    ) -> Result<HousekeeperId, MarketplaceError> {
        registration.validate()?;
        if self
            .repository
            .find_housekeeper_by_email(&registration.email)?
            .is_some()
        {
            return Err(MarketplaceError::DuplicateAccount);
        }

        let password_hash = hash_password(&registration.password)?;
        let now = Utc::now();
        let profile = Housekeeper {
            id: HousekeeperId::generate(),
            name: registration.name,
            email: registration.email,
            age: registration.age,
            experience: registration.experience,
            category: registration.category,
            employment_type: registration.employment_type,
            skills: registration.skills,
            photo_url: registration.photo_url,
            certifications: registration.certifications,
            location: registration.location,
            phone_number: registration.phone_number,
            religion: registration.religion,
            place_of_birth: registration.place_of_birth,
            rating: 0.0,
            is_available: true,
            created_at: now,
            updated_at: now,
        };
        let id = profile.id.clone();

        self.repository
            .insert_housekeeper(HousekeeperRecord {
                profile,
                password_hash,
            })
            .map_err(conflict_as_duplicate)?;
        info!(housekeeper_id = %id, "housekeeper registered");
        Ok(id)
    }

    pub fn register_employer(
        &self,
        registration: EmployerRegistration,
    ) -> Result<EmployerId, MarketplaceError> {
        registration.validate()?;
        if self
            .repository
            .find_employer_by_email(&registration.email)?
            .is_some()
        {
            return Err(MarketplaceError::DuplicateAccount);
        }

        let password_hash = hash_password(&registration.password)?;
        let now = Utc::now();
        let profile = Employer {
            id: EmployerId::generate(),
            name: registration.name,
            email: registration.email,
            address: registration.address,
            phone_number: registration.phone_number,
            religion_preference: registration.religion_preference,
            place_of_birth_preference: registration.place_of_birth_preference,
            family_size: registration.family_size,
            created_at: now,
            updated_at: now,
        };
        let id = profile.id.clone();

        self.repository
            .insert_employer(EmployerRecord {
                profile,
                password_hash,
            })
            .map_err(conflict_as_duplicate)?;
        info!(employer_id = %id, "employer registered");
        Ok(id)
    }

    /// Check credentials against the account kind named in the request and issue a token.
    pub fn login(&self, credentials: LoginCredentials) -> Result<String, MarketplaceError> {
        credentials.validate()?;
        let stored = match credentials.user_type {
            UserType::Housekeeper => self
                .repository
                .find_housekeeper_by_email(&credentials.email)?
                .map(|record| (record.profile.id.0, record.password_hash)),
            UserType::Employer => self
                .repository
                .find_employer_by_email(&credentials.email)?
                .map(|record| (record.profile.id.0, record.password_hash)),
        };

        let (user_id, password_hash) = stored.ok_or(MarketplaceError::InvalidCredentials)?;
        if !verify_password(&credentials.password, &password_hash)? {
            warn!(user_type = %credentials.user_type, "login rejected");
            return Err(MarketplaceError::InvalidCredentials);
        }

        let token = self.tokens.issue(&user_id, credentials.user_type)?;
        info!(user_id = %user_id, user_type = %credentials.user_type, "login succeeded");
        Ok(token)
    }

    /// Available housekeepers matching the filter, best rated first.
    pub fn list_housekeepers(
        &self,
        filter: &HousekeeperFilter,
    ) -> Result<Vec<Housekeeper>, MarketplaceError> {
        let mut housekeepers: Vec<Housekeeper> = self
            .repository
            .list_housekeepers()?
            .into_iter()
            .map(|record| record.profile)
            .filter(|profile| filter.matches(profile))
            .collect();
        housekeepers.sort_by(|a, b| {
            b.rating
                .total_cmp(&a.rating)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(housekeepers)
    }

    pub fn housekeeper(&self, id: &HousekeeperId) -> Result<Housekeeper, MarketplaceError> {
        Ok(self.housekeeper_record(id)?.profile)
    }

    pub fn update_housekeeper(
        &self,
        caller: &Caller,
        id: &HousekeeperId,
        update: HousekeeperUpdate,
    ) -> Result<Housekeeper, MarketplaceError> {
        if !caller.is(UserType::Housekeeper, id.as_str()) {
            return Err(MarketplaceError::Forbidden(
                "housekeepers can only update their own profile",
            ));
        }
        update.validate()?;

        let profile = self
            .repository
            .apply_housekeeper_update(id, update, Utc::now())
            .map_err(|err| not_found_as(err, "Housekeeper not found"))?;
        info!(housekeeper_id = %id, available = profile.is_available, "housekeeper updated");
        Ok(profile)
    }

    pub fn delete_housekeeper(
        &self,
        caller: &Caller,
        id: &HousekeeperId,
    ) -> Result<(), MarketplaceError> {
        if !caller.is(UserType::Housekeeper, id.as_str()) {
            return Err(MarketplaceError::Forbidden(
                "housekeepers can only delete their own profile",
            ));
        }
        self.repository
            .delete_housekeeper(id)
            .map_err(|err| not_found_as(err, "Housekeeper not found"))?;
        info!(housekeeper_id = %id, "housekeeper deleted");
        Ok(())
    }

    pub fn housekeeper_stats(
        &self,
        id: &HousekeeperId,
    ) -> Result<HousekeeperStats, MarketplaceError> {
        let profile = self.housekeeper(id)?;
        let hirings = self.repository.hirings_for_housekeeper(id)?;
        let count = |status: HiringStatus| {
            hirings
                .iter()
                .filter(|hiring| hiring.status == status)
                .count()
        };

        Ok(HousekeeperStats {
            total_hirings: hirings.len(),
            pending_hirings: count(HiringStatus::Pending),
            completed_hirings: count(HiringStatus::Completed),
            average_rating: profile.rating,
        })
    }

    pub fn employer(&self, id: &EmployerId) -> Result<Employer, MarketplaceError> {
        self.repository
            .fetch_employer(id)?
            .map(|record| record.profile)
            .ok_or(MarketplaceError::NotFound("Employer not found"))
    }

    pub fn update_employer(
        &self,
        caller: &Caller,
        id: &EmployerId,
        update: EmployerUpdate,
    ) -> Result<Employer, MarketplaceError> {
        if !caller.is(UserType::Employer, id.as_str()) {
            return Err(MarketplaceError::Forbidden(
                "employers can only update their own profile",
            ));
        }
        update.validate()?;

        let mut record = self
            .repository
            .fetch_employer(id)?
            .ok_or(MarketplaceError::NotFound("Employer not found"))?;
        update.apply(&mut record.profile);
        record.profile.updated_at = Utc::now();
        let profile = record.profile.clone();
        self.repository
            .update_employer(record)
            .map_err(|err| not_found_as(err, "Employer not found"))?;
        info!(employer_id = %id, "employer updated");
        Ok(profile)
    }

    /// File a hiring request on behalf of the calling employer. New requests start PENDING.
    pub fn create_hiring(
        &self,
        caller: &Caller,
        request: NewHiringRequest,
    ) -> Result<HiringRequest, MarketplaceError> {
        if !caller.is(UserType::Employer, request.employer_id.as_str()) {
            return Err(MarketplaceError::Forbidden(
                "hiring requests must be filed by the employer named in the request",
            ));
        }
        request.validate()?;

        let employer = self
            .repository
            .fetch_employer(&request.employer_id)?
            .ok_or(MarketplaceError::UnknownReference("Employer not found"))?
            .profile;
        let housekeeper = self
            .repository
            .fetch_housekeeper(&request.housekeeper_id)?
            .ok_or(MarketplaceError::UnknownReference("Housekeeper not found"))?
            .profile;

        let now = Utc::now();
        let hiring = HiringRequest {
            id: HiringId::generate(),
            employer_id: request.employer_id,
            housekeeper_id: request.housekeeper_id,
            status: HiringStatus::Pending,
            requirements: request.requirements,
            salary_offer: request.salary_offer,
            start_date: request.start_date,
            delivery_type: request.delivery_type,
            created_at: now,
            updated_at: now,
        };
        self.repository.insert_hiring(hiring.clone())?;
        info!(
            hiring_id = %hiring.id,
            employer_id = %hiring.employer_id,
            housekeeper_id = %hiring.housekeeper_id,
            "hiring request created"
        );

        // Delivery problems must not undo an accepted request.
        if let Err(err) = self.notifier.hiring_created(HiringNotice {
            hiring: hiring.clone(),
            employer,
            housekeeper,
        }) {
            warn!(hiring_id = %hiring.id, error = %err, "hiring notification failed");
        }

        Ok(hiring)
    }

    pub fn hiring(&self, id: &HiringId) -> Result<HiringRequest, MarketplaceError> {
        self.repository
            .fetch_hiring(id)?
            .ok_or(MarketplaceError::NotFound("Hiring not found"))
    }

    pub fn hiring_history(
        &self,
        employer_id: &EmployerId,
    ) -> Result<Vec<HiringRequest>, MarketplaceError> {
        Ok(self.repository.hirings_for_employer(employer_id)?)
    }

    /// Move a hiring request along its lifecycle.
    ///
    /// Requesting the status the record already has is accepted without a
    /// write, so a repeated tap does not fail. `expected_status`, when given,
    /// must match the stored status.
    pub fn update_hiring_status(
        &self,
        caller: &Caller,
        id: &HiringId,
        update: HiringStatusUpdate,
    ) -> Result<HiringRequest, MarketplaceError> {
        let mut hiring = self.hiring(id)?;
        let party = caller.is(UserType::Employer, hiring.employer_id.as_str())
            || caller.is(UserType::Housekeeper, hiring.housekeeper_id.as_str());
        if !party {
            return Err(MarketplaceError::Forbidden(
                "only the parties of a hiring request can change its status",
            ));
        }

        let current = hiring.status;
        if current == update.status {
            return Ok(hiring);
        }
        if let Some(expected) = update.expected_status {
            if expected != current {
                return Err(MarketplaceError::StatusPreconditionFailed {
                    expected,
                    actual: current,
                });
            }
        }
        if !current.can_transition_to(update.status) {
            return Err(MarketplaceError::IllegalTransition {
                from: current,
                to: update.status,
            });
        }

        let hiring = match self
            .repository
            .transition_hiring(id, current, update.status, Utc::now())
        {
            Ok(hiring) => hiring,
            // Another request moved the record after it was read.
            Err(RepositoryError::StatusChanged { actual }) if actual == update.status => {
                hiring.status = actual;
                return Ok(hiring);
            }
            Err(RepositoryError::StatusChanged { actual }) => {
                return Err(MarketplaceError::StatusPreconditionFailed {
                    expected: update.expected_status.unwrap_or(current),
                    actual,
                });
            }
            Err(err) => return Err(not_found_as(err, "Hiring not found")),
        };
        info!(hiring_id = %id, from = %current, to = %hiring.status, "hiring status changed");
        Ok(hiring)
    }

    /// Record a review and refresh the housekeeper's average rating.
    ///
    /// The employer must have a COMPLETED hiring with the housekeeper.
    pub fn create_review(
        &self,
        caller: &Caller,
        review: NewReview,
    ) -> Result<Review, MarketplaceError> {
        if !caller.is(UserType::Employer, review.employer_id.as_str()) {
            return Err(MarketplaceError::Forbidden(
                "reviews must be written by the employer named in the review",
            ));
        }
        review.validate()?;

        self.housekeeper_record(&review.housekeeper_id)?;
        let completed = self
            .repository
            .hirings_for_employer(&review.employer_id)?
            .iter()
            .any(|hiring| {
                hiring.housekeeper_id == review.housekeeper_id && hiring.status.can_review()
            });
        if !completed {
            return Err(MarketplaceError::ReviewNotAllowed);
        }

        let stored = Review {
            id: ReviewId::generate(),
            employer_id: review.employer_id,
            housekeeper_id: review.housekeeper_id,
            rating: review.rating,
            comment: review.comment,
            created_at: Utc::now(),
        };
        let rating = self
            .repository
            .record_review(stored.clone())
            .map_err(|err| not_found_as(err, "Housekeeper not found"))?;

        info!(
            review_id = %stored.id,
            housekeeper_id = %stored.housekeeper_id,
            average_rating = rating,
            "review recorded"
        );
        Ok(stored)
    }

    pub fn reviews_for_housekeeper(
        &self,
        id: &HousekeeperId,
    ) -> Result<Vec<Review>, MarketplaceError> {
        Ok(self.repository.reviews_for_housekeeper(id)?)
    }

    fn housekeeper_record(&self, id: &HousekeeperId) -> Result<HousekeeperRecord, MarketplaceError> {
        self.repository
            .fetch_housekeeper(id)?
            .ok_or(MarketplaceError::NotFound("Housekeeper not found"))
    }
}

fn conflict_as_duplicate(err: RepositoryError) -> MarketplaceError {
    match err {
        RepositoryError::Conflict => MarketplaceError::DuplicateAccount,
        other => MarketplaceError::Repository(other),
    }
}

fn not_found_as(err: RepositoryError, message: &'static str) -> MarketplaceError {
    match err {
        RepositoryError::NotFound => MarketplaceError::NotFound(message),
        other => MarketplaceError::Repository(other),
    }
}

/// Error raised by the marketplace service.
#[derive(Debug, thiserror::Error)]
pub enum MarketplaceError {
    #[error("{0}")]
    Validation(String),
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("{0}")]
    Forbidden(&'static str),
    #[error("{0}")]
    NotFound(&'static str),
    #[error("{0}")]
    UnknownReference(&'static str),
    #[error("an account with this email already exists")]
    DuplicateAccount,
    #[error("cannot move hiring from {from} to {to}")]
    IllegalTransition { from: HiringStatus, to: HiringStatus },
    #[error("hiring status is {actual}, expected {expected}")]
    StatusPreconditionFailed {
        expected: HiringStatus,
        actual: HiringStatus,
    },
    #[error("a review requires a completed hiring with this housekeeper")]
    ReviewNotAllowed,
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<ValidationErrors> for MarketplaceError {
    fn from(errors: ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, failures)| {
                failures.iter().map(move |failure| match &failure.message {
                    Some(message) => message.to_string(),
                    None => format!("{field} is invalid"),
                })
            })
            .collect();
        messages.sort();
        Self::Validation(messages.join("; "))
    }
}
