//! Review form for a completed hiring.
//!
//! [`ReviewDraft::open`] only yields a draft when the hiring allows a review.
//! The draft checks the star rating locally before anything is sent.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::{ClientError, UserAlert};
use crate::marketplace::domain::{
    EmployerId, HiringId, HiringRequest, Housekeeper, HousekeeperId, NewReview, ReviewId,
};

pub const RATING_REQUIRED: &str = "Please select a rating";
pub const RATING_OUT_OF_RANGE: &str = "Rating must be between 1 and 5";
pub const SUBMIT_FAILED: &str = "Failed to submit review. Please try again.";

#[async_trait]
pub trait ReviewGateway: Send + Sync {
    async fn submit_review(
        &self,
        review: &NewReview,
        cancel: &CancellationToken,
    ) -> Result<ReviewId, ClientError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewOutcome {
    Submitted(ReviewId),
    Rejected(UserAlert),
    Cancelled,
}

/// Review being written for a completed hiring. Rating 0 means no star picked yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewDraft {
    hiring_id: HiringId,
    employer_id: EmployerId,
    housekeeper_id: HousekeeperId,
    housekeeper_name: String,
    rating: u8,
    comment: String,
}

impl ReviewDraft {
    /// Opens only for a COMPLETED hiring whose housekeeper is the one given.
    pub fn open(hiring: &HiringRequest, housekeeper: &Housekeeper) -> Option<Self> {
        if !hiring.status.can_review() || hiring.housekeeper_id != housekeeper.id {
            return None;
        }
        Some(Self {
            hiring_id: hiring.id.clone(),
            employer_id: hiring.employer_id.clone(),
            housekeeper_id: housekeeper.id.clone(),
            housekeeper_name: housekeeper.name.clone(),
            rating: 0,
            comment: String::new(),
        })
    }

    pub fn hiring_id(&self) -> &HiringId {
        &self.hiring_id
    }

    pub fn housekeeper_name(&self) -> &str {
        &self.housekeeper_name
    }

    pub fn rating(&self) -> u8 {
        self.rating
    }

    pub fn set_rating(&mut self, rating: u8) {
        self.rating = rating;
    }

    pub fn set_comment(&mut self, comment: impl Into<String>) {
        self.comment = comment.into();
    }

    /// Request body for the draft, or the alert explaining why it cannot be sent.
    pub fn to_request(&self) -> Result<NewReview, UserAlert> {
        match self.rating {
            0 => Err(UserAlert::error(RATING_REQUIRED)),
            1..=5 => Ok(NewReview {
                employer_id: self.employer_id.clone(),
                housekeeper_id: self.housekeeper_id.clone(),
                rating: self.rating,
                comment: self.comment.trim().to_string(),
            }),
            _ => Err(UserAlert::error(RATING_OUT_OF_RANGE)),
        }
    }

    pub async fn submit<G>(&self, gateway: &G, cancel: &CancellationToken) -> ReviewOutcome
    where
        G: ReviewGateway + ?Sized,
    {
        let request = match self.to_request() {
            Ok(request) => request,
            Err(alert) => return ReviewOutcome::Rejected(alert),
        };

        match gateway.submit_review(&request, cancel).await {
            Ok(id) => {
                info!(review_id = %id, hiring_id = %self.hiring_id, rating = self.rating, "review submitted");
                ReviewOutcome::Submitted(id)
            }
            Err(ClientError::Cancelled) => ReviewOutcome::Cancelled,
            Err(err) => {
                warn!(hiring_id = %self.hiring_id, error = %err, "review submission failed");
                ReviewOutcome::Rejected(UserAlert::for_failure(&err, SUBMIT_FAILED))
            }
        }
    }
}
