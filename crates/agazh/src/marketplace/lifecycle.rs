//! Hiring lifecycle rules shared by the service and the client.
//!
//! ```text
//! PENDING ──► APPROVED ──┐
//!    │  └───► REJECTED ──┼──► COMPLETED
//!    └───────────────────┘
//! ```
//!
//! COMPLETED is terminal and is the only stage from which an employer may
//! write a review.

use serde::{Deserialize, Serialize};

use super::domain::HiringStatus;

/// Something a user can do from a hiring record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HiringAction {
    Approve,
    Reject,
    MarkCompleted,
    WriteReview,
}

impl HiringAction {
    pub const fn label(self) -> &'static str {
        match self {
            HiringAction::Approve => "Approve",
            HiringAction::Reject => "Reject",
            HiringAction::MarkCompleted => "Mark Completed",
            HiringAction::WriteReview => "Write Review",
        }
    }

    /// Status requested by the action, `None` for actions that are not transitions.
    pub const fn target_status(self) -> Option<HiringStatus> {
        match self {
            HiringAction::Approve => Some(HiringStatus::Approved),
            HiringAction::Reject => Some(HiringStatus::Rejected),
            HiringAction::MarkCompleted => Some(HiringStatus::Completed),
            HiringAction::WriteReview => None,
        }
    }
}

impl HiringStatus {
    pub const fn is_terminal(self) -> bool {
        matches!(self, HiringStatus::Completed)
    }

    pub const fn can_review(self) -> bool {
        matches!(self, HiringStatus::Completed)
    }

    pub const fn can_transition_to(self, next: HiringStatus) -> bool {
        matches!(
            (self, next),
            (HiringStatus::Pending, HiringStatus::Approved)
                | (HiringStatus::Pending, HiringStatus::Rejected)
                | (HiringStatus::Pending, HiringStatus::Completed)
                | (HiringStatus::Approved, HiringStatus::Completed)
                | (HiringStatus::Rejected, HiringStatus::Completed)
        )
    }

    /// Actions offered for the status, in display order.
    pub fn available_actions(self) -> Vec<HiringAction> {
        match self {
            HiringStatus::Pending => vec![
                HiringAction::Approve,
                HiringAction::Reject,
                HiringAction::MarkCompleted,
            ],
            HiringStatus::Approved | HiringStatus::Rejected => vec![HiringAction::MarkCompleted],
            HiringStatus::Completed => vec![HiringAction::WriteReview],
        }
    }

    pub fn offers(self, action: HiringAction) -> bool {
        self.available_actions().contains(&action)
    }

    pub const fn appearance(self) -> StatusAppearance {
        match self {
            HiringStatus::Pending => StatusAppearance {
                color: "#FFC107",
                icon: "time-outline",
            },
            HiringStatus::Approved => StatusAppearance {
                color: "#4CAF50",
                icon: "checkmark-circle-outline",
            },
            HiringStatus::Rejected => StatusAppearance {
                color: "#F44336",
                icon: "close-circle-outline",
            },
            HiringStatus::Completed => StatusAppearance {
                color: "#2196F3",
                icon: "checkmark-done-outline",
            },
        }
    }
}

/// Color and icon name used to render a status badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusAppearance {
    pub color: &'static str,
    pub icon: &'static str,
}
