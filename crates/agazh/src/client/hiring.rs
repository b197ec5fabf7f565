//! Hiring-record view: status badge, offered actions, and status requests.
//!
//! The controller never decides whether a transition is legal; it only
//! offers what [`HiringStatus::available_actions`] lists for the status it
//! displays and sends a single update per tap. The status it displays comes
//! from the last load or the last successful request, never from a re-fetch.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::review::ReviewDraft;
use super::{ClientError, UserAlert};
use crate::marketplace::domain::{
    HiringId, HiringRequest, HiringStatus, HiringStatusUpdate, Housekeeper, HousekeeperId,
};
use crate::marketplace::lifecycle::{HiringAction, StatusAppearance};

pub const LOAD_FAILED: &str = "Failed to load hiring details";
pub const UPDATE_FAILED: &str = "Failed to update hiring status";

/// Calls the hiring view needs from the backend.
#[async_trait]
pub trait HiringGateway: Send + Sync {
    async fn fetch_hiring(
        &self,
        id: &HiringId,
        cancel: &CancellationToken,
    ) -> Result<HiringRequest, ClientError>;

    async fn fetch_housekeeper(
        &self,
        id: &HousekeeperId,
        cancel: &CancellationToken,
    ) -> Result<Housekeeper, ClientError>;

    async fn request_status(
        &self,
        id: &HiringId,
        update: HiringStatusUpdate,
        cancel: &CancellationToken,
    ) -> Result<(), ClientError>;
}

/// What the view shows: the hiring record and the housekeeper it names.
#[derive(Debug, Clone, PartialEq)]
pub struct HiringView {
    pub hiring: HiringRequest,
    pub housekeeper: Housekeeper,
}

impl HiringView {
    pub fn status(&self) -> HiringStatus {
        self.hiring.status
    }

    pub fn appearance(&self) -> StatusAppearance {
        self.hiring.status.appearance()
    }

    pub fn actions(&self) -> Vec<HiringAction> {
        self.hiring.status.available_actions()
    }
}

/// Result of tapping an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The server accepted the request; the displayed status is now this value.
    Applied(HiringStatus),
    /// The request failed; the displayed status is unchanged.
    Failed(UserAlert),
    /// The view was torn down while the request was in flight.
    Cancelled,
    /// The action is not offered for the displayed status (or nothing is loaded).
    NotOffered,
}

pub struct HiringStatusController<G: ?Sized> {
    gateway: Arc<G>,
    cancel: CancellationToken,
    view: Option<HiringView>,
    alert: Option<UserAlert>,
}

impl<G> HiringStatusController<G>
where
    G: HiringGateway + ?Sized,
{
    pub fn new(gateway: Arc<G>) -> Self {
        Self::with_cancellation(gateway, CancellationToken::new())
    }

    pub fn with_cancellation(gateway: Arc<G>, cancel: CancellationToken) -> Self {
        Self {
            gateway,
            cancel,
            view: None,
            alert: None,
        }
    }

    /// Token cancelled by [`Self::teardown`]; clone it to cancel from elsewhere.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn view(&self) -> Option<&HiringView> {
        self.view.as_ref()
    }

    pub fn alert(&self) -> Option<&UserAlert> {
        self.alert.as_ref()
    }

    /// Dismiss the current alert.
    pub fn take_alert(&mut self) -> Option<UserAlert> {
        self.alert.take()
    }

    /// Fetch the hiring record, then the housekeeper it references.
    pub async fn load(&mut self, id: &HiringId) -> Result<&HiringView, ClientError> {
        let loaded = self.fetch_view(id).await;
        if self.cancel.is_cancelled() {
            return Err(ClientError::Cancelled);
        }
        match loaded {
            Ok(view) => {
                debug!(hiring_id = %id, status = %view.hiring.status, "hiring loaded");
                Ok(self.view.insert(view))
            }
            Err(ClientError::Cancelled) => Err(ClientError::Cancelled),
            Err(err) => {
                warn!(hiring_id = %id, error = %err, "hiring could not be loaded");
                self.alert = Some(UserAlert::error(LOAD_FAILED));
                Err(err)
            }
        }
    }

    async fn fetch_view(&self, id: &HiringId) -> Result<HiringView, ClientError> {
        let hiring = self.gateway.fetch_hiring(id, &self.cancel).await?;
        let housekeeper = self
            .gateway
            .fetch_housekeeper(&hiring.housekeeper_id, &self.cancel)
            .await?;
        Ok(HiringView {
            hiring,
            housekeeper,
        })
    }

    /// Request the status behind `action`.
    ///
    /// The displayed status travels as `expected_status`, so a record that
    /// moved elsewhere in the meantime is refused instead of overwritten.
    pub async fn transition(&mut self, action: HiringAction) -> TransitionOutcome {
        let Some(view) = self.view.as_ref() else {
            return TransitionOutcome::NotOffered;
        };
        let current = view.status();
        let target = match action.target_status() {
            Some(target) if current.offers(action) => target,
            _ => return TransitionOutcome::NotOffered,
        };
        let id = view.hiring.id.clone();

        let update = HiringStatusUpdate {
            status: target,
            expected_status: Some(current),
        };
        let result = self.gateway.request_status(&id, update, &self.cancel).await;
        if self.cancel.is_cancelled() {
            return TransitionOutcome::Cancelled;
        }

        match result {
            Ok(()) => {
                if let Some(view) = self.view.as_mut() {
                    view.hiring.status = target;
                }
                debug!(hiring_id = %id, from = %current, to = %target, "hiring status applied");
                TransitionOutcome::Applied(target)
            }
            Err(ClientError::Cancelled) => TransitionOutcome::Cancelled,
            Err(err) => {
                warn!(hiring_id = %id, action = action.label(), error = %err, "status request failed");
                let alert = UserAlert::for_failure(&err, UPDATE_FAILED);
                self.alert = Some(alert.clone());
                TransitionOutcome::Failed(alert)
            }
        }
    }

    /// Review draft for the displayed record; only a COMPLETED hiring opens one.
    pub fn review_draft(&self) -> Option<ReviewDraft> {
        self.view
            .as_ref()
            .and_then(|view| ReviewDraft::open(&view.hiring, &view.housekeeper))
    }

    /// Cancel every request still in flight for this view.
    pub fn teardown(&self) {
        self.cancel.cancel();
    }
}

impl<G: ?Sized> Drop for HiringStatusController<G> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
