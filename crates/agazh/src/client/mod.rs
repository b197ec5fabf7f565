//! Client SDK for the marketplace REST API.
//!
//! [`session::Session`] holds the bearer token and the decoded user info and
//! is injected into [`api::ApiClient`]. The view controllers in [`hiring`] and
//! [`review`] sit on top of gateway traits so they can be driven without a
//! network. Every call takes a [`tokio_util::sync::CancellationToken`];
//! cancelling it resolves the call to [`ClientError::Cancelled`].

pub mod api;
pub mod hiring;
pub mod review;
pub mod session;

pub use api::ApiClient;
pub use hiring::{HiringGateway, HiringStatusController, HiringView, TransitionOutcome};
pub use review::{ReviewDraft, ReviewGateway, ReviewOutcome};
pub use session::{
    FileSessionStore, MemorySessionStore, Session, SessionError, SessionSnapshot, SessionStore,
};

/// Failure of a client call, as seen by a view.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request could not be delivered: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("server responded with status {status}")]
    Server { status: u16, message: Option<String> },
    #[error("unexpected response: {0}")]
    MalformedResponse(String),
    #[error("request cancelled")]
    Cancelled,
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl ClientError {
    /// Message reported by the server in an `{"error": ...}` body, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ClientError::Server {
                message: Some(message),
                ..
            } => Some(message),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ClientError::Cancelled)
    }
}

/// Blocking, dismissable notice shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAlert {
    pub title: &'static str,
    pub message: String,
}

impl UserAlert {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            title: "Error",
            message: message.into(),
        }
    }

    /// Alert for a failed call: the server's message when it sent one, the fallback otherwise.
    pub fn for_failure(error: &ClientError, fallback: &str) -> Self {
        Self::error(error.server_message().unwrap_or(fallback))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alert_prefers_server_message() {
        let error = ClientError::Server {
            status: 409,
            message: Some("cannot move hiring from COMPLETED to APPROVED".to_string()),
        };
        let alert = UserAlert::for_failure(&error, "Failed to update hiring status");
        assert_eq!(alert.title, "Error");
        assert_eq!(
            alert.message,
            "cannot move hiring from COMPLETED to APPROVED"
        );
    }

    #[test]
    fn alert_falls_back_without_server_message() {
        let error = ClientError::Server {
            status: 502,
            message: None,
        };
        assert_eq!(
            UserAlert::for_failure(&error, "Failed to load hiring details").message,
            "Failed to load hiring details"
        );
        assert_eq!(error.to_string(), "server responded with status 502");
    }
}
