use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::hiring::HiringGateway;
use super::review::ReviewGateway;
use super::session::{Session, SessionSnapshot};
use super::ClientError;
use crate::config::ClientConfig;
use crate::marketplace::domain::{
    CreatedResponse, Employer, EmployerId, EmployerRegistration, EmployerUpdate, ErrorResponse,
    HiringId, HiringRequest, HiringStatusUpdate, Housekeeper, HousekeeperFilter, HousekeeperId,
    HousekeeperRegistration, HousekeeperStats, HousekeeperUpdate, LoginCredentials,
    MessageResponse, NewHiringRequest, NewReview, Review, ReviewId, TokenResponse,
};

/// Typed REST client. The session's bearer token, when there is one, is
/// attached to every request; without it requests go out unauthenticated.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: Arc<Session>,
}

impl ApiClient {
    pub fn new(config: &ClientConfig, session: Arc<Session>) -> Result<Self, ClientError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(ClientError::Transport)?;

        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn register_housekeeper(
        &self,
        registration: &HousekeeperRegistration,
        cancel: &CancellationToken,
    ) -> Result<HousekeeperId, ClientError> {
        let request = self
            .request(Method::POST, "/auth/register/housekeeper")
            .json(registration);
        let created: CreatedResponse = self.call("register housekeeper", request, cancel).await?;
        created_id(created, "register housekeeper").map(HousekeeperId)
    }

    pub async fn register_employer(
        &self,
        registration: &EmployerRegistration,
        cancel: &CancellationToken,
    ) -> Result<EmployerId, ClientError> {
        let request = self
            .request(Method::POST, "/auth/register/employer")
            .json(registration);
        let created: CreatedResponse = self.call("register employer", request, cancel).await?;
        created_id(created, "register employer").map(EmployerId)
    }

    /// Exchange credentials for a token and persist it as the current session.
    pub async fn login(
        &self,
        credentials: &LoginCredentials,
        cancel: &CancellationToken,
    ) -> Result<SessionSnapshot, ClientError> {
        let request = self.request(Method::POST, "/auth/login").json(credentials);
        let TokenResponse { token } = self.call("login", request, cancel).await?;
        if token.is_empty() {
            return Err(ClientError::MalformedResponse(
                "login: response carried an empty token".to_string(),
            ));
        }
        Ok(self.session.establish(token)?)
    }

    pub fn logout(&self) -> Result<(), ClientError> {
        Ok(self.session.logout()?)
    }

    pub async fn list_housekeepers(
        &self,
        filter: &HousekeeperFilter,
        cancel: &CancellationToken,
    ) -> Result<Vec<Housekeeper>, ClientError> {
        let request = self.request(Method::GET, "/housekeepers").query(filter);
        self.call("list housekeepers", request, cancel).await
    }

    pub async fn housekeeper(
        &self,
        id: &HousekeeperId,
        cancel: &CancellationToken,
    ) -> Result<Housekeeper, ClientError> {
        let request = self.request(Method::GET, &format!("/housekeepers/{id}"));
        self.call("get housekeeper", request, cancel).await
    }

    pub async fn update_housekeeper(
        &self,
        id: &HousekeeperId,
        update: &HousekeeperUpdate,
        cancel: &CancellationToken,
    ) -> Result<MessageResponse, ClientError> {
        let request = self
            .request(Method::PUT, &format!("/housekeepers/{id}"))
            .json(update);
        self.call("update housekeeper", request, cancel).await
    }

    pub async fn delete_housekeeper(
        &self,
        id: &HousekeeperId,
        cancel: &CancellationToken,
    ) -> Result<MessageResponse, ClientError> {
        let request = self.request(Method::DELETE, &format!("/housekeepers/{id}"));
        self.call("delete housekeeper", request, cancel).await
    }

    pub async fn housekeeper_stats(
        &self,
        id: &HousekeeperId,
        cancel: &CancellationToken,
    ) -> Result<HousekeeperStats, ClientError> {
        let request = self.request(Method::GET, &format!("/housekeepers/{id}/stats"));
        self.call("housekeeper stats", request, cancel).await
    }

    pub async fn employer(
        &self,
        id: &EmployerId,
        cancel: &CancellationToken,
    ) -> Result<Employer, ClientError> {
        let request = self.request(Method::GET, &format!("/employers/{id}"));
        self.call("get employer", request, cancel).await
    }

    pub async fn update_employer(
        &self,
        id: &EmployerId,
        update: &EmployerUpdate,
        cancel: &CancellationToken,
    ) -> Result<MessageResponse, ClientError> {
        let request = self
            .request(Method::PUT, &format!("/employers/{id}"))
            .json(update);
        self.call("update employer", request, cancel).await
    }

    pub async fn create_hiring(
        &self,
        request: &NewHiringRequest,
        cancel: &CancellationToken,
    ) -> Result<HiringId, ClientError> {
        let builder = self.request(Method::POST, "/hiring").json(request);
        let created: CreatedResponse = self.call("create hiring", builder, cancel).await?;
        created_id(created, "create hiring").map(HiringId)
    }

    pub async fn hiring(
        &self,
        id: &HiringId,
        cancel: &CancellationToken,
    ) -> Result<HiringRequest, ClientError> {
        let request = self.request(Method::GET, &format!("/hiring/{id}"));
        self.call("get hiring", request, cancel).await
    }

    pub async fn hiring_history(
        &self,
        employer_id: &EmployerId,
        cancel: &CancellationToken,
    ) -> Result<Vec<HiringRequest>, ClientError> {
        let request = self.request(Method::GET, &format!("/hiring/employer/{employer_id}"));
        self.call("hiring history", request, cancel).await
    }

    /// Request a status change. Success is the 2xx status alone; the body is not read.
    pub async fn update_hiring_status(
        &self,
        id: &HiringId,
        update: HiringStatusUpdate,
        cancel: &CancellationToken,
    ) -> Result<(), ClientError> {
        let request = self
            .request(Method::PUT, &format!("/hiring/{id}/status"))
            .json(&update);
        self.execute("update hiring status", request, cancel)
            .await
            .map(|_| ())
    }

    pub async fn create_review(
        &self,
        review: &NewReview,
        cancel: &CancellationToken,
    ) -> Result<ReviewId, ClientError> {
        let request = self.request(Method::POST, "/ratings").json(review);
        let created: CreatedResponse = self.call("create review", request, cancel).await?;
        created_id(created, "create review").map(ReviewId)
    }

    pub async fn reviews_for_housekeeper(
        &self,
        id: &HousekeeperId,
        cancel: &CancellationToken,
    ) -> Result<Vec<Review>, ClientError> {
        let request = self.request(Method::GET, &format!("/ratings/housekeeper/{id}"));
        self.call("list reviews", request, cancel).await
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .http
            .request(method, format!("{}{}", self.base_url, path));
        match self.session.bearer() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn call<T>(
        &self,
        endpoint: &'static str,
        request: RequestBuilder,
        cancel: &CancellationToken,
    ) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
    {
        let body = self.execute(endpoint, request, cancel).await?;
        serde_json::from_slice(&body)
            .map_err(|err| ClientError::MalformedResponse(format!("{endpoint}: {err}")))
    }

    /// Send the request unless `cancel` fires first; a non-2xx status becomes
    /// [`ClientError::Server`] carrying the body's `error` field when present.
    async fn execute(
        &self,
        endpoint: &'static str,
        request: RequestBuilder,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, ClientError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(endpoint, "request cancelled");
                Err(ClientError::Cancelled)
            }
            result = dispatch(endpoint, request) => result,
        }
    }
}

async fn dispatch(endpoint: &'static str, request: RequestBuilder) -> Result<Vec<u8>, ClientError> {
    debug!(endpoint, "sending request");
    let response = request.send().await.map_err(|err| {
        warn!(endpoint, error = %err, "request could not be delivered");
        ClientError::Transport(err)
    })?;

    let status = response.status();
    let body = response.bytes().await.map_err(ClientError::Transport)?;
    if !status.is_success() {
        let message = serde_json::from_slice::<ErrorResponse>(&body)
            .ok()
            .map(|payload| payload.error);
        warn!(
            endpoint,
            status = status.as_u16(),
            message = message.as_deref().unwrap_or_default(),
            "request rejected"
        );
        return Err(ClientError::Server {
            status: status.as_u16(),
            message,
        });
    }
    Ok(body.to_vec())
}

fn created_id(created: CreatedResponse, endpoint: &str) -> Result<String, ClientError> {
    match created.id {
        Some(id) if !id.is_empty() => Ok(id),
        _ => Err(ClientError::MalformedResponse(format!(
            "{endpoint}: response is missing an id"
        ))),
    }
}

#[async_trait]
impl HiringGateway for ApiClient {
    async fn fetch_hiring(
        &self,
        id: &HiringId,
        cancel: &CancellationToken,
    ) -> Result<HiringRequest, ClientError> {
        self.hiring(id, cancel).await
    }

    async fn fetch_housekeeper(
        &self,
        id: &HousekeeperId,
        cancel: &CancellationToken,
    ) -> Result<Housekeeper, ClientError> {
        self.housekeeper(id, cancel).await
    }

    async fn request_status(
        &self,
        id: &HiringId,
        update: HiringStatusUpdate,
        cancel: &CancellationToken,
    ) -> Result<(), ClientError> {
        self.update_hiring_status(id, update, cancel).await
    }
}

#[async_trait]
impl ReviewGateway for ApiClient {
    async fn submit_review(
        &self,
        review: &NewReview,
        cancel: &CancellationToken,
    ) -> Result<ReviewId, ClientError> {
        self.create_review(review, cancel).await
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("session", &self.session)
            .finish()
    }
}

