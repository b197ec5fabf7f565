use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        FromRef, FromRequestParts, Path, Query, State,
    },
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde_json::json;

use super::auth::TokenIssuer;
use super::domain::{
    CreatedResponse, EmployerId, EmployerRegistration, EmployerUpdate, HiringId,
    HiringStatusUpdate, HousekeeperFilter, HousekeeperId, HousekeeperRegistration,
    HousekeeperUpdate, LoginCredentials, MessageResponse, NewHiringRequest, NewReview,
    TokenResponse,
};
use super::repository::{HiringNotifier, MarketplaceRepository, RepositoryError};
use super::service::{Caller, MarketplaceError, MarketplaceService};

type Service<R, N> = Arc<MarketplaceService<R, N>>;

/// Router builder exposing the marketplace REST API under `/api/v1`.
pub fn marketplace_router<R, N>(service: Service<R, N>) -> Router
where
    R: MarketplaceRepository + 'static,
    N: HiringNotifier + 'static,
{
    Router::new()
        .route(
            "/api/v1/auth/register/housekeeper",
            post(register_housekeeper_handler::<R, N>),
        )
        .route(
            "/api/v1/auth/register/employer",
            post(register_employer_handler::<R, N>),
        )
        .route("/api/v1/auth/login", post(login_handler::<R, N>))
        .route("/api/v1/housekeepers", get(list_housekeepers_handler::<R, N>))
        .route(
            "/api/v1/housekeepers/:id",
            get(housekeeper_handler::<R, N>)
                .put(update_housekeeper_handler::<R, N>)
                .delete(delete_housekeeper_handler::<R, N>),
        )
        .route(
            "/api/v1/housekeepers/:id/stats",
            get(housekeeper_stats_handler::<R, N>),
        )
        .route(
            "/api/v1/employers/:id",
            get(employer_handler::<R, N>).put(update_employer_handler::<R, N>),
        )
        .route("/api/v1/hiring", post(create_hiring_handler::<R, N>))
        .route("/api/v1/hiring/:id", get(hiring_handler::<R, N>))
        .route(
            "/api/v1/hiring/:id/status",
            put(update_hiring_status_handler::<R, N>),
        )
        .route(
            "/api/v1/hiring/employer/:employer_id",
            get(hiring_history_handler::<R, N>),
        )
        .route("/api/v1/ratings", post(create_review_handler::<R, N>))
        .route(
            "/api/v1/ratings/housekeeper/:id",
            get(reviews_handler::<R, N>),
        )
        .with_state(service)
}

impl<R, N> FromRef<Service<R, N>> for TokenIssuer
where
    R: MarketplaceRepository + 'static,
    N: HiringNotifier + 'static,
{
    fn from_ref(service: &Service<R, N>) -> Self {
        service.tokens().clone()
    }
}

/// Caller identity taken from the `Authorization: Bearer <token>` header.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Caller);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    TokenIssuer: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| unauthorized("Authorization header is required"))?;
        let token = header_value
            .strip_prefix("Bearer ")
            .ok_or_else(|| unauthorized("Authorization header must use the Bearer scheme"))?;

        let claims = TokenIssuer::from_ref(state)
            .verify(token.trim())
            .map_err(|_| unauthorized("Invalid or expired token"))?;
        Ok(AuthUser(Caller::new(claims.user_id, claims.user_type)))
    }
}

/// Single `:id` path segment. Undecodable segments are answered with the
/// JSON error envelope like every other bad request.
#[derive(Debug, Clone)]
pub struct PathId(pub String);

#[axum::async_trait]
impl<S> FromRequestParts<S> for PathId
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Path::<String>::from_request_parts(parts, state)
            .await
            .map(|Path(id)| PathId(id))
            .map_err(|rejection: PathRejection| {
                error_body(StatusCode::BAD_REQUEST, &rejection.body_text())
            })
    }
}

fn unauthorized(message: &str) -> Response {
    error_body(StatusCode::UNAUTHORIZED, message)
}

fn error_body(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

pub(crate) fn error_response(error: MarketplaceError) -> Response {
    let status = match &error {
        MarketplaceError::Validation(_) | MarketplaceError::UnknownReference(_) => {
            StatusCode::BAD_REQUEST
        }
        MarketplaceError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        MarketplaceError::Forbidden(_) => StatusCode::FORBIDDEN,
        MarketplaceError::NotFound(_) => StatusCode::NOT_FOUND,
        MarketplaceError::DuplicateAccount
        | MarketplaceError::IllegalTransition { .. }
        | MarketplaceError::StatusPreconditionFailed { .. }
        | MarketplaceError::ReviewNotAllowed
        | MarketplaceError::Repository(RepositoryError::Conflict)
        | MarketplaceError::Repository(RepositoryError::StatusChanged { .. }) => {
            StatusCode::CONFLICT
        }
        MarketplaceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        MarketplaceError::Auth(_) | MarketplaceError::Repository(_) => {
            tracing::error!(error = %error, "marketplace request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    error_body(status, &error.to_string())
}

fn bad_json(rejection: JsonRejection) -> Response {
    error_body(StatusCode::BAD_REQUEST, &rejection.body_text())
}

fn created(message: Option<&str>, id: String) -> Response {
    let body = CreatedResponse {
        message: message.map(str::to_string),
        id: Some(id),
    };
    (StatusCode::CREATED, Json(body)).into_response()
}

fn message(text: &str) -> Response {
    let body = MessageResponse {
        message: text.to_string(),
    };
    (StatusCode::OK, Json(body)).into_response()
}

fn ok_json<T: serde::Serialize>(value: T) -> Response {
    (StatusCode::OK, Json(value)).into_response()
}

pub(crate) async fn register_housekeeper_handler<R, N>(
    State(service): State<Service<R, N>>,
    payload: Result<Json<HousekeeperRegistration>, JsonRejection>,
) -> Response
where
    R: MarketplaceRepository + 'static,
    N: HiringNotifier + 'static,
{
    let Json(registration) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return bad_json(rejection),
    };
    match service.register_housekeeper(registration) {
        Ok(id) => created(Some("Housekeeper registered successfully"), id.0),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn register_employer_handler<R, N>(
    State(service): State<Service<R, N>>,
    payload: Result<Json<EmployerRegistration>, JsonRejection>,
) -> Response
where
    R: MarketplaceRepository + 'static,
    N: HiringNotifier + 'static,
{
    let Json(registration) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return bad_json(rejection),
    };
    match service.register_employer(registration) {
        Ok(id) => created(Some("Employer registered successfully"), id.0),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn login_handler<R, N>(
    State(service): State<Service<R, N>>,
    payload: Result<Json<LoginCredentials>, JsonRejection>,
) -> Response
where
    R: MarketplaceRepository + 'static,
    N: HiringNotifier + 'static,
{
    let Json(credentials) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return bad_json(rejection),
    };
    match service.login(credentials) {
        Ok(token) => (StatusCode::CREATED, Json(TokenResponse { token })).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn list_housekeepers_handler<R, N>(
    State(service): State<Service<R, N>>,
    _user: AuthUser,
    filter: Result<Query<HousekeeperFilter>, QueryRejection>,
) -> Response
where
    R: MarketplaceRepository + 'static,
    N: HiringNotifier + 'static,
{
    let Query(filter) = match filter {
        Ok(filter) => filter,
        Err(rejection) => return error_body(StatusCode::BAD_REQUEST, &rejection.body_text()),
    };
    match service.list_housekeepers(&filter) {
        Ok(housekeepers) => ok_json(housekeepers),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn housekeeper_handler<R, N>(
    State(service): State<Service<R, N>>,
    _user: AuthUser,
    PathId(id): PathId,
) -> Response
where
    R: MarketplaceRepository + 'static,
    N: HiringNotifier + 'static,
{
    match service.housekeeper(&HousekeeperId(id)) {
        Ok(profile) => ok_json(profile),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn update_housekeeper_handler<R, N>(
    State(service): State<Service<R, N>>,
    AuthUser(caller): AuthUser,
    PathId(id): PathId,
    payload: Result<Json<HousekeeperUpdate>, JsonRejection>,
) -> Response
where
    R: MarketplaceRepository + 'static,
    N: HiringNotifier + 'static,
{
    let Json(update) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return bad_json(rejection),
    };
    match service.update_housekeeper(&caller, &HousekeeperId(id), update) {
        Ok(_) => message("Housekeeper updated successfully"),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn delete_housekeeper_handler<R, N>(
    State(service): State<Service<R, N>>,
    AuthUser(caller): AuthUser,
    PathId(id): PathId,
) -> Response
where
    R: MarketplaceRepository + 'static,
    N: HiringNotifier + 'static,
{
    match service.delete_housekeeper(&caller, &HousekeeperId(id)) {
        Ok(()) => message("Housekeeper deleted successfully"),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn housekeeper_stats_handler<R, N>(
    State(service): State<Service<R, N>>,
    _user: AuthUser,
    PathId(id): PathId,
) -> Response
where
    R: MarketplaceRepository + 'static,
    N: HiringNotifier + 'static,
{
    match service.housekeeper_stats(&HousekeeperId(id)) {
        Ok(stats) => ok_json(stats),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn employer_handler<R, N>(
    State(service): State<Service<R, N>>,
    _user: AuthUser,
    PathId(id): PathId,
) -> Response
where
    R: MarketplaceRepository + 'static,
    N: HiringNotifier + 'static,
{
    match service.employer(&EmployerId(id)) {
        Ok(profile) => ok_json(profile),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn update_employer_handler<R, N>(
    State(service): State<Service<R, N>>,
    AuthUser(caller): AuthUser,
    PathId(id): PathId,
    payload: Result<Json<EmployerUpdate>, JsonRejection>,
) -> Response
where
    R: MarketplaceRepository + 'static,
    N: HiringNotifier + 'static,
{
    let Json(update) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return bad_json(rejection),
    };
    match service.update_employer(&caller, &EmployerId(id), update) {
        Ok(_) => message("Employer updated successfully"),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn create_hiring_handler<R, N>(
    State(service): State<Service<R, N>>,
    AuthUser(caller): AuthUser,
    payload: Result<Json<NewHiringRequest>, JsonRejection>,
) -> Response
where
    R: MarketplaceRepository + 'static,
    N: HiringNotifier + 'static,
{
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return bad_json(rejection),
    };
    match service.create_hiring(&caller, request) {
        Ok(hiring) => created(None, hiring.id.0),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn hiring_handler<R, N>(
    State(service): State<Service<R, N>>,
    _user: AuthUser,
    PathId(id): PathId,
) -> Response
where
    R: MarketplaceRepository + 'static,
    N: HiringNotifier + 'static,
{
    match service.hiring(&HiringId(id)) {
        Ok(hiring) => ok_json(hiring),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn update_hiring_status_handler<R, N>(
    State(service): State<Service<R, N>>,
    AuthUser(caller): AuthUser,
    PathId(id): PathId,
    payload: Result<Json<HiringStatusUpdate>, JsonRejection>,
) -> Response
where
    R: MarketplaceRepository + 'static,
    N: HiringNotifier + 'static,
{
    let Json(update) = match payload {
        Ok(payload) => payload,
        Err(_) => return error_body(StatusCode::BAD_REQUEST, "Invalid request body"),
    };
    match service.update_hiring_status(&caller, &HiringId(id), update) {
        Ok(_) => message("Hiring status updated successfully"),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn hiring_history_handler<R, N>(
    State(service): State<Service<R, N>>,
    _user: AuthUser,
    PathId(employer_id): PathId,
) -> Response
where
    R: MarketplaceRepository + 'static,
    N: HiringNotifier + 'static,
{
    match service.hiring_history(&EmployerId(employer_id)) {
        Ok(hirings) => ok_json(hirings),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn create_review_handler<R, N>(
    State(service): State<Service<R, N>>,
    AuthUser(caller): AuthUser,
    payload: Result<Json<NewReview>, JsonRejection>,
) -> Response
where
    R: MarketplaceRepository + 'static,
    N: HiringNotifier + 'static,
{
    let Json(review) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return bad_json(rejection),
    };
    match service.create_review(&caller, review) {
        Ok(review) => created(None, review.id.0),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn reviews_handler<R, N>(
    State(service): State<Service<R, N>>,
    _user: AuthUser,
    PathId(id): PathId,
) -> Response
where
    R: MarketplaceRepository + 'static,
    N: HiringNotifier + 'static,
{
    match service.reviews_for_housekeeper(&HousekeeperId(id)) {
        Ok(reviews) => ok_json(reviews),
        Err(error) => error_response(error),
    }
}
