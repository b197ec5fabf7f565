use std::sync::{Arc, Barrier};

use axum::body::Body;
use axum::http::{header, Method, Request};
use axum::response::Response;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;

use crate::config::AuthConfig;
use crate::marketplace::auth::TokenIssuer;
use crate::marketplace::domain::{
    Category, DeliveryType, EmployerId, EmployerRegistration, EmploymentType, HiringId,
    HiringRequest, HiringStatus, Housekeeper, HousekeeperId, HousekeeperRegistration,
    HousekeeperUpdate, NewHiringRequest, Review, UserType,
};
use crate::marketplace::memory::{InMemoryMarketplaceRepository, RecordingNotifier};
use crate::marketplace::repository::{
    EmployerRecord, HiringNotice, HiringNotifier, HousekeeperRecord, MarketplaceRepository,
    NotifyError, RepositoryError,
};
use crate::marketplace::service::{Caller, MarketplaceService};

pub(super) type TestService = MarketplaceService<InMemoryMarketplaceRepository, RecordingNotifier>;

pub(super) fn auth_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: "marketplace-test-secret".to_string(),
        token_ttl_hours: 24,
    }
}

pub(super) fn build_service() -> (
    Arc<TestService>,
    InMemoryMarketplaceRepository,
    RecordingNotifier,
) {
    let repository = InMemoryMarketplaceRepository::default();
    let notifier = RecordingNotifier::default();
    let service = MarketplaceService::new(
        Arc::new(repository.clone()),
        Arc::new(notifier.clone()),
        TokenIssuer::new(&auth_config()),
    );
    (Arc::new(service), repository, notifier)
}

pub(super) fn housekeeper_registration(name: &str, email: &str) -> HousekeeperRegistration {
    HousekeeperRegistration {
        name: name.to_string(),
        email: email.to_string(),
        password: "s3cret-pass".to_string(),
        age: 31,
        experience: 6,
        category: Category::Cleaner,
        employment_type: EmploymentType::FullTime,
        skills: vec!["laundry".to_string(), "cooking".to_string()],
        photo_url: None,
        certifications: Vec::new(),
        location: "Addis Ababa".to_string(),
        phone_number: "+251911223344".to_string(),
        religion: None,
        place_of_birth: Some("Gondar".to_string()),
    }
}

pub(super) fn employer_registration(name: &str, email: &str) -> EmployerRegistration {
    EmployerRegistration {
        name: name.to_string(),
        email: email.to_string(),
        password: "s3cret-pass".to_string(),
        address: "Bole, Addis Ababa".to_string(),
        phone_number: "+251922334455".to_string(),
        religion_preference: None,
        place_of_birth_preference: None,
        family_size: 4,
    }
}

pub(super) fn hiring_request(
    employer_id: &EmployerId,
    housekeeper_id: &HousekeeperId,
) -> NewHiringRequest {
    NewHiringRequest {
        employer_id: employer_id.clone(),
        housekeeper_id: housekeeper_id.clone(),
        requirements: "Weekday cleaning and school pickups".to_string(),
        salary_offer: 4500.0,
        start_date: NaiveDate::from_ymd_opt(2026, 11, 2).expect("valid date"),
        delivery_type: DeliveryType::Pickup,
    }
}

/// One housekeeper and one employer already registered.
pub(super) struct Parties {
    pub housekeeper_id: HousekeeperId,
    pub employer_id: EmployerId,
}

impl Parties {
    pub fn housekeeper(&self) -> Caller {
        Caller::new(self.housekeeper_id.as_str(), UserType::Housekeeper)
    }

    pub fn employer(&self) -> Caller {
        Caller::new(self.employer_id.as_str(), UserType::Employer)
    }
}

pub(super) fn register_parties(service: &TestService) -> Parties {
    let housekeeper_id = service
        .register_housekeeper(housekeeper_registration("Tigist", "tigist@example.com"))
        .expect("housekeeper registers");
    let employer_id = service
        .register_employer(employer_registration("Dawit", "dawit@example.com"))
        .expect("employer registers");
    Parties {
        housekeeper_id,
        employer_id,
    }
}

pub(super) fn pending_hiring(service: &TestService, parties: &Parties) -> HiringRequest {
    service
        .create_hiring(
            &parties.employer(),
            hiring_request(&parties.employer_id, &parties.housekeeper_id),
        )
        .expect("hiring is created")
}

pub(super) fn bearer(service: &TestService, caller: &Caller) -> String {
    let token = service
        .tokens()
        .issue(&caller.user_id, caller.user_type)
        .expect("token issues");
    format!("Bearer {token}")
}

pub(super) fn json_request(
    method: Method,
    uri: &str,
    authorization: Option<&str>,
    body: &Value,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    builder
        .body(Body::from(serde_json::to_vec(body).expect("serializes")))
        .expect("request builds")
}

pub(super) fn get_request(uri: &str, authorization: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    builder.body(Body::empty()).expect("request builds")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

#[derive(Default)]
pub(super) struct FailingNotifier;

impl HiringNotifier for FailingNotifier {
    fn hiring_created(&self, _notice: HiringNotice) -> Result<(), NotifyError> {
        Err(NotifyError::Transport("smtp relay refused".to_string()))
    }
}

#[derive(Default)]
pub(super) struct UnavailableRepository;

fn offline<T>() -> Result<T, RepositoryError> {
    Err(RepositoryError::Unavailable("database offline".to_string()))
}

impl MarketplaceRepository for UnavailableRepository {
    fn insert_housekeeper(&self, _record: HousekeeperRecord) -> Result<(), RepositoryError> {
        offline()
    }

    fn fetch_housekeeper(
        &self,
        _id: &HousekeeperId,
    ) -> Result<Option<HousekeeperRecord>, RepositoryError> {
        offline()
    }

    fn find_housekeeper_by_email(
        &self,
        _email: &str,
    ) -> Result<Option<HousekeeperRecord>, RepositoryError> {
        offline()
    }

    fn apply_housekeeper_update(
        &self,
        _id: &HousekeeperId,
        _update: HousekeeperUpdate,
        _at: DateTime<Utc>,
    ) -> Result<Housekeeper, RepositoryError> {
        offline()
    }

    fn delete_housekeeper(&self, _id: &HousekeeperId) -> Result<(), RepositoryError> {
        offline()
    }

    fn list_housekeepers(&self) -> Result<Vec<HousekeeperRecord>, RepositoryError> {
        offline()
    }

    fn insert_employer(&self, _record: EmployerRecord) -> Result<(), RepositoryError> {
        offline()
    }

    fn fetch_employer(&self, _id: &EmployerId) -> Result<Option<EmployerRecord>, RepositoryError> {
        offline()
    }

    fn find_employer_by_email(
        &self,
        _email: &str,
    ) -> Result<Option<EmployerRecord>, RepositoryError> {
        offline()
    }

    fn update_employer(&self, _record: EmployerRecord) -> Result<(), RepositoryError> {
        offline()
    }

    fn insert_hiring(&self, _hiring: HiringRequest) -> Result<(), RepositoryError> {
        offline()
    }

    fn fetch_hiring(&self, _id: &HiringId) -> Result<Option<HiringRequest>, RepositoryError> {
        offline()
    }

    fn transition_hiring(
        &self,
        _id: &HiringId,
        _expected: HiringStatus,
        _next: HiringStatus,
        _at: DateTime<Utc>,
    ) -> Result<HiringRequest, RepositoryError> {
        offline()
    }

    fn hirings_for_employer(
        &self,
        _employer_id: &EmployerId,
    ) -> Result<Vec<HiringRequest>, RepositoryError> {
        offline()
    }

    fn hirings_for_housekeeper(
        &self,
        _housekeeper_id: &HousekeeperId,
    ) -> Result<Vec<HiringRequest>, RepositoryError> {
        offline()
    }

    fn record_review(&self, _review: Review) -> Result<f64, RepositoryError> {
        offline()
    }

    fn reviews_for_housekeeper(
        &self,
        _housekeeper_id: &HousekeeperId,
    ) -> Result<Vec<Review>, RepositoryError> {
        offline()
    }
}

/// In-memory store whose `fetch_hiring` holds every caller until `parties`
/// callers have read, so they all act on the same snapshot.
pub(super) struct LockstepReads {
    inner: InMemoryMarketplaceRepository,
    gate: Barrier,
}

impl LockstepReads {
    pub(super) fn new(inner: InMemoryMarketplaceRepository, parties: usize) -> Self {
        Self {
            inner,
            gate: Barrier::new(parties),
        }
    }
}

impl MarketplaceRepository for LockstepReads {
    fn insert_housekeeper(&self, record: HousekeeperRecord) -> Result<(), RepositoryError> {
        self.inner.insert_housekeeper(record)
    }

    fn fetch_housekeeper(
        &self,
        id: &HousekeeperId,
    ) -> Result<Option<HousekeeperRecord>, RepositoryError> {
        self.inner.fetch_housekeeper(id)
    }

    fn find_housekeeper_by_email(
        &self,
        email: &str,
    ) -> Result<Option<HousekeeperRecord>, RepositoryError> {
        self.inner.find_housekeeper_by_email(email)
    }

    fn apply_housekeeper_update(
        &self,
        id: &HousekeeperId,
        update: HousekeeperUpdate,
        at: DateTime<Utc>,
    ) -> Result<Housekeeper, RepositoryError> {
        self.inner.apply_housekeeper_update(id, update, at)
    }

    fn delete_housekeeper(&self, id: &HousekeeperId) -> Result<(), RepositoryError> {
        self.inner.delete_housekeeper(id)
    }

    fn list_housekeepers(&self) -> Result<Vec<HousekeeperRecord>, RepositoryError> {
        self.inner.list_housekeepers()
    }

    fn insert_employer(&self, record: EmployerRecord) -> Result<(), RepositoryError> {
        self.inner.insert_employer(record)
    }

    fn fetch_employer(&self, id: &EmployerId) -> Result<Option<EmployerRecord>, RepositoryError> {
        self.inner.fetch_employer(id)
    }

    fn find_employer_by_email(
        &self,
        email: &str,
    ) -> Result<Option<EmployerRecord>, RepositoryError> {
        self.inner.find_employer_by_email(email)
    }

    fn update_employer(&self, record: EmployerRecord) -> Result<(), RepositoryError> {
        self.inner.update_employer(record)
    }

    fn insert_hiring(&self, hiring: HiringRequest) -> Result<(), RepositoryError> {
        self.inner.insert_hiring(hiring)
    }

    fn fetch_hiring(&self, id: &HiringId) -> Result<Option<HiringRequest>, RepositoryError> {
        let hiring = self.inner.fetch_hiring(id);
        self.gate.wait();
        hiring
    }

    fn transition_hiring(
        &self,
        id: &HiringId,
        expected: HiringStatus,
        next: HiringStatus,
        at: DateTime<Utc>,
    ) -> Result<HiringRequest, RepositoryError> {
        self.inner.transition_hiring(id, expected, next, at)
    }

    fn hirings_for_employer(
        &self,
        employer_id: &EmployerId,
    ) -> Result<Vec<HiringRequest>, RepositoryError> {
        self.inner.hirings_for_employer(employer_id)
    }

    fn hirings_for_housekeeper(
        &self,
        housekeeper_id: &HousekeeperId,
    ) -> Result<Vec<HiringRequest>, RepositoryError> {
        self.inner.hirings_for_housekeeper(housekeeper_id)
    }

    fn record_review(&self, review: Review) -> Result<f64, RepositoryError> {
        self.inner.record_review(review)
    }

    fn reviews_for_housekeeper(
        &self,
        housekeeper_id: &HousekeeperId,
    ) -> Result<Vec<Review>, RepositoryError> {
        self.inner.reviews_for_housekeeper(housekeeper_id)
    }
}
