use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().simple().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

identifier!(
    /// Identifier of a housekeeper profile.
    HousekeeperId
);
identifier!(
    /// Identifier of an employer profile.
    EmployerId
);
identifier!(
    /// Identifier of a hiring request.
    HiringId
);
identifier!(ReviewId);

/// The two account roles a token can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    Housekeeper,
    Employer,
}

impl UserType {
    pub const fn label(self) -> &'static str {
        match self {
            UserType::Housekeeper => "housekeeper",
            UserType::Employer => "employer",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "housekeeper" => Some(Self::Housekeeper),
            "employer" => Some(Self::Employer),
            _ => None,
        }
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Normal,
    ChildCare,
    Cleaner,
}

impl Category {
    pub const fn label(self) -> &'static str {
        match self {
            Category::Normal => "NORMAL",
            Category::ChildCare => "CHILD_CARE",
            Category::Cleaner => "CLEANER",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmploymentType {
    FullTime,
    PartTime,
}

impl EmploymentType {
    pub const fn label(self) -> &'static str {
        match self {
            EmploymentType::FullTime => "FULL_TIME",
            EmploymentType::PartTime => "PART_TIME",
        }
    }
}

/// How the housekeeper reaches the employer on the start date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryType {
    Delivery,
    Pickup,
}

impl DeliveryType {
    pub const fn label(self) -> &'static str {
        match self {
            DeliveryType::Delivery => "DELIVERY",
            DeliveryType::Pickup => "PICKUP",
        }
    }
}

/// Lifecycle stage of a hiring request. See [`super::lifecycle`] for the
/// transitions and the actions each stage offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HiringStatus {
    Pending,
    Approved,
    Rejected,
    Completed,
}

impl HiringStatus {
    pub const fn label(self) -> &'static str {
        match self {
            HiringStatus::Pending => "PENDING",
            HiringStatus::Approved => "APPROVED",
            HiringStatus::Rejected => "REJECTED",
            HiringStatus::Completed => "COMPLETED",
        }
    }
}

impl fmt::Display for HiringStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Public housekeeper profile. The password hash lives on the repository record only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Housekeeper {
    pub id: HousekeeperId,
    pub name: String,
    pub email: String,
    pub age: u8,
    #[serde(default)]
    pub experience: u8,
    pub category: Category,
    pub employment_type: EmploymentType,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub certifications: Vec<String>,
    pub location: String,
    pub phone_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub religion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_of_birth: Option<String>,
    #[serde(default)]
    pub rating: f64,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employer {
    pub id: EmployerId,
    pub name: String,
    pub email: String,
    pub address: String,
    pub phone_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub religion_preference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_of_birth_preference: Option<String>,
    #[serde(default)]
    pub family_size: u8,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An employer's offer to a housekeeper and where it stands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HiringRequest {
    pub id: HiringId,
    pub employer_id: EmployerId,
    pub housekeeper_id: HousekeeperId,
    pub status: HiringStatus,
    #[serde(default)]
    pub requirements: String,
    pub salary_offer: f64,
    pub start_date: NaiveDate,
    pub delivery_type: DeliveryType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub employer_id: EmployerId,
    pub housekeeper_id: HousekeeperId,
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct HousekeeperRegistration {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,
    #[validate(length(min = 6, message = "password must be at least 6 characters"))]
    pub password: String,
    #[validate(range(min = 16, max = 80, message = "age must be between 16 and 80"))]
    pub age: u8,
    #[serde(default)]
    pub experience: u8,
    pub category: Category,
    pub employment_type: EmploymentType,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub certifications: Vec<String>,
    #[validate(length(min = 1, message = "location is required"))]
    pub location: String,
    #[validate(length(min = 1, message = "phone_number is required"))]
    pub phone_number: String,
    #[serde(default)]
    pub religion: Option<String>,
    #[serde(default)]
    pub place_of_birth: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct EmployerRegistration {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,
    #[validate(length(min = 6, message = "password must be at least 6 characters"))]
    pub password: String,
    #[validate(length(min = 1, message = "address is required"))]
    pub address: String,
    #[validate(length(min = 1, message = "phone_number is required"))]
    pub phone_number: String,
    #[serde(default)]
    pub religion_preference: Option<String>,
    #[serde(default)]
    pub place_of_birth_preference: Option<String>,
    #[serde(default)]
    pub family_size: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct LoginCredentials {
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
    pub user_type: UserType,
}

/// Partial housekeeper update; absent fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct HousekeeperUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "name cannot be blank"))]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 16, max = 80, message = "age must be between 16 and 80"))]
    pub age: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experience: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employment_type: Option<EmploymentType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skills: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certifications: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub religion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_of_birth: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_available: Option<bool>,
}

impl HousekeeperUpdate {
    pub fn apply(self, profile: &mut Housekeeper) {
        let HousekeeperUpdate {
            name,
            age,
            experience,
            category,
            employment_type,
            location,
            phone_number,
            skills,
            photo_url,
            certifications,
            religion,
            place_of_birth,
            is_available,
        } = self;

        if let Some(name) = name {
            profile.name = name;
        }
        if let Some(age) = age {
            profile.age = age;
        }
        if let Some(experience) = experience {
            profile.experience = experience;
        }
        if let Some(category) = category {
            profile.category = category;
        }
        if let Some(employment_type) = employment_type {
            profile.employment_type = employment_type;
        }
        if let Some(location) = location {
            profile.location = location;
        }
        if let Some(phone_number) = phone_number {
            profile.phone_number = phone_number;
        }
        if let Some(skills) = skills {
            profile.skills = skills;
        }
        if photo_url.is_some() {
            profile.photo_url = photo_url;
        }
        if let Some(certifications) = certifications {
            profile.certifications = certifications;
        }
        if religion.is_some() {
            profile.religion = religion;
        }
        if place_of_birth.is_some() {
            profile.place_of_birth = place_of_birth;
        }
        if let Some(is_available) = is_available {
            profile.is_available = is_available;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct EmployerUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "name cannot be blank"))]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_size: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub religion_preference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_of_birth_preference: Option<String>,
}

impl EmployerUpdate {
    pub fn apply(self, profile: &mut Employer) {
        if let Some(name) = self.name {
            profile.name = name;
        }
        if let Some(address) = self.address {
            profile.address = address;
        }
        if let Some(phone_number) = self.phone_number {
            profile.phone_number = phone_number;
        }
        if let Some(family_size) = self.family_size {
            profile.family_size = family_size;
        }
        if self.religion_preference.is_some() {
            profile.religion_preference = self.religion_preference;
        }
        if self.place_of_birth_preference.is_some() {
            profile.place_of_birth_preference = self.place_of_birth_preference;
        }
    }
}

/// Listing filters. Only available housekeepers are ever listed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HousekeeperFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employment_type: Option<EmploymentType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Case-insensitive substring of the name, location or a skill.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

impl HousekeeperFilter {
    pub fn matches(&self, housekeeper: &Housekeeper) -> bool {
        housekeeper.is_available
            && self
                .category
                .map_or(true, |category| housekeeper.category == category)
            && self
                .employment_type
                .map_or(true, |kind| housekeeper.employment_type == kind)
            && self
                .location
                .as_deref()
                .map_or(true, |location| housekeeper.location == location)
            && self.matches_search(housekeeper)
    }

    fn matches_search(&self, housekeeper: &Housekeeper) -> bool {
        let Some(term) = self.search.as_deref().map(str::trim) else {
            return true;
        };
        if term.is_empty() {
            return true;
        }
        let term = term.to_lowercase();
        let contains = |text: &str| text.to_lowercase().contains(&term);
        contains(&housekeeper.name)
            || contains(&housekeeper.location)
            || housekeeper.skills.iter().any(|skill| contains(skill))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct NewHiringRequest {
    pub employer_id: EmployerId,
    pub housekeeper_id: HousekeeperId,
    #[serde(default)]
    pub requirements: String,
    #[validate(range(exclusive_min = 0.0, message = "salary_offer must be positive"))]
    pub salary_offer: f64,
    pub start_date: NaiveDate,
    pub delivery_type: DeliveryType,
}

/// Body of a status update. `expected_status` lets a caller make the write
/// conditional on the status it last displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HiringStatusUpdate {
    pub status: HiringStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_status: Option<HiringStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct NewReview {
    pub employer_id: EmployerId,
    pub housekeeper_id: HousekeeperId,
    #[validate(range(min = 1, max = 5, message = "rating must be between 1 and 5"))]
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
}

/// Mean star rating, 0 when there are no reviews.
pub fn average_rating(reviews: &[Review]) -> f64 {
    if reviews.is_empty() {
        return 0.0;
    }
    let total: u32 = reviews.iter().map(|review| u32::from(review.rating)).sum();
    f64::from(total) / reviews.len() as f64
}

/// Dashboard counters for a housekeeper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HousekeeperStats {
    pub total_hirings: usize,
    pub pending_hirings: usize,
    pub completed_hirings: usize,
    pub average_rating: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
