//! Housekeeper hiring marketplace: accounts, profiles, hiring requests, and reviews.
//!
//! The service owns every rule about who may do what and which status moves
//! are legal. The HTTP router is a thin mapping onto it, and the client SDK in
//! [`crate::client`] speaks the same wire types defined in [`domain`].

pub mod auth;
pub mod domain;
pub mod lifecycle;
pub mod memory;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use auth::{AuthError, Claims, TokenIssuer};
pub use domain::{
    Category, DeliveryType, Employer, EmployerId, EmploymentType, HiringId, HiringRequest,
    HiringStatus, Housekeeper, HousekeeperFilter, HousekeeperId, Review, ReviewId, UserType,
};
pub use lifecycle::{HiringAction, StatusAppearance};
pub use memory::{InMemoryMarketplaceRepository, RecordingNotifier};
pub use repository::{
    HiringNotice, HiringNotifier, MarketplaceRepository, NotifyError, RepositoryError,
};
pub use router::{marketplace_router, AuthUser};
pub use service::{Caller, MarketplaceError, MarketplaceService};
