//! Password hashing and bearer-token handling.
//!
//! Tokens are HS256 JWTs carrying [`Claims`]. The service signs and verifies
//! them; the client only reads the payload to learn who is logged in.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{TimeDelta, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::domain::UserType;
use crate::config::AuthConfig;

/// Payload embedded in every issued token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: String,
    pub user_type: UserType,
    pub exp: i64,
    #[serde(default)]
    pub iat: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error("token lifetime of {0} hours is out of range")]
    Lifetime(i64),
    #[error("token could not be issued: {0}")]
    Issue(#[source] jsonwebtoken::errors::Error),
    #[error("token rejected: {0}")]
    Invalid(#[source] jsonwebtoken::errors::Error),
}

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| AuthError::Hash(err.to_string()))
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(hash).map_err(|err| AuthError::Hash(err.to_string()))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(err) => Err(AuthError::Hash(err.to_string())),
    }
}

/// Signs and verifies tokens with the configured secret.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_hours: i64,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            ttl_hours: config.token_ttl_hours,
        }
    }

    pub fn issue(&self, user_id: &str, user_type: UserType) -> Result<String, AuthError> {
        let now = Utc::now();
        let expires_at = TimeDelta::try_hours(self.ttl_hours)
            .filter(|ttl| *ttl > TimeDelta::zero())
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or(AuthError::Lifetime(self.ttl_hours))?;
        let claims = Claims {
            user_id: user_id.to_string(),
            user_type,
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding).map_err(AuthError::Issue)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(AuthError::Invalid)
    }
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("ttl_hours", &self.ttl_hours)
            .finish_non_exhaustive()
    }
}

/// Read the claims of a token without checking signature or expiry.
///
/// Only for displaying who is logged in; authorization stays with the service.
pub fn read_claims_unverified(token: &str) -> Result<Claims, AuthError> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.required_spec_claims.clear();
    decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
        .map_err(AuthError::Invalid)
}
