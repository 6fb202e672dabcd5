use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod firebase;
pub mod shared_secret;

pub use firebase::FirebaseVerifier;
pub use shared_secret::SharedSecretVerifier;

/// Claims both verifiers read out of a token. Only `email` identifies the principal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    pub exp: i64,
    #[serde(default)]
    pub iat: i64,
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token carries no email claim")]
    MissingEmail,

    #[error("No signing key matches kid '{0}'")]
    UnknownKey(String),

    #[error("Failed to fetch signing keys: {0}")]
    KeyFetch(String),

    #[error("Failed to issue token: {0}")]
    Issue(String),
}

impl From<jsonwebtoken::errors::Error> for IdentityError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        IdentityError::InvalidToken(err.to_string())
    }
}

/// Turns a bearer credential into a verified principal email
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<String, IdentityError>;
}

/// Extract the principal from decoded claims, normalized for store lookups
pub(crate) fn principal_from(claims: Claims) -> Result<String, IdentityError> {
    claims
        .email
        .map(|email| crate::database::models::normalize_email(&email))
        .filter(|email| !email.is_empty())
        .ok_or(IdentityError::MissingEmail)
}
