use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use super::{principal_from, Claims, IdentityError, IdentityVerifier};

/// HS256 tokens signed with a local secret. Used for development and tests.
pub struct SharedSecretVerifier {
    secret: String,
    expiry_hours: u64,
}

impl SharedSecretVerifier {
    pub fn new(secret: impl Into<String>, expiry_hours: u64) -> Self {
        Self {
            secret: secret.into(),
            expiry_hours,
        }
    }

    /// Sign a token for `email`
    pub fn issue(&self, email: &str) -> Result<String, IdentityError> {
        if self.secret.is_empty() {
            return Err(IdentityError::Issue("secret is empty".to_string()));
        }

        let now = Utc::now();
        let claims = Claims {
            sub: email.to_string(),
            email: Some(email.to_string()),
            exp: (now + Duration::hours(self.expiry_hours as i64)).timestamp(),
            iat: now.timestamp(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| IdentityError::Issue(e.to_string()))
    }
}

#[async_trait]
impl IdentityVerifier for SharedSecretVerifier {
    async fn verify(&self, token: &str) -> Result<String, IdentityError> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )?;
        principal_from(data.claims)
    }
}
