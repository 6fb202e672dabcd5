use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::{principal_from, Claims, IdentityError, IdentityVerifier};

const KEY_TTL: Duration = Duration::from_secs(60 * 60);

struct CachedKeys {
    keys: JwkSet,
    fetched_at: Instant,
}

/// Verifies Firebase ID tokens (RS256) against Google's published signing keys
pub struct FirebaseVerifier {
    project_id: String,
    jwks_url: String,
    client: reqwest::Client,
    cache: RwLock<Option<CachedKeys>>,
}

impl FirebaseVerifier {
    pub fn new(project_id: impl Into<String>, jwks_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            project_id: project_id.into(),
            jwks_url: jwks_url.into(),
            client,
            cache: RwLock::new(None),
        }
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[self.project_id.as_str()]);
        validation.set_issuer(&[format!("https://securetoken.google.com/{}", self.project_id)]);
        validation
    }

    async fn fetch_keys(&self) -> Result<JwkSet, IdentityError> {
        let keys = self
            .client
            .get(&self.jwks_url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| IdentityError::KeyFetch(e.to_string()))?
            .json::<JwkSet>()
            .await
            .map_err(|e| IdentityError::KeyFetch(e.to_string()))?;

        info!("Fetched {} identity signing keys", keys.keys.len());
        Ok(keys)
    }

    /// Resolve the decoding key for `kid`, refreshing the cache when stale or
    /// when the key is not in it
    async fn key_for(&self, kid: &str) -> Result<DecodingKey, IdentityError> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.fetched_at.elapsed() < KEY_TTL {
                    if let Some(jwk) = cached.keys.find(kid) {
                        return Ok(DecodingKey::from_jwk(jwk)?);
                    }
                    debug!("Signing key {} not cached, refetching", kid);
                }
            }
        }

        let keys = self.fetch_keys().await?;
        let key = match keys.find(kid) {
            Some(jwk) => DecodingKey::from_jwk(jwk)?,
            None => return Err(IdentityError::UnknownKey(kid.to_string())),
        };

        *self.cache.write().await = Some(CachedKeys {
            keys,
            fetched_at: Instant::now(),
        });
        Ok(key)
    }
}

#[async_trait]
impl IdentityVerifier for FirebaseVerifier {
    async fn verify(&self, token: &str) -> Result<String, IdentityError> {
        let header = decode_header(token)?;
        if header.alg != Algorithm::RS256 {
            return Err(IdentityError::InvalidToken(format!("unexpected algorithm {:?}", header.alg)));
        }
        let kid = header
            .kid
            .ok_or_else(|| IdentityError::InvalidToken("missing kid".to_string()))?;

        let key = self.key_for(&kid).await?;
        let data = decode::<Claims>(token, &key, &self.validation())?;
        principal_from(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::SharedSecretVerifier;

    fn verifier() -> FirebaseVerifier {
        FirebaseVerifier::new("life-lessons", "http://127.0.0.1:9/keys", reqwest::Client::new())
    }

    #[tokio::test]
    async fn rejects_tokens_with_the_wrong_algorithm() {
        let token = SharedSecretVerifier::new("secret", 1).issue("a@x.com").unwrap();
        let err = verifier().verify(&token).await.unwrap_err();
        assert!(matches!(err, IdentityError::InvalidToken(_)));
    }

    #[tokio::test]
    async fn rejects_malformed_tokens() {
        assert!(matches!(
            verifier().verify("garbage").await,
            Err(IdentityError::InvalidToken(_))
        ));
    }

    #[test]
    fn validation_pins_audience_and_issuer() {
        let validation = verifier().validation();
        assert!(validation.aud.as_ref().unwrap().contains("life-lessons"));
        assert!(validation
            .iss
            .as_ref()
            .unwrap()
            .contains("https://securetoken.google.com/life-lessons"));
    }
}
