use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

/// Errors raised while assembling configuration at startup
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing configuration: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub identity: IdentityConfig,
    pub payments: PaymentConfig,
    pub security: SecurityConfig,
    pub lessons: LessonConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Postgres connection string, or `memory://` for the in-process store
    pub url: String,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Firebase project whose ID tokens are accepted
    pub firebase_project_id: Option<String>,
    /// HS256 secret for locally issued tokens
    pub jwt_secret: Option<String>,
    pub jwks_url: String,
    pub token_expiry_hours: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentConfig {
    pub stripe_secret_key: String,
    pub api_base: String,
    pub product_name: String,
    pub price_cents: i64,
    pub currency: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub cors_origins: Vec<String>,
    /// Base URL of the web client, used for checkout redirects
    pub client_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LessonConfig {
    pub default_page_limit: i64,
    pub max_page_limit: i64,
    pub showcase_limit: i64,
}

const GOOGLE_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup. Required keys fail fast.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = match lookup("APP_ENV").as_deref() {
            Some("production") | Some("prod") => Environment::Production,
            Some("staging") | Some("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let stripe_secret_key =
            lookup("STRIPE_SECRET_KEY").ok_or(ConfigError::Missing("STRIPE_SECRET_KEY"))?;
        let client_url = lookup("CLIENT_URL").ok_or(ConfigError::Missing("CLIENT_URL"))?;
        url::Url::parse(&client_url).map_err(|_| ConfigError::Invalid {
            key: "CLIENT_URL",
            value: client_url.clone(),
        })?;

        let firebase_project_id = lookup("FIREBASE_PROJECT_ID").filter(|v| !v.trim().is_empty());
        let jwt_secret = lookup("AUTH_JWT_SECRET").filter(|v| !v.trim().is_empty());
        if firebase_project_id.is_none() && jwt_secret.is_none() {
            return Err(ConfigError::Missing("FIREBASE_PROJECT_ID or AUTH_JWT_SECRET"));
        }

        let mut config = match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        };

        config.database.url = database_url;
        config.payments.stripe_secret_key = stripe_secret_key;
        config.identity.firebase_project_id = firebase_project_id;
        config.identity.jwt_secret = jwt_secret;
        // Client origin is always allowed for CORS
        config.security.cors_origins = vec![client_url.trim_end_matches('/').to_string()];
        config.security.client_url = client_url;

        config.with_overrides(&lookup)
    }

    fn with_overrides<F>(mut self, lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("PORT") {
            self.server.port = parse_key("PORT", &v)?;
        }

        if let Some(v) = lookup("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_key("DATABASE_MAX_CONNECTIONS", &v)?;
        }
        if let Some(v) = lookup("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = parse_key("DATABASE_CONNECTION_TIMEOUT", &v)?;
        }

        if let Some(v) = lookup("FIREBASE_JWKS_URL") {
            self.identity.jwks_url = v;
        }
        if let Some(v) = lookup("AUTH_TOKEN_EXPIRY_HOURS") {
            self.identity.token_expiry_hours = parse_key("AUTH_TOKEN_EXPIRY_HOURS", &v)?;
        }

        if let Some(v) = lookup("STRIPE_API_BASE") {
            self.payments.api_base = v;
        }
        if let Some(v) = lookup("PREMIUM_PRODUCT_NAME") {
            self.payments.product_name = v;
        }
        if let Some(v) = lookup("PREMIUM_PRICE_CENTS") {
            self.payments.price_cents = parse_key("PREMIUM_PRICE_CENTS", &v)?;
        }
        if let Some(v) = lookup("PREMIUM_CURRENCY") {
            self.payments.currency = v.to_lowercase();
        }

        if let Some(v) = lookup("CORS_ORIGINS") {
            // Extra origins on top of the client URL
            for origin in v.split(',').map(|s| s.trim()).filter(|s| !s.is_empty()) {
                let origin = origin.trim_end_matches('/').to_string();
                if !self.security.cors_origins.contains(&origin) {
                    self.security.cors_origins.push(origin);
                }
            }
        }

        if let Some(v) = lookup("LESSONS_DEFAULT_PAGE_LIMIT") {
            self.lessons.default_page_limit = parse_key("LESSONS_DEFAULT_PAGE_LIMIT", &v)?;
        }
        if let Some(v) = lookup("LESSONS_MAX_PAGE_LIMIT") {
            self.lessons.max_page_limit = parse_key("LESSONS_MAX_PAGE_LIMIT", &v)?;
        }

        Ok(self)
    }

    /// Whether the store is the in-process one rather than Postgres
    pub fn uses_memory_store(&self) -> bool {
        self.database.url.starts_with("memory:")
    }

    fn base(environment: Environment) -> Self {
        Self {
            environment,
            server: ServerConfig { port: 3000 },
            database: DatabaseConfig {
                url: String::new(),
                max_connections: 10,
                connection_timeout: 30,
            },
            identity: IdentityConfig {
                firebase_project_id: None,
                jwt_secret: None,
                jwks_url: GOOGLE_JWKS_URL.to_string(),
                token_expiry_hours: 24,
            },
            payments: PaymentConfig {
                stripe_secret_key: String::new(),
                api_base: "https://api.stripe.com".to_string(),
                product_name: "Premium Lifetime".to_string(),
                price_cents: 1500,
                currency: "usd".to_string(),
                request_timeout_secs: 30,
            },
            security: SecurityConfig {
                cors_origins: Vec::new(),
                client_url: String::new(),
            },
            lessons: LessonConfig {
                default_page_limit: 6,
                max_page_limit: 100,
                showcase_limit: 6,
            },
        }
    }

    fn development() -> Self {
        let mut config = Self::base(Environment::Development);
        config.identity.token_expiry_hours = 24 * 7; // 1 week
        config
    }

    fn staging() -> Self {
        let mut config = Self::base(Environment::Staging);
        config.database.max_connections = 20;
        config.database.connection_timeout = 10;
        config.lessons.max_page_limit = 50;
        config
    }

    fn production() -> Self {
        let mut config = Self::base(Environment::Production);
        config.database.max_connections = 50;
        config.database.connection_timeout = 5;
        config.identity.token_expiry_hours = 4;
        config.payments.request_timeout_secs = 15;
        config.lessons.max_page_limit = 50;
        config
    }
}

fn parse_key<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        value: value.to_string(),
    })
}
