#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use lessons_api::auth::SharedSecretVerifier;
use lessons_api::config::AppConfig;
use lessons_api::database::models::{NewUser, Registration, Role, User};
use lessons_api::database::{InMemoryStore, UserRepository};
use lessons_api::payments::{CheckoutRequest, CheckoutSession, PaymentError, PaymentGateway, PaymentStatus};
use lessons_api::{router, AppState};

pub const SECRET: &str = "integration-secret";

/// Gateway double: sessions are whatever the test scripted
#[derive(Default)]
pub struct ScriptedGateway {
    sessions: Mutex<HashMap<String, CheckoutSession>>,
    pub created: Mutex<Vec<CheckoutRequest>>,
}

impl ScriptedGateway {
    pub fn script(&self, id: &str, status: PaymentStatus, intent: Option<&str>, email: &str) {
        let session = CheckoutSession {
            id: id.to_string(),
            url: None,
            payment_status: status,
            payment_intent: intent.map(str::to_string),
            customer_email: Some(email.to_string()),
            metadata: HashMap::from([("email".to_string(), email.to_string())]),
        };
        self.sessions.lock().unwrap().insert(id.to_string(), session);
    }
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
    async fn create_checkout(&self, request: CheckoutRequest) -> Result<CheckoutSession, PaymentError> {
        let mut created = self.created.lock().unwrap();
        let id = format!("cs_test_{}", created.len() + 1);
        created.push(request);
        Ok(CheckoutSession {
            id: id.clone(),
            url: Some(format!("https://checkout.test/{}", id)),
            payment_status: PaymentStatus::Unpaid,
            payment_intent: None,
            customer_email: None,
            metadata: HashMap::new(),
        })
    }

    async fn retrieve_session(&self, session_id: &str) -> Result<CheckoutSession, PaymentError> {
        self.sessions
            .lock()
            .unwrap()
            .get(session_id)
            .cloned()
            .ok_or_else(|| PaymentError::Gateway {
                status: 404,
                message: format!("No such checkout.session: {}", session_id),
            })
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryStore>,
    pub gateway: Arc<ScriptedGateway>,
    verifier: SharedSecretVerifier,
}

pub fn test_config() -> Result<AppConfig> {
    let vars: HashMap<&str, &str> = HashMap::from([
        ("DATABASE_URL", "memory://"),
        ("STRIPE_SECRET_KEY", "sk_test_dummy"),
        ("CLIENT_URL", "http://localhost:5173"),
        ("AUTH_JWT_SECRET", SECRET),
    ]);
    AppConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string())).context("test config")
}

impl TestApp {
    pub fn new() -> Result<Self> {
        let config = test_config()?;
        let store = Arc::new(InMemoryStore::new());
        let gateway = Arc::new(ScriptedGateway::default());
        let verifier = SharedSecretVerifier::new(SECRET, 1);

        let state = AppState {
            users: store.clone(),
            lessons: store.clone(),
            identity: Arc::new(SharedSecretVerifier::new(SECRET, 1)),
            payments: gateway.clone(),
            config: Arc::new(config),
        };

        Ok(Self {
            router: router(state),
            store,
            gateway,
            verifier,
        })
    }

    pub fn token(&self, email: &str) -> String {
        self.verifier.issue(email).expect("issue token")
    }

    /// Register a user directly in the store
    pub async fn user(&self, email: &str, name: &str) -> Result<User> {
        let registration = self
            .store
            .register(NewUser {
                email: email.to_string(),
                name: Some(name.to_string()),
                photo_url: Some(format!("https://img.test/{}.png", name)),
            })
            .await?;
        Ok(match registration {
            Registration::Created(user) | Registration::Existing(user) => user,
        })
    }

    pub async fn admin(&self, email: &str) -> Result<User> {
        let user = self.user(email, "admin").await?;
        Ok(self.store.update_role(user.id, Role::Admin).await?)
    }

    /// Send a request through the router; returns the status and parsed JSON body
    pub async fn send(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&json)?))?,
            None => builder.body(Body::empty())?,
        };

        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        Ok((status, value))
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Result<(StatusCode, Value)> {
        self.send(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> Result<(StatusCode, Value)> {
        self.send(Method::POST, uri, token, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: Option<&str>, body: Option<Value>) -> Result<(StatusCode, Value)> {
        self.send(Method::PATCH, uri, token, body).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> Result<(StatusCode, Value)> {
        self.send(Method::DELETE, uri, token, None).await
    }

    /// Create a lesson as `email` and return its id
    pub async fn lesson(&self, email: &str, body: Value) -> Result<String> {
        let token = self.token(email);
        let (status, json) = self.post("/lessons", Some(&token), body).await?;
        anyhow::ensure!(status == StatusCode::CREATED, "create lesson failed: {} {}", status, json);
        json["data"]["insertedId"]
            .as_str()
            .map(str::to_string)
            .context("insertedId missing")
    }
}
