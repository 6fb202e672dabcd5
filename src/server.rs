use std::sync::Arc;

use anyhow::{bail, Context};
use tracing::info;

use crate::app;
use crate::auth::{FirebaseVerifier, IdentityVerifier, SharedSecretVerifier};
use crate::config::AppConfig;
use crate::database::{DatabaseManager, InMemoryStore, PgLessonRepository, PgUserRepository};
use crate::payments::StripeGateway;
use crate::state::AppState;

/// Pick the identity verifier: Firebase when a project id is configured,
/// otherwise locally signed tokens
pub fn identity_verifier(config: &AppConfig) -> anyhow::Result<Arc<dyn IdentityVerifier>> {
    let identity = &config.identity;
    if let Some(project_id) = &identity.firebase_project_id {
        info!("Verifying Firebase ID tokens for project {}", project_id);
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.payments.request_timeout_secs))
            .build()
            .context("failed to build HTTP client")?;
        return Ok(Arc::new(FirebaseVerifier::new(project_id.clone(), identity.jwks_url.clone(), client)));
    }

    match &identity.jwt_secret {
        Some(secret) => {
            info!("Verifying locally signed tokens");
            Ok(Arc::new(SharedSecretVerifier::new(secret.clone(), identity.token_expiry_hours)))
        }
        None => bail!("no identity verifier configured"),
    }
}

/// Open the store and external clients once; everything is shared through `AppState`
pub async fn build_state(config: AppConfig) -> anyhow::Result<AppState> {
    let identity = identity_verifier(&config)?;
    let payments = Arc::new(StripeGateway::new(&config.payments).context("failed to build payment gateway")?);

    let state = if config.uses_memory_store() {
        info!("Using in-memory store; data is lost on exit");
        let store = Arc::new(InMemoryStore::new());
        AppState {
            users: store.clone(),
            lessons: store,
            identity,
            payments,
            config: Arc::new(config),
        }
    } else {
        let pool = DatabaseManager::connect(&config.database)
            .await
            .context("failed to connect to database")?;
        DatabaseManager::migrate(&pool).await.context("failed to run migrations")?;

        AppState {
            users: Arc::new(PgUserRepository::new(pool.clone())),
            lessons: Arc::new(PgLessonRepository::new(pool)),
            identity,
            payments,
            config: Arc::new(config),
        }
    };

    Ok(state)
}

pub async fn serve(config: AppConfig) -> anyhow::Result<()> {
    info!("Starting lessons API in {:?} mode", config.environment);
    let port = config.server.port;
    let state = build_state(config).await?;

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    info!("Lessons API listening on http://{}", bind_addr);

    axum::serve(listener, app::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received");
}
