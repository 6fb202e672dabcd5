// handlers/public/payments.rs - payment reconciliation entry points
//
// Both paths re-read the session from the gateway; nothing the caller sends
// besides the session id is trusted.

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{self, Reconciliation};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SessionQuery {
    pub session_id: Option<String>,
}

/// PATCH /session-status?session_id=... - client redirect callback
pub async fn session_status(
    State(state): State<AppState>,
    query: Result<Query<SessionQuery>, QueryRejection>,
) -> ApiResult<Reconciliation> {
    let Query(query) = query?;
    let session_id = query
        .session_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("session_id is required"))?;

    let session = state.payments.retrieve_session(&session_id).await?;
    let outcome = services::reconcile(state.users.as_ref(), &session).await?;
    Ok(ApiResponse::success(outcome))
}

#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookData,
}

#[derive(Debug, Deserialize)]
pub struct WebhookData {
    pub object: WebhookObject,
}

#[derive(Debug, Deserialize)]
pub struct WebhookObject {
    pub id: String,
}

const RECONCILED_EVENTS: [&str; 2] = [
    "checkout.session.completed",
    "checkout.session.async_payment_succeeded",
];

/// POST /webhooks/payment - server-to-server gateway callback
pub async fn webhook(
    State(state): State<AppState>,
    payload: Result<Json<WebhookEvent>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(event) = payload?;

    if !RECONCILED_EVENTS.contains(&event.event_type.as_str()) {
        debug!("Ignoring payment event {}", event.event_type);
        return Ok(ApiResponse::success(json!({ "received": true })));
    }

    info!("Payment event {} for session {}", event.event_type, event.data.object.id);
    let session = state.payments.retrieve_session(&event.data.object.id).await?;
    let outcome = services::reconcile(state.users.as_ref(), &session).await?;

    Ok(ApiResponse::success(json!({ "received": true, "reconciliation": outcome })))
}
