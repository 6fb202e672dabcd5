// handlers/protected/reactions.rs - likes, favorites, comments and reports

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::database::models::{Comment, NewReport, Reaction, Report, ReportRequest};
use crate::error::ApiError;
use crate::handlers::parse_id;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

async fn toggle(state: AppState, auth: AuthUser, id: String, reaction: Reaction) -> ApiResult<Value> {
    let id = parse_id(&id, "lesson")?;
    let toggled = state.lessons.toggle_reaction(id, reaction, &auth.email).await?;

    let mut body = json!({
        "active": toggled.active,
        "count": toggled.members.len(),
    });
    body[reaction.column()] = json!(toggled.members);
    Ok(ApiResponse::success(body))
}

/// PATCH /lesson/:id/likes - toggle the caller's like
pub async fn toggle_like(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    toggle(state, auth, id, Reaction::Like).await
}

/// PATCH /lesson/:id/favorites - toggle the caller's favorite
pub async fn toggle_favorite(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    toggle(state, auth, id, Reaction::Favorite).await
}

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    #[serde(alias = "comment")]
    pub text: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
}

/// PATCH /lesson/:id/comments - append a comment, returns the full sequence
pub async fn add_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
    payload: Result<Json<CommentRequest>, JsonRejection>,
) -> ApiResult<Vec<Comment>> {
    let id = parse_id(&id, "lesson")?;
    let Json(request) = payload?;
    let text = request
        .text
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::bad_request("comment text is required"))?;

    // Stored profile wins over whatever the client claims
    let profile = state.users.find_by_email(&auth.email).await?;
    let comment = Comment {
        name: profile.as_ref().and_then(|u| u.name.clone()).or(request.name),
        email: auth.email.clone(),
        photo_url: profile.and_then(|u| u.photo_url).or(request.photo_url),
        text,
        created_at: Utc::now(),
    };

    let comments = state.lessons.add_comment(id, comment).await?;
    Ok(ApiResponse::success(comments))
}

/// PATCH /report/:id - report a lesson; a repeat report replaces the reason
pub async fn add_report(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
    payload: Result<Json<ReportRequest>, JsonRejection>,
) -> ApiResult<Report> {
    let id = parse_id(&id, "lesson")?;
    let Json(request) = payload?;
    let reason = request.reason.trim().to_string();
    if reason.is_empty() {
        return Err(ApiError::bad_request("reason is required"));
    }

    let report = state
        .lessons
        .add_report(NewReport {
            lesson_id: id,
            reporter_email: auth.email.clone(),
            reason,
            details: request.details.filter(|d| !d.trim().is_empty()),
        })
        .await?;

    tracing::warn!("Lesson {} reported by {}", id, auth.email);
    Ok(ApiResponse::success(report))
}
