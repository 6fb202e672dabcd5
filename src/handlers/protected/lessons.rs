// handlers/protected/lessons.rs - lesson CRUD for authenticated callers

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Path, Query, State},
    Extension, Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::database::models::{Creator, Lesson, LessonUpdate, NewLesson};
use crate::error::ApiError;
use crate::filter::{LessonFilter, LessonQuery};
use crate::handlers::parse_id;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedLesson {
    pub inserted_id: Uuid,
    pub lesson: Lesson,
}

/**
 * POST /lessons - create a lesson authored by the caller
 *
 * Expected Input:
 * ```json
 * {
 *   "title": "string",           // Required
 *   "description": "string",
 *   "category": "string",
 *   "emotionalTone": "string",
 *   "image": "url",
 *   "accessLevel": "free|premium",
 *   "visibility": "public|private"
 * }
 * ```
 *
 * Unknown fields (likes, featured, creator, ...) are dropped. The creator
 * snapshot comes from the principal's user record.
 */
pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    payload: Result<Json<NewLesson>, JsonRejection>,
) -> ApiResult<CreatedLesson> {
    let Json(mut lesson) = payload?;
    lesson.title = lesson.title.trim().to_string();
    if lesson.title.is_empty() {
        return Err(ApiError::bad_request("title is required"));
    }

    let profile = state.users.find_by_email(&auth.email).await?;
    let creator = Creator {
        email: auth.email.clone(),
        name: profile.as_ref().and_then(|u| u.name.clone()),
        photo_url: profile.and_then(|u| u.photo_url),
    };

    let lesson = state.lessons.insert(lesson, creator).await?;
    info!("Lesson {} created by {}", lesson.id, auth.email);

    Ok(ApiResponse::created(CreatedLesson {
        inserted_id: lesson.id,
        lesson,
    }))
}

/// GET /lessons - filtered listing, newest first
pub async fn list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    query: Result<Query<LessonQuery>, QueryRejection>,
) -> ApiResult<Vec<Lesson>> {
    let Query(query) = query?;
    let filter = LessonFilter::from_query(query, &auth.email);
    let lessons = state.lessons.list(&filter).await?;
    Ok(ApiResponse::success(lessons))
}

/// GET /lessons/:id
pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Lesson> {
    let id = parse_id(&id, "lesson")?;
    let lesson = state
        .lessons
        .find(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Lesson {} not found", id)))?;
    Ok(ApiResponse::success(lesson))
}

/// Load the lesson and require the caller to be its creator or an admin
async fn load_owned(state: &AppState, id: Uuid, auth: &AuthUser) -> Result<Lesson, ApiError> {
    let lesson = state
        .lessons
        .find(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Lesson {} not found", id)))?;

    if lesson.is_owned_by(&auth.email) {
        return Ok(lesson);
    }

    let is_admin = state
        .users
        .find_by_email(&auth.email)
        .await?
        .map(|u| u.is_admin())
        .unwrap_or(false);
    if is_admin {
        Ok(lesson)
    } else {
        Err(ApiError::forbidden("Only the creator or an admin may modify this lesson"))
    }
}

/// PATCH /lessons/:id - allow-listed partial update by creator or admin
pub async fn update(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
    payload: Result<Json<LessonUpdate>, JsonRejection>,
) -> ApiResult<Lesson> {
    let id = parse_id(&id, "lesson")?;
    let Json(update) = payload?;
    if update.is_empty() {
        return Err(ApiError::bad_request("No updatable fields supplied"));
    }
    if update.title.as_deref().map(|t| t.trim().is_empty()).unwrap_or(false) {
        return Err(ApiError::bad_request("title cannot be empty"));
    }

    load_owned(&state, id, &auth).await?;
    let lesson = state.lessons.update(id, update).await?;
    Ok(ApiResponse::success(lesson))
}

/// DELETE /lessons/:id - creator or admin
pub async fn delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    let id = parse_id(&id, "lesson")?;
    load_owned(&state, id, &auth).await?;

    state.lessons.delete(id).await?;
    info!("Lesson {} deleted by {}", id, auth.email);
    Ok(ApiResponse::success(json!({ "deletedId": id })))
}
