// handlers/protected/users.rs - user listing and self-service profile

use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};

use crate::database::models::{ProfileUpdate, User};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

/// GET /users - every user except the caller, newest first
pub async fn list(State(state): State<AppState>, Extension(auth): Extension<AuthUser>) -> ApiResult<Vec<User>> {
    let users = state.users.list_except(&auth.email).await?;
    Ok(ApiResponse::success(users))
}

/// PATCH /users - update the caller's own name and photo
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    payload: Result<Json<ProfileUpdate>, JsonRejection>,
) -> ApiResult<User> {
    let Json(update) = payload?;
    if update.is_empty() {
        return Err(ApiError::bad_request("No updatable fields supplied"));
    }

    let user = state.users.update_profile(&auth.email, update).await?;
    Ok(ApiResponse::success(user))
}
