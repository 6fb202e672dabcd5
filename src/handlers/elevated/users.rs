// handlers/elevated/users.rs - role and account administration

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};
use serde::Deserialize;
use tracing::info;

use crate::database::models::{AdminUserUpdate, Role, User};
use crate::error::ApiError;
use crate::handlers::parse_id;
use crate::middleware::{AdminUser, ApiResponse, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RoleUpdate {
    pub role: Role,
}

/// PATCH /users/:id/role
pub async fn update_role(
    State(state): State<AppState>,
    Extension(AdminUser(admin)): Extension<AdminUser>,
    Path(id): Path<String>,
    payload: Result<Json<RoleUpdate>, JsonRejection>,
) -> ApiResult<User> {
    let id = parse_id(&id, "user")?;
    let Json(update) = payload?;

    let user = state.users.update_role(id, update.role).await?;
    info!("{} set role of {} to {}", admin.email, user.email, user.role.as_str());
    Ok(ApiResponse::success(user))
}

/// PATCH /user/:id - allow-listed admin edit of any account
pub async fn update_user(
    State(state): State<AppState>,
    Extension(AdminUser(admin)): Extension<AdminUser>,
    Path(id): Path<String>,
    payload: Result<Json<AdminUserUpdate>, JsonRejection>,
) -> ApiResult<User> {
    let id = parse_id(&id, "user")?;
    let Json(update) = payload?;
    if update.is_empty() {
        return Err(ApiError::bad_request("No updatable fields supplied"));
    }

    let user = state.users.admin_update(id, update).await?;
    info!("{} updated user {}", admin.email, user.email);
    Ok(ApiResponse::success(user))
}
