// handlers/public/users.rs - registration and role lookup

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde::Serialize;
use tracing::info;

use crate::database::models::{normalize_email, NewUser, Registration, Role, User};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

/**
 * POST /users - idempotent registration
 *
 * Expected Input:
 * ```json
 * { "email": "string", "name": "string?", "photoURL": "string?" }
 * ```
 *
 * Role and premium flag are never taken from the body. A second call with
 * the same email returns the stored record unchanged.
 *
 * @returns 201 with the new user, or 200 with the existing one
 */
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<NewUser>, JsonRejection>,
) -> ApiResult<User> {
    let Json(user) = payload?;
    if normalize_email(&user.email).is_empty() {
        return Err(ApiError::bad_request("email is required"));
    }

    match state.users.register(user).await? {
        Registration::Created(user) => {
            info!("New user registered: {}", user.email);
            Ok(ApiResponse::created(user))
        }
        Registration::Existing(user) => Ok(ApiResponse::success(user)),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleInfo {
    pub role: Role,
    pub is_premium: bool,
}

/// GET /users/:email/role - unknown emails get the defaults, never an error
pub async fn role(State(state): State<AppState>, Path(email): Path<String>) -> ApiResult<RoleInfo> {
    let info = match state.users.find_by_email(&email).await? {
        Some(user) => RoleInfo {
            role: user.role,
            is_premium: user.is_premium,
        },
        None => RoleInfo {
            role: Role::User,
            is_premium: false,
        },
    };
    Ok(ApiResponse::success(info))
}
