use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use super::AuthUser;
use crate::database::models::User;
use crate::error::ApiError;
use crate::state::AppState;

/// Admin record attached by [`verify_admin`]
#[derive(Clone, Debug)]
pub struct AdminUser(pub User);

/// Admin gate. Runs after `verify_principal`; the principal must have a user
/// record with role `admin`.
pub async fn verify_admin(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let email = request
        .extensions()
        .get::<AuthUser>()
        .map(|user| user.email.clone())
        .ok_or_else(|| ApiError::unauthorized("Unauthorized access"))?;

    let user = match state.users.find_by_email(&email).await? {
        Some(user) if user.is_admin() => user,
        _ => {
            tracing::warn!("Admin access denied for {}", email);
            return Err(ApiError::forbidden("Forbidden access"));
        }
    };

    request.extensions_mut().insert(AdminUser(user));
    Ok(next.run(request).await)
}
