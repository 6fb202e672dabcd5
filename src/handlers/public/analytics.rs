// handlers/public/analytics.rs - GET /analytics/accessLevel

use axum::extract::State;
use chrono::Utc;

use crate::database::models::AccessLevelCounts;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::analytics;
use crate::state::AppState;

/// GET /analytics/accessLevel - free/premium split of public lessons created
/// in the trailing week. Both keys are always present.
pub async fn access_level(State(state): State<AppState>) -> ApiResult<AccessLevelCounts> {
    let since = analytics::window_start(Utc::now());
    let counts = state.lessons.access_level_counts(since).await?;
    Ok(ApiResponse::success(counts))
}
