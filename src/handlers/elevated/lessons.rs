// handlers/elevated/lessons.rs - lesson moderation

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};
use serde::Deserialize;
use tracing::info;

use crate::database::models::{Lesson, Report};
use crate::handlers::parse_id;
use crate::middleware::{AdminUser, ApiResponse, ApiResult};
use crate::state::AppState;

/// Only `featured` is accepted; other fields are rejected by the extractor
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeaturedUpdate {
    pub featured: bool,
}

/// PATCH /lessons/:id/featured
pub async fn set_featured(
    State(state): State<AppState>,
    Extension(AdminUser(admin)): Extension<AdminUser>,
    Path(id): Path<String>,
    payload: Result<Json<FeaturedUpdate>, JsonRejection>,
) -> ApiResult<Lesson> {
    let id = parse_id(&id, "lesson")?;
    let Json(update) = payload?;

    let lesson = state.lessons.set_featured(id, update.featured).await?;
    info!("Lesson {} featured={} by {}", id, update.featured, admin.email);
    Ok(ApiResponse::success(lesson))
}

/// GET /lessons/:id/reports - newest first
pub async fn reports(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Vec<Report>> {
    let id = parse_id(&id, "lesson")?;
    let reports = state.lessons.reports_for(id).await?;
    Ok(ApiResponse::success(reports))
}
