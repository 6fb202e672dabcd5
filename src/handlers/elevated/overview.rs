// handlers/elevated/overview.rs - GET /admin/overview

use axum::extract::State;
use chrono::Utc;
use serde::Serialize;

use crate::database::models::{Contributor, DailyCount};
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::analytics;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub total_users: i64,
    pub total_public_lessons: i64,
    pub total_reported_lessons: i64,
    pub today_lessons: i64,
    pub lessons_per_day: Vec<DailyCount>,
    pub contributors: Vec<Contributor>,
}

/**
 * GET /admin/overview - dashboard snapshot
 *
 * Counts are computed on read; nothing is cached. `lessonsPerDay` covers
 * the trailing seven UTC days and lists only days that have lessons.
 */
pub async fn overview(State(state): State<AppState>) -> ApiResult<Overview> {
    let now = Utc::now();
    let (total_users, lessons) = tokio::try_join!(
        state.users.count(),
        state
            .lessons
            .overview(analytics::start_of_day(now), analytics::window_start(now)),
    )?;

    Ok(ApiResponse::success(Overview {
        total_users,
        total_public_lessons: lessons.total_public_lessons,
        total_reported_lessons: lessons.total_reported_lessons,
        today_lessons: lessons.today_lessons,
        lessons_per_day: lessons.lessons_per_day,
        contributors: lessons.contributors,
    }))
}
