// handlers/public/lessons.rs - anonymous lesson listings

use axum::extract::{rejection::QueryRejection, Query, State};

use crate::database::models::{Contributor, Lesson};
use crate::filter::{LessonPage, PublicLessonFilter, PublicLessonQuery};
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

/**
 * GET /public-lessons - paginated public listing
 *
 * Query: `category`, `emotionalTone`, `search` (title substring, case
 * insensitive), `skip`, `limit`. Visibility is always forced to public.
 *
 * @returns `{ total, result }` where `total` ignores pagination
 */
pub async fn public_lessons(
    State(state): State<AppState>,
    query: Result<Query<PublicLessonQuery>, QueryRejection>,
) -> ApiResult<LessonPage> {
    let Query(query) = query?;
    let limits = &state.config.lessons;
    let filter = PublicLessonFilter::from_query(query, limits.default_page_limit, limits.max_page_limit)?;

    let page = state.lessons.list_public(&filter).await?;
    Ok(ApiResponse::success(page))
}

/// GET /lessons/featured
pub async fn featured(State(state): State<AppState>) -> ApiResult<Vec<Lesson>> {
    let lessons = state.lessons.featured(state.config.lessons.showcase_limit).await?;
    Ok(ApiResponse::success(lessons))
}

/// GET /lessons/most-favorites - public lessons ranked by favorite count
pub async fn most_favorites(State(state): State<AppState>) -> ApiResult<Vec<Lesson>> {
    let lessons = state.lessons.most_favorited(state.config.lessons.showcase_limit).await?;
    Ok(ApiResponse::success(lessons))
}

/// GET /users/top-contributors
pub async fn top_contributors(State(state): State<AppState>) -> ApiResult<Vec<Contributor>> {
    let contributors = state
        .lessons
        .top_contributors(Some(state.config.lessons.showcase_limit))
        .await?;
    Ok(ApiResponse::success(contributors))
}
