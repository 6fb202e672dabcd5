use serde::{Deserialize, Serialize};

use super::error::FilterError;
use crate::database::models::{Lesson, Visibility};

/// Query string of GET /public-lessons
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicLessonQuery {
    pub category: Option<String>,
    pub emotional_tone: Option<String>,
    pub search: Option<String>,
    /// Accepted for client compatibility; anything but `public` is ignored
    pub visibility: Option<Visibility>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

/// Query string of GET /lessons
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonQuery {
    pub email: Option<String>,
    pub visibility: Option<Visibility>,
    pub emotional_tone: Option<String>,
    pub category: Option<String>,
    pub favorites: Option<bool>,
    pub reports: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub skip: i64,
    pub limit: i64,
}

impl Page {
    pub fn new(skip: Option<i64>, limit: Option<i64>, default_limit: i64, max_limit: i64) -> Result<Self, FilterError> {
        let skip = skip.unwrap_or(0);
        if skip < 0 {
            return Err(FilterError::InvalidSkip("skip must be non-negative".to_string()));
        }

        let limit = limit.unwrap_or(default_limit);
        if limit <= 0 {
            return Err(FilterError::InvalidLimit("limit must be positive".to_string()));
        }

        Ok(Self {
            skip,
            limit: limit.min(max_limit),
        })
    }
}

/// Filters for the anonymous listing. Visibility is always public.
#[derive(Debug, Clone, PartialEq)]
pub struct PublicLessonFilter {
    pub category: Option<String>,
    pub emotional_tone: Option<String>,
    pub search: Option<String>,
    pub page: Page,
}

impl PublicLessonFilter {
    pub fn from_query(query: PublicLessonQuery, default_limit: i64, max_limit: i64) -> Result<Self, FilterError> {
        let page = Page::new(query.skip, query.limit, default_limit, max_limit)?;

        let search = non_blank(query.search);
        if let Some(term) = &search {
            if term.chars().count() > 200 {
                return Err(FilterError::InvalidSearch("search term too long".to_string()));
            }
        }

        if let Some(visibility) = query.visibility {
            if visibility != Visibility::Public {
                tracing::debug!("Ignoring visibility={} on public listing", visibility.as_str());
            }
        }

        Ok(Self {
            category: non_blank(query.category),
            emotional_tone: non_blank(query.emotional_tone),
            search,
            page,
        })
    }

    pub fn matches(&self, lesson: &Lesson) -> bool {
        lesson.visibility == Visibility::Public
            && eq_opt(&self.category, &lesson.category)
            && eq_opt(&self.emotional_tone, &lesson.emotional_tone)
            && self
                .search
                .as_ref()
                .map(|term| lesson.title.to_lowercase().contains(&term.to_lowercase()))
                .unwrap_or(true)
    }
}

/// Filters for the authenticated listing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LessonFilter {
    pub creator_email: Option<String>,
    pub visibility: Option<Visibility>,
    pub emotional_tone: Option<String>,
    pub category: Option<String>,
    /// Restrict to lessons this principal has favorited
    pub favorited_by: Option<String>,
    pub reported_only: bool,
}

impl LessonFilter {
    pub fn from_query(query: LessonQuery, principal: &str) -> Self {
        Self {
            creator_email: non_blank(query.email),
            visibility: query.visibility,
            emotional_tone: non_blank(query.emotional_tone),
            category: non_blank(query.category),
            favorited_by: query.favorites.unwrap_or(false).then(|| principal.to_string()),
            reported_only: query.reports.unwrap_or(false),
        }
    }

    pub fn matches(&self, lesson: &Lesson) -> bool {
        self.creator_email
            .as_ref()
            .map(|email| lesson.is_owned_by(email))
            .unwrap_or(true)
            && self.visibility.map(|v| v == lesson.visibility).unwrap_or(true)
            && eq_opt(&self.emotional_tone, &lesson.emotional_tone)
            && eq_opt(&self.category, &lesson.category)
            && self
                .favorited_by
                .as_ref()
                .map(|email| lesson.favorites.contains(email))
                .unwrap_or(true)
            && (!self.reported_only || lesson.report_count > 0)
    }
}

/// One page of the public listing plus the unpaginated total
#[derive(Debug, Clone, Serialize)]
pub struct LessonPage {
    pub total: i64,
    pub result: Vec<Lesson>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn eq_opt(wanted: &Option<String>, actual: &Option<String>) -> bool {
    match wanted {
        Some(w) => actual.as_deref() == Some(w.as_str()),
        None => true,
    }
}
