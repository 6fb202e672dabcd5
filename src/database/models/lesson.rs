use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    #[default]
    Free,
    Premium,
}

impl AccessLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessLevel::Free => "free",
            AccessLevel::Premium => "premium",
        }
    }
}

impl FromStr for AccessLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(AccessLevel::Free),
            "premium" => Ok(AccessLevel::Premium),
            other => Err(format!("unknown access level '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
        }
    }
}

impl FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Visibility::Public),
            "private" => Ok(Visibility::Private),
            other => Err(format!("unknown visibility '{}'", other)),
        }
    }
}

/// Author snapshot embedded in a lesson at creation time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Creator {
    pub email: String,
    pub name: Option<String>,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub name: Option<String>,
    pub email: String,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub emotional_tone: Option<String>,
    pub image: Option<String>,
    pub access_level: AccessLevel,
    pub visibility: Visibility,
    pub creator: Creator,
    pub featured: bool,
    pub likes: Vec<String>,
    pub favorites: Vec<String>,
    pub comments: Vec<Comment>,
    pub report_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lesson {
    pub fn is_owned_by(&self, email: &str) -> bool {
        self.creator.email.eq_ignore_ascii_case(email)
    }
}

/// Client body for POST /lessons
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLesson {
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub emotional_tone: Option<String>,
    pub image: Option<String>,
    #[serde(default)]
    pub access_level: AccessLevel,
    #[serde(default)]
    pub visibility: Visibility,
}

/// Content fields the creator (or an admin) may change
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub emotional_tone: Option<String>,
    pub image: Option<String>,
    pub access_level: Option<AccessLevel>,
    pub visibility: Option<Visibility>,
}

impl LessonUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.emotional_tone.is_none()
            && self.image.is_none()
            && self.access_level.is_none()
            && self.visibility.is_none()
    }
}

/// Membership sets on a lesson that support toggling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reaction {
    Like,
    Favorite,
}

impl Reaction {
    pub fn column(&self) -> &'static str {
        match self {
            Reaction::Like => "likes",
            Reaction::Favorite => "favorites",
        }
    }
}

/// Result of a toggle: whether the caller is now a member, and the resulting set
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReactionToggle {
    pub active: bool,
    pub members: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Contributor {
    pub email: String,
    pub name: Option<String>,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
    pub total_lessons: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct DailyCount {
    /// UTC calendar date, YYYY-MM-DD
    pub date: String,
    pub count: i64,
}

/// Lesson side of the admin dashboard
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonOverview {
    pub total_public_lessons: i64,
    pub total_reported_lessons: i64,
    pub today_lessons: i64,
    pub lessons_per_day: Vec<DailyCount>,
    pub contributors: Vec<Contributor>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AccessLevelCounts {
    pub free: i64,
    pub premium: i64,
}

impl AccessLevelCounts {
    pub fn add(&mut self, level: AccessLevel, count: i64) {
        match level {
            AccessLevel::Free => self.free += count,
            AccessLevel::Premium => self.premium += count,
        }
    }
}
