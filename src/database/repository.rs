use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{
    AccessLevelCounts, AdminUserUpdate, Comment, Contributor, Creator, Lesson, LessonOverview, LessonUpdate,
    NewLesson, NewReport, NewUser, PremiumGrant, ProfileUpdate, Reaction, ReactionToggle, Registration, Report,
    Role, User,
};
use crate::filter::{LessonFilter, LessonPage, PublicLessonFilter};

type Result<T> = std::result::Result<T, DatabaseError>;

/// Store operations over the `users` collection.
///
/// Methods returning a bare record fail with [`DatabaseError::NotFound`] when
/// the target does not exist; lookups return `Option` instead.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn ping(&self) -> Result<()>;

    /// Insert-if-absent keyed by email
    async fn register(&self, user: NewUser) -> Result<Registration>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn find_by_transaction(&self, transaction_id: &str) -> Result<Option<User>>;

    /// All users except `email`, newest first
    async fn list_except(&self, email: &str) -> Result<Vec<User>>;
    async fn count(&self) -> Result<i64>;

    async fn update_role(&self, id: Uuid, role: Role) -> Result<User>;
    async fn update_profile(&self, email: &str, update: ProfileUpdate) -> Result<User>;
    async fn admin_update(&self, id: Uuid, update: AdminUserUpdate) -> Result<User>;

    /// Flip the premium flag and record the transaction, unless some user
    /// already carries that transaction id. Must be a single atomic step.
    async fn grant_premium(&self, email: &str, transaction_id: &str) -> Result<PremiumGrant>;
}

/// Store operations over lessons and their reports
#[async_trait]
pub trait LessonRepository: Send + Sync {
    async fn insert(&self, lesson: NewLesson, creator: Creator) -> Result<Lesson>;
    async fn find(&self, id: Uuid) -> Result<Option<Lesson>>;

    async fn list_public(&self, filter: &PublicLessonFilter) -> Result<LessonPage>;
    async fn list(&self, filter: &LessonFilter) -> Result<Vec<Lesson>>;
    async fn featured(&self, limit: i64) -> Result<Vec<Lesson>>;
    async fn most_favorited(&self, limit: i64) -> Result<Vec<Lesson>>;

    /// Creators ranked by lesson count. `None` means no limit.
    async fn top_contributors(&self, limit: Option<i64>) -> Result<Vec<Contributor>>;

    /// Add `email` to the set if absent, remove it if present, atomically
    async fn toggle_reaction(&self, id: Uuid, reaction: Reaction, email: &str) -> Result<ReactionToggle>;
    async fn add_comment(&self, id: Uuid, comment: Comment) -> Result<Vec<Comment>>;

    /// One report per (lesson, reporter); a repeat replaces the earlier one
    async fn add_report(&self, report: NewReport) -> Result<Report>;
    async fn reports_for(&self, id: Uuid) -> Result<Vec<Report>>;

    async fn set_featured(&self, id: Uuid, featured: bool) -> Result<Lesson>;
    async fn update(&self, id: Uuid, update: LessonUpdate) -> Result<Lesson>;
    async fn delete(&self, id: Uuid) -> Result<()>;

    async fn overview(&self, today_start: DateTime<Utc>, window_start: DateTime<Utc>) -> Result<LessonOverview>;
    async fn access_level_counts(&self, since: DateTime<Utc>) -> Result<AccessLevelCounts>;
}
