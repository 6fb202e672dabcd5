pub mod lesson;
pub mod report;
pub mod user;

pub use lesson::{
    AccessLevel, AccessLevelCounts, Comment, Contributor, Creator, DailyCount, Lesson, LessonOverview,
    LessonUpdate, NewLesson, Reaction, ReactionToggle, Visibility,
};
pub use report::{NewReport, Report, ReportRequest};
pub use user::{normalize_email, AdminUserUpdate, NewUser, PremiumGrant, ProfileUpdate, Registration, Role, User};
