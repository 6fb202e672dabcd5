use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{
    normalize_email, AccessLevelCounts, AdminUserUpdate, Comment, Contributor, Creator, DailyCount, Lesson,
    LessonOverview, LessonUpdate, NewLesson, NewReport, NewUser, PremiumGrant, ProfileUpdate, Reaction,
    ReactionToggle, Registration, Report, Role, User, Visibility,
};
use crate::database::repository::{LessonRepository, UserRepository};
use crate::filter::{LessonFilter, LessonPage, PublicLessonFilter};

type Result<T> = std::result::Result<T, DatabaseError>;

/// Process-local store with the same semantics as the Postgres repositories.
///
/// Each operation takes the write lock for its whole read-modify-write, which
/// gives the same single-step atomicity the SQL statements have.
#[derive(Default)]
pub struct InMemoryStore {
    users: RwLock<Vec<User>>,
    lessons: RwLock<Vec<Lesson>>,
    reports: RwLock<Vec<Report>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn with_report_counts(&self, mut lessons: Vec<Lesson>) -> Vec<Lesson> {
        let reports = self.reports.read().await;
        for lesson in lessons.iter_mut() {
            lesson.report_count = reports.iter().filter(|r| r.lesson_id == lesson.id).count() as i64;
        }
        lessons
    }

    /// Snapshot of all lessons with report counts, newest first. Equal
    /// timestamps fall back to reverse insertion order.
    async fn snapshot(&self) -> Vec<Lesson> {
        let mut lessons: Vec<Lesson> = self.lessons.read().await.iter().rev().cloned().collect();
        lessons.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        self.with_report_counts(lessons).await
    }

    async fn mutate_lesson<F>(&self, id: Uuid, apply: F) -> Result<Lesson>
    where
        F: FnOnce(&mut Lesson) + Send,
    {
        let changed = {
            let mut lessons = self.lessons.write().await;
            let lesson = lessons
                .iter_mut()
                .find(|l| l.id == id)
                .ok_or_else(|| DatabaseError::not_found(format!("lesson {}", id)))?;
            apply(lesson);
            lesson.clone()
        };
        Ok(self.with_report_counts(vec![changed]).await.remove(0))
    }

    async fn mutate_user<P, F>(&self, matches: P, missing: String, apply: F) -> Result<User>
    where
        P: Fn(&User) -> bool + Send,
        F: FnOnce(&mut User) + Send,
    {
        let mut users = self.users.write().await;
        let user = users
            .iter_mut()
            .find(|u| matches(u))
            .ok_or_else(|| DatabaseError::not_found(missing))?;
        apply(user);
        Ok(user.clone())
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn register(&self, user: NewUser) -> Result<Registration> {
        let email = normalize_email(&user.email);
        let mut users = self.users.write().await;

        if let Some(existing) = users.iter().find(|u| u.email == email) {
            return Ok(Registration::Existing(existing.clone()));
        }

        let created = User {
            id: Uuid::new_v4(),
            email,
            name: user.name,
            photo_url: user.photo_url,
            role: Role::User,
            is_premium: false,
            transaction_id: None,
            created_at: Utc::now(),
        };
        users.push(created.clone());
        Ok(Registration::Created(created))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let email = normalize_email(email);
        Ok(self.users.read().await.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_transaction(&self, transaction_id: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .iter()
            .find(|u| u.transaction_id.as_deref() == Some(transaction_id))
            .cloned())
    }

    async fn list_except(&self, email: &str) -> Result<Vec<User>> {
        let email = normalize_email(email);
        let mut users: Vec<User> = self
            .users
            .read()
            .await
            .iter()
            .rev()
            .filter(|u| u.email != email)
            .cloned()
            .collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }

    async fn count(&self) -> Result<i64> {
        Ok(self.users.read().await.len() as i64)
    }

    async fn update_role(&self, id: Uuid, role: Role) -> Result<User> {
        self.mutate_user(|u| u.id == id, format!("user {}", id), |u| u.role = role)
            .await
    }

    async fn update_profile(&self, email: &str, update: ProfileUpdate) -> Result<User> {
        let email = normalize_email(email);
        let missing = format!("user {}", email);
        self.mutate_user(
            move |u| u.email == email,
            missing,
            |u| {
                if let Some(name) = update.name {
                    u.name = Some(name);
                }
                if let Some(photo_url) = update.photo_url {
                    u.photo_url = Some(photo_url);
                }
            },
        )
        .await
    }

    async fn admin_update(&self, id: Uuid, update: AdminUserUpdate) -> Result<User> {
        self.mutate_user(|u| u.id == id, format!("user {}", id), |u| {
            if let Some(name) = update.name {
                u.name = Some(name);
            }
            if let Some(photo_url) = update.photo_url {
                u.photo_url = Some(photo_url);
            }
            if let Some(role) = update.role {
                u.role = role;
            }
            if let Some(is_premium) = update.is_premium {
                u.is_premium = is_premium;
            }
        })
        .await
    }

    async fn grant_premium(&self, email: &str, transaction_id: &str) -> Result<PremiumGrant> {
        let email = normalize_email(email);
        let mut users = self.users.write().await;

        if users.iter().any(|u| u.transaction_id.as_deref() == Some(transaction_id)) {
            return Ok(PremiumGrant::AlreadyProcessed);
        }

        match users.iter_mut().find(|u| u.email == email) {
            Some(user) => {
                user.is_premium = true;
                user.transaction_id = Some(transaction_id.to_string());
                Ok(PremiumGrant::Granted(user.clone()))
            }
            None => Ok(PremiumGrant::UnknownUser),
        }
    }
}

#[async_trait]
impl LessonRepository for InMemoryStore {
    async fn insert(&self, lesson: NewLesson, creator: Creator) -> Result<Lesson> {
        let now = Utc::now();
        let created = Lesson {
            id: Uuid::new_v4(),
            title: lesson.title,
            description: lesson.description,
            category: lesson.category,
            emotional_tone: lesson.emotional_tone,
            image: lesson.image,
            access_level: lesson.access_level,
            visibility: lesson.visibility,
            creator,
            featured: false,
            likes: Vec::new(),
            favorites: Vec::new(),
            comments: Vec::new(),
            report_count: 0,
            created_at: now,
            updated_at: now,
        };
        self.lessons.write().await.push(created.clone());
        Ok(created)
    }

    async fn find(&self, id: Uuid) -> Result<Option<Lesson>> {
        let found = self.lessons.read().await.iter().find(|l| l.id == id).cloned();
        match found {
            Some(lesson) => Ok(self.with_report_counts(vec![lesson]).await.pop()),
            None => Ok(None),
        }
    }

    async fn list_public(&self, filter: &PublicLessonFilter) -> Result<LessonPage> {
        let matching: Vec<Lesson> = self
            .snapshot()
            .await
            .into_iter()
            .filter(|l| filter.matches(l))
            .collect();

        let total = matching.len() as i64;
        let result = matching
            .into_iter()
            .skip(filter.page.skip as usize)
            .take(filter.page.limit as usize)
            .collect();

        Ok(LessonPage { total, result })
    }

    async fn list(&self, filter: &LessonFilter) -> Result<Vec<Lesson>> {
        Ok(self
            .snapshot()
            .await
            .into_iter()
            .filter(|l| filter.matches(l))
            .collect())
    }

    async fn featured(&self, limit: i64) -> Result<Vec<Lesson>> {
        Ok(self
            .snapshot()
            .await
            .into_iter()
            .filter(|l| l.featured)
            .take(limit as usize)
            .collect())
    }

    async fn most_favorited(&self, limit: i64) -> Result<Vec<Lesson>> {
        let mut lessons: Vec<Lesson> = self
            .snapshot()
            .await
            .into_iter()
            .filter(|l| l.visibility == Visibility::Public)
            .collect();
        // Stable sort keeps newest-first among equal counts
        lessons.sort_by(|a, b| b.favorites.len().cmp(&a.favorites.len()));
        lessons.truncate(limit as usize);
        Ok(lessons)
    }

    async fn top_contributors(&self, limit: Option<i64>) -> Result<Vec<Contributor>> {
        let mut lessons = self.lessons.read().await.clone();
        lessons.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        let mut by_creator: HashMap<String, Contributor> = HashMap::new();
        for lesson in lessons {
            by_creator
                .entry(lesson.creator.email.clone())
                .and_modify(|c| c.total_lessons += 1)
                .or_insert(Contributor {
                    email: lesson.creator.email,
                    name: lesson.creator.name,
                    photo_url: lesson.creator.photo_url,
                    total_lessons: 1,
                });
        }

        let mut contributors: Vec<Contributor> = by_creator.into_values().collect();
        contributors.sort_by(|a, b| b.total_lessons.cmp(&a.total_lessons).then_with(|| a.email.cmp(&b.email)));
        if let Some(limit) = limit {
            contributors.truncate(limit as usize);
        }
        Ok(contributors)
    }

    async fn toggle_reaction(&self, id: Uuid, reaction: Reaction, email: &str) -> Result<ReactionToggle> {
        let email = email.to_string();
        let lesson = self
            .mutate_lesson(id, |lesson| {
                let set = match reaction {
                    Reaction::Like => &mut lesson.likes,
                    Reaction::Favorite => &mut lesson.favorites,
                };
                if set.contains(&email) {
                    set.retain(|e| e != &email);
                } else {
                    set.push(email.clone());
                }
            })
            .await?;

        let members = match reaction {
            Reaction::Like => lesson.likes,
            Reaction::Favorite => lesson.favorites,
        };
        Ok(ReactionToggle {
            active: members.iter().any(|e| *e == email),
            members,
        })
    }

    async fn add_comment(&self, id: Uuid, comment: Comment) -> Result<Vec<Comment>> {
        let lesson = self.mutate_lesson(id, |lesson| lesson.comments.push(comment)).await?;
        Ok(lesson.comments)
    }

    async fn add_report(&self, report: NewReport) -> Result<Report> {
        // Held until the report lands so a concurrent delete cannot orphan it
        let lessons = self.lessons.read().await;
        if !lessons.iter().any(|l| l.id == report.lesson_id) {
            return Err(DatabaseError::not_found(format!("lesson {}", report.lesson_id)));
        }

        let mut reports = self.reports.write().await;
        let saved = Report {
            id: Uuid::new_v4(),
            lesson_id: report.lesson_id,
            reporter_email: report.reporter_email,
            reason: report.reason,
            details: report.details,
            created_at: Utc::now(),
        };

        match reports
            .iter_mut()
            .find(|r| r.lesson_id == saved.lesson_id && r.reporter_email == saved.reporter_email)
        {
            Some(existing) => {
                existing.reason = saved.reason;
                existing.details = saved.details;
                existing.created_at = saved.created_at;
                Ok(existing.clone())
            }
            None => {
                reports.push(saved.clone());
                Ok(saved)
            }
        }
    }

    async fn reports_for(&self, id: Uuid) -> Result<Vec<Report>> {
        let mut reports: Vec<Report> = self
            .reports
            .read()
            .await
            .iter()
            .rev()
            .filter(|r| r.lesson_id == id)
            .cloned()
            .collect();
        reports.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(reports)
    }

    async fn set_featured(&self, id: Uuid, featured: bool) -> Result<Lesson> {
        self.mutate_lesson(id, |lesson| {
            lesson.featured = featured;
            lesson.updated_at = Utc::now();
        })
        .await
    }

    async fn update(&self, id: Uuid, update: LessonUpdate) -> Result<Lesson> {
        self.mutate_lesson(id, |lesson| {
            if let Some(title) = update.title {
                lesson.title = title;
            }
            if let Some(description) = update.description {
                lesson.description = Some(description);
            }
            if let Some(category) = update.category {
                lesson.category = Some(category);
            }
            if let Some(tone) = update.emotional_tone {
                lesson.emotional_tone = Some(tone);
            }
            if let Some(image) = update.image {
                lesson.image = Some(image);
            }
            if let Some(level) = update.access_level {
                lesson.access_level = level;
            }
            if let Some(visibility) = update.visibility {
                lesson.visibility = visibility;
            }
            lesson.updated_at = Utc::now();
        })
        .await
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let mut lessons = self.lessons.write().await;
        let before = lessons.len();
        lessons.retain(|l| l.id != id);
        if lessons.len() == before {
            return Err(DatabaseError::not_found(format!("lesson {}", id)));
        }
        drop(lessons);

        self.reports.write().await.retain(|r| r.lesson_id != id);
        Ok(())
    }

    async fn overview(&self, today_start: DateTime<Utc>, window_start: DateTime<Utc>) -> Result<LessonOverview> {
        let lessons = self.lessons.read().await.clone();

        let mut per_day: BTreeMap<String, i64> = BTreeMap::new();
        for lesson in lessons.iter().filter(|l| l.created_at >= window_start) {
            *per_day
                .entry(lesson.created_at.format("%Y-%m-%d").to_string())
                .or_default() += 1;
        }

        let mut reported: Vec<Uuid> = self.reports.read().await.iter().map(|r| r.lesson_id).collect();
        reported.sort();
        reported.dedup();

        Ok(LessonOverview {
            total_public_lessons: lessons.iter().filter(|l| l.visibility == Visibility::Public).count() as i64,
            total_reported_lessons: reported.len() as i64,
            today_lessons: lessons.iter().filter(|l| l.created_at >= today_start).count() as i64,
            lessons_per_day: per_day
                .into_iter()
                .map(|(date, count)| DailyCount { date, count })
                .collect(),
            contributors: self.top_contributors(None).await?,
        })
    }

    async fn access_level_counts(&self, since: DateTime<Utc>) -> Result<AccessLevelCounts> {
        let mut counts = AccessLevelCounts::default();
        for lesson in self
            .lessons
            .read()
            .await
            .iter()
            .filter(|l| l.visibility == Visibility::Public && l.created_at >= since)
        {
            counts.add(lesson.access_level, 1);
        }
        Ok(counts)
    }
}
