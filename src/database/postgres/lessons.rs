use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{types::Json, FromRow, PgPool, Postgres, QueryBuilder};
use tracing::{debug, info};
use uuid::Uuid;

use super::{escape_like, is_foreign_key_violation};
use crate::database::manager::DatabaseError;
use crate::database::models::{
    AccessLevel, AccessLevelCounts, Comment, Contributor, Creator, DailyCount, Lesson, LessonOverview,
    LessonUpdate, NewLesson, NewReport, Reaction, ReactionToggle, Report, Visibility,
};
use crate::database::repository::LessonRepository;
use crate::filter::{LessonFilter, LessonPage, PublicLessonFilter};

/// Lesson projection over alias `l`, with the derived report count
const LESSON_COLUMNS: &str = "l.id, l.title, l.description, l.category, l.emotional_tone, l.image, \
     l.access_level, l.visibility, l.creator_email, l.creator_name, l.creator_photo_url, \
     l.featured, l.likes, l.favorites, l.comments, \
     (SELECT COUNT(*) FROM reports r WHERE r.lesson_id = l.id) AS report_count, \
     l.created_at, l.updated_at";

const REPORT_COLUMNS: &str = "id, lesson_id, reporter_email, reason, details, created_at";

const CONTRIBUTORS_SQL: &str = "SELECT creator_email AS email, \
        (array_agg(creator_name ORDER BY created_at ASC))[1] AS name, \
        (array_agg(creator_photo_url ORDER BY created_at ASC))[1] AS photo_url, \
        COUNT(*) AS total_lessons \
     FROM lessons \
     GROUP BY creator_email \
     ORDER BY total_lessons DESC, email ASC \
     LIMIT $1";

#[derive(Debug, FromRow)]
struct LessonRow {
    id: Uuid,
    title: String,
    description: Option<String>,
    category: Option<String>,
    emotional_tone: Option<String>,
    image: Option<String>,
    access_level: String,
    visibility: String,
    creator_email: String,
    creator_name: Option<String>,
    creator_photo_url: Option<String>,
    featured: bool,
    likes: Vec<String>,
    favorites: Vec<String>,
    comments: Json<Vec<Comment>>,
    report_count: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<LessonRow> for Lesson {
    type Error = DatabaseError;

    fn try_from(row: LessonRow) -> Result<Self, Self::Error> {
        Ok(Lesson {
            id: row.id,
            title: row.title,
            description: row.description,
            category: row.category,
            emotional_tone: row.emotional_tone,
            image: row.image,
            access_level: row.access_level.parse::<AccessLevel>().map_err(DatabaseError::QueryError)?,
            visibility: row.visibility.parse::<Visibility>().map_err(DatabaseError::QueryError)?,
            creator: Creator {
                email: row.creator_email,
                name: row.creator_name,
                photo_url: row.creator_photo_url,
            },
            featured: row.featured,
            likes: row.likes,
            favorites: row.favorites,
            comments: row.comments.0,
            report_count: row.report_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn into_lessons(rows: Vec<LessonRow>) -> Result<Vec<Lesson>, DatabaseError> {
    rows.into_iter().map(Lesson::try_from).collect()
}

/// Wrap a data-modifying statement (which must `RETURNING *`) so the
/// result comes back in the standard lesson projection.
fn returning_lesson(statement: &str) -> String {
    format!("WITH changed AS ({}) SELECT {} FROM changed l", statement, LESSON_COLUMNS)
}

fn push_public_conditions(qb: &mut QueryBuilder<'_, Postgres>, filter: &PublicLessonFilter) {
    qb.push(" WHERE l.visibility = 'public'");
    if let Some(category) = &filter.category {
        qb.push(" AND l.category = ").push_bind(category.clone());
    }
    if let Some(tone) = &filter.emotional_tone {
        qb.push(" AND l.emotional_tone = ").push_bind(tone.clone());
    }
    if let Some(term) = &filter.search {
        qb.push(" AND l.title ILIKE ")
            .push_bind(format!("%{}%", escape_like(term)));
    }
}

pub struct PgLessonRepository {
    pool: PgPool,
}

impl PgLessonRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_lessons(&self, sql: &str, limit: i64) -> Result<Vec<Lesson>, DatabaseError> {
        let rows = sqlx::query_as::<_, LessonRow>(sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        into_lessons(rows)
    }

    async fn fetch_changed(&self, id: Uuid, query: sqlx::query::QueryAs<'_, Postgres, LessonRow, sqlx::postgres::PgArguments>) -> Result<Lesson, DatabaseError> {
        query
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found(format!("lesson {}", id)))?
            .try_into()
    }
}

#[async_trait]
impl LessonRepository for PgLessonRepository {
    async fn insert(&self, lesson: NewLesson, creator: Creator) -> Result<Lesson, DatabaseError> {
        let sql = returning_lesson(
            "INSERT INTO lessons (id, title, description, category, emotional_tone, image, \
                access_level, visibility, creator_email, creator_name, creator_photo_url, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, now(), now()) \
             RETURNING *",
        );

        let id = Uuid::new_v4();
        let row = sqlx::query_as::<_, LessonRow>(&sql)
            .bind(id)
            .bind(&lesson.title)
            .bind(&lesson.description)
            .bind(&lesson.category)
            .bind(&lesson.emotional_tone)
            .bind(&lesson.image)
            .bind(lesson.access_level.as_str())
            .bind(lesson.visibility.as_str())
            .bind(&creator.email)
            .bind(&creator.name)
            .bind(&creator.photo_url)
            .fetch_one(&self.pool)
            .await?;

        info!("Created lesson {} by {}", id, creator.email);
        row.try_into()
    }

    async fn find(&self, id: Uuid) -> Result<Option<Lesson>, DatabaseError> {
        let sql = format!("SELECT {} FROM lessons l WHERE l.id = $1", LESSON_COLUMNS);
        sqlx::query_as::<_, LessonRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Lesson::try_from)
            .transpose()
    }

    async fn list_public(&self, filter: &PublicLessonFilter) -> Result<LessonPage, DatabaseError> {
        let mut count_query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM lessons l");
        push_public_conditions(&mut count_query, filter);
        let total: i64 = count_query.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut page_query = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM lessons l", LESSON_COLUMNS));
        push_public_conditions(&mut page_query, filter);
        page_query
            .push(" ORDER BY l.created_at DESC OFFSET ")
            .push_bind(filter.page.skip)
            .push(" LIMIT ")
            .push_bind(filter.page.limit);

        let rows = page_query.build_query_as::<LessonRow>().fetch_all(&self.pool).await?;
        debug!("Public listing: {} of {} lessons", rows.len(), total);

        Ok(LessonPage {
            total,
            result: into_lessons(rows)?,
        })
    }

    async fn list(&self, filter: &LessonFilter) -> Result<Vec<Lesson>, DatabaseError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM lessons l WHERE TRUE", LESSON_COLUMNS));

        if let Some(email) = &filter.creator_email {
            qb.push(" AND lower(l.creator_email) = lower(").push_bind(email.clone()).push(")");
        }
        if let Some(visibility) = filter.visibility {
            qb.push(" AND l.visibility = ").push_bind(visibility.as_str());
        }
        if let Some(tone) = &filter.emotional_tone {
            qb.push(" AND l.emotional_tone = ").push_bind(tone.clone());
        }
        if let Some(category) = &filter.category {
            qb.push(" AND l.category = ").push_bind(category.clone());
        }
        if let Some(email) = &filter.favorited_by {
            qb.push(" AND ").push_bind(email.clone()).push(" = ANY(l.favorites)");
        }
        if filter.reported_only {
            qb.push(" AND EXISTS (SELECT 1 FROM reports r WHERE r.lesson_id = l.id)");
        }
        qb.push(" ORDER BY l.created_at DESC");

        let rows = qb.build_query_as::<LessonRow>().fetch_all(&self.pool).await?;
        into_lessons(rows)
    }

    async fn featured(&self, limit: i64) -> Result<Vec<Lesson>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM lessons l WHERE l.featured ORDER BY l.created_at DESC LIMIT $1",
            LESSON_COLUMNS
        );
        self.fetch_lessons(&sql, limit).await
    }

    async fn most_favorited(&self, limit: i64) -> Result<Vec<Lesson>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM lessons l WHERE l.visibility = 'public' \
             ORDER BY cardinality(l.favorites) DESC, l.created_at DESC LIMIT $1",
            LESSON_COLUMNS
        );
        self.fetch_lessons(&sql, limit).await
    }

    async fn top_contributors(&self, limit: Option<i64>) -> Result<Vec<Contributor>, DatabaseError> {
        // LIMIT NULL is no limit
        Ok(sqlx::query_as::<_, Contributor>(CONTRIBUTORS_SQL)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn toggle_reaction(&self, id: Uuid, reaction: Reaction, email: &str) -> Result<ReactionToggle, DatabaseError> {
        let column = reaction.column();
        // Row lock makes the membership test and the write one step
        let sql = format!(
            "UPDATE lessons SET {col} = CASE WHEN $2 = ANY({col}) \
                THEN array_remove({col}, $2) ELSE array_append({col}, $2) END \
             WHERE id = $1 \
             RETURNING {col}, $2 = ANY({col})",
            col = column
        );

        let (members, active) = sqlx::query_as::<_, (Vec<String>, bool)>(&sql)
            .bind(id)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found(format!("lesson {}", id)))?;

        debug!("Toggled {} on {} for {}: {}", column, id, email, active);
        Ok(ReactionToggle { active, members })
    }

    async fn add_comment(&self, id: Uuid, comment: Comment) -> Result<Vec<Comment>, DatabaseError> {
        let comments = sqlx::query_scalar::<_, Json<Vec<Comment>>>(
            "UPDATE lessons SET comments = comments || jsonb_build_array($2::jsonb) \
             WHERE id = $1 RETURNING comments",
        )
        .bind(id)
        .bind(Json(&comment))
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found(format!("lesson {}", id)))?;

        Ok(comments.0)
    }

    async fn add_report(&self, report: NewReport) -> Result<Report, DatabaseError> {
        let sql = format!(
            "INSERT INTO reports (id, lesson_id, reporter_email, reason, details, created_at) \
             VALUES ($1, $2, $3, $4, $5, now()) \
             ON CONFLICT (lesson_id, reporter_email) DO UPDATE \
                SET reason = EXCLUDED.reason, details = EXCLUDED.details, created_at = EXCLUDED.created_at \
             RETURNING {}",
            REPORT_COLUMNS
        );

        let inserted = sqlx::query_as::<_, Report>(&sql)
            .bind(Uuid::new_v4())
            .bind(report.lesson_id)
            .bind(&report.reporter_email)
            .bind(&report.reason)
            .bind(&report.details)
            .fetch_one(&self.pool)
            .await;

        match inserted {
            Ok(saved) => {
                info!("Lesson {} reported by {}", report.lesson_id, report.reporter_email);
                Ok(saved)
            }
            Err(sqlx::Error::Database(e)) if is_foreign_key_violation(e.as_ref()) => {
                Err(DatabaseError::not_found(format!("lesson {}", report.lesson_id)))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn reports_for(&self, id: Uuid) -> Result<Vec<Report>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM reports WHERE lesson_id = $1 ORDER BY created_at DESC",
            REPORT_COLUMNS
        );
        Ok(sqlx::query_as::<_, Report>(&sql).bind(id).fetch_all(&self.pool).await?)
    }

    async fn set_featured(&self, id: Uuid, featured: bool) -> Result<Lesson, DatabaseError> {
        let sql = returning_lesson("UPDATE lessons SET featured = $2, updated_at = now() WHERE id = $1 RETURNING *");
        let query = sqlx::query_as::<_, LessonRow>(&sql).bind(id).bind(featured);
        self.fetch_changed(id, query).await
    }

    async fn update(&self, id: Uuid, update: LessonUpdate) -> Result<Lesson, DatabaseError> {
        let sql = returning_lesson(
            "UPDATE lessons SET \
                title = COALESCE($2, title), \
                description = COALESCE($3, description), \
                category = COALESCE($4, category), \
                emotional_tone = COALESCE($5, emotional_tone), \
                image = COALESCE($6, image), \
                access_level = COALESCE($7, access_level), \
                visibility = COALESCE($8, visibility), \
                updated_at = now() \
             WHERE id = $1 RETURNING *",
        );
        let query = sqlx::query_as::<_, LessonRow>(&sql)
            .bind(id)
            .bind(update.title)
            .bind(update.description)
            .bind(update.category)
            .bind(update.emotional_tone)
            .bind(update.image)
            .bind(update.access_level.map(|a| a.as_str()))
            .bind(update.visibility.map(|v| v.as_str()));
        self.fetch_changed(id, query).await
    }

    async fn delete(&self, id: Uuid) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM lessons WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found(format!("lesson {}", id)));
        }
        info!("Deleted lesson {}", id);
        Ok(())
    }

    async fn overview(&self, today_start: DateTime<Utc>, window_start: DateTime<Utc>) -> Result<LessonOverview, DatabaseError> {
        let total_public_lessons =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM lessons WHERE visibility = 'public'")
                .fetch_one(&self.pool)
                .await?;

        let total_reported_lessons = sqlx::query_scalar::<_, i64>("SELECT COUNT(DISTINCT lesson_id) FROM reports")
            .fetch_one(&self.pool)
            .await?;

        let today_lessons = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM lessons WHERE created_at >= $1")
            .bind(today_start)
            .fetch_one(&self.pool)
            .await?;

        let lessons_per_day = sqlx::query_as::<_, DailyCount>(
            "SELECT to_char(created_at AT TIME ZONE 'UTC', 'YYYY-MM-DD') AS date, COUNT(*) AS count \
             FROM lessons WHERE created_at >= $1 \
             GROUP BY 1 ORDER BY 1 ASC",
        )
        .bind(window_start)
        .fetch_all(&self.pool)
        .await?;

        let contributors = self.top_contributors(None).await?;

        Ok(LessonOverview {
            total_public_lessons,
            total_reported_lessons,
            today_lessons,
            lessons_per_day,
            contributors,
        })
    }

    async fn access_level_counts(&self, since: DateTime<Utc>) -> Result<AccessLevelCounts, DatabaseError> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            "SELECT access_level, COUNT(*) FROM lessons \
             WHERE visibility = 'public' AND created_at >= $1 \
             GROUP BY access_level",
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        let mut counts = AccessLevelCounts::default();
        for (level, count) in rows {
            let level = level.parse::<AccessLevel>().map_err(DatabaseError::QueryError)?;
            counts.add(level, count);
        }
        Ok(counts)
    }
}
