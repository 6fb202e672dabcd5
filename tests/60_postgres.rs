// Runs the Postgres repositories against DATABASE_URL; skipped when it is
// unset or points at the in-memory store.

use anyhow::{Context, Result};
use chrono::Utc;
use uuid::Uuid;

use lessons_api::config::DatabaseConfig;
use lessons_api::database::models::{
    Comment, Creator, NewLesson, NewReport, NewUser, PremiumGrant, Reaction, Registration, Visibility,
};
use lessons_api::database::{
    DatabaseManager, LessonRepository, PgLessonRepository, PgUserRepository, UserRepository,
};
use lessons_api::filter::{Page, PublicLessonFilter};

struct PgStore {
    users: PgUserRepository,
    lessons: PgLessonRepository,
    /// Unique per test so rows from other runs never match
    tag: String,
}

impl PgStore {
    fn email(&self, who: &str) -> String {
        format!("{}-{}@example.com", who, self.tag)
    }

    fn creator(&self, who: &str) -> Creator {
        Creator {
            email: self.email(who),
            name: Some(who.to_string()),
            photo_url: None,
        }
    }

    fn lesson(&self, title: &str) -> NewLesson {
        NewLesson {
            title: title.to_string(),
            description: None,
            category: Some(self.tag.clone()),
            emotional_tone: None,
            image: None,
            access_level: Default::default(),
            visibility: Visibility::Public,
        }
    }
}

async fn pg_store() -> Result<Option<PgStore>> {
    dotenvy::dotenv().ok();
    let url = match std::env::var("DATABASE_URL") {
        Ok(url) if !url.starts_with("memory:") => url,
        _ => {
            eprintln!("DATABASE_URL not set to a Postgres database; skipping");
            return Ok(None);
        }
    };

    let config = DatabaseConfig {
        url,
        max_connections: 4,
        connection_timeout: 10,
    };
    let pool = DatabaseManager::connect(&config).await.context("connect")?;
    DatabaseManager::migrate(&pool).await.context("migrate")?;

    Ok(Some(PgStore {
        users: PgUserRepository::new(pool.clone()),
        lessons: PgLessonRepository::new(pool),
        tag: Uuid::new_v4().simple().to_string(),
    }))
}

#[tokio::test]
async fn pg_registration_is_idempotent() -> Result<()> {
    let Some(store) = pg_store().await? else { return Ok(()) };
    let email = store.email("reader");

    let first = store
        .users
        .register(NewUser {
            email: email.to_uppercase(),
            name: Some("Reader".into()),
            photo_url: None,
        })
        .await?;
    let created = match first {
        Registration::Created(user) => user,
        Registration::Existing(_) => anyhow::bail!("first registration should create"),
    };
    assert_eq!(created.email, email);

    let second = store
        .users
        .register(NewUser {
            email: email.clone(),
            name: Some("Someone else".into()),
            photo_url: None,
        })
        .await?;
    match second {
        Registration::Existing(user) => {
            assert_eq!(user.id, created.id);
            assert_eq!(user.name.as_deref(), Some("Reader"));
        }
        Registration::Created(_) => anyhow::bail!("second registration should not create"),
    }
    Ok(())
}

#[tokio::test]
async fn pg_toggle_twice_restores_the_set() -> Result<()> {
    let Some(store) = pg_store().await? else { return Ok(()) };
    let lesson = store.lessons.insert(store.lesson("Patience"), store.creator("author")).await?;
    let reader = store.email("reader");

    let on = store.lessons.toggle_reaction(lesson.id, Reaction::Like, &reader).await?;
    assert!(on.active);
    assert_eq!(on.members, vec![reader.clone()]);

    let off = store.lessons.toggle_reaction(lesson.id, Reaction::Like, &reader).await?;
    assert!(!off.active);
    assert!(off.members.is_empty());

    let fav = store.lessons.toggle_reaction(lesson.id, Reaction::Favorite, &reader).await?;
    assert!(fav.active);
    let stored = store.lessons.find(lesson.id).await?.context("lesson")?;
    assert!(stored.likes.is_empty());
    assert_eq!(stored.favorites, vec![reader]);

    let missing = store.lessons.toggle_reaction(Uuid::new_v4(), Reaction::Like, "x@example.com").await;
    assert!(missing.is_err());
    Ok(())
}

#[tokio::test]
async fn pg_comments_keep_insertion_order() -> Result<()> {
    let Some(store) = pg_store().await? else { return Ok(()) };
    let lesson = store.lessons.insert(store.lesson("Listening"), store.creator("author")).await?;

    for text in ["one", "two"] {
        store
            .lessons
            .add_comment(
                lesson.id,
                Comment {
                    name: Some("Reader".into()),
                    email: store.email("reader"),
                    photo_url: None,
                    text: text.to_string(),
                    created_at: Utc::now(),
                },
            )
            .await?;
    }

    let stored = store.lessons.find(lesson.id).await?.context("lesson")?;
    let texts: Vec<&str> = stored.comments.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(texts, vec!["one", "two"]);
    Ok(())
}

#[tokio::test]
async fn pg_repeat_report_replaces_the_first() -> Result<()> {
    let Some(store) = pg_store().await? else { return Ok(()) };
    let lesson = store.lessons.insert(store.lesson("Reported"), store.creator("author")).await?;
    let report = |reason: &str| NewReport {
        lesson_id: lesson.id,
        reporter_email: store.email("reader"),
        reason: reason.to_string(),
        details: None,
    };

    store.lessons.add_report(report("spam")).await?;
    store.lessons.add_report(report("abuse")).await?;

    let reports = store.lessons.reports_for(lesson.id).await?;
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].reason, "abuse");
    assert_eq!(store.lessons.find(lesson.id).await?.context("lesson")?.report_count, 1);

    store.lessons.delete(lesson.id).await?;
    assert!(store.lessons.reports_for(lesson.id).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn pg_public_listing_pages_and_escapes_search() -> Result<()> {
    let Some(store) = pg_store().await? else { return Ok(()) };
    for n in 0..4 {
        store
            .lessons
            .insert(store.lesson(&format!("Lesson {}", n)), store.creator("author"))
            .await?;
    }
    store.lessons.insert(store.lesson("Give 100% effort"), store.creator("author")).await?;
    let mut hidden = store.lesson("Private 100%");
    hidden.visibility = Visibility::Private;
    store.lessons.insert(hidden, store.creator("author")).await?;

    let page = store
        .lessons
        .list_public(&PublicLessonFilter {
            category: Some(store.tag.clone()),
            emotional_tone: None,
            search: None,
            page: Page { skip: 0, limit: 2 },
        })
        .await?;
    assert_eq!(page.total, 5);
    assert_eq!(page.result.len(), 2);

    let searched = store
        .lessons
        .list_public(&PublicLessonFilter {
            category: Some(store.tag.clone()),
            emotional_tone: None,
            search: Some("100%".into()),
            page: Page { skip: 0, limit: 10 },
        })
        .await?;
    assert_eq!(searched.total, 1);
    assert_eq!(searched.result[0].title, "Give 100% effort");
    Ok(())
}

#[tokio::test]
async fn pg_contributors_without_limit_include_everyone() -> Result<()> {
    let Some(store) = pg_store().await? else { return Ok(()) };
    store.lessons.insert(store.lesson("a"), store.creator("prolific")).await?;
    store.lessons.insert(store.lesson("b"), store.creator("prolific")).await?;

    let all = store.lessons.top_contributors(None).await?;
    let mine = all
        .iter()
        .find(|c| c.email == store.email("prolific"))
        .context("contributor present")?;
    assert_eq!(mine.total_lessons, 2);
    Ok(())
}

#[tokio::test]
async fn pg_grant_premium_replay_is_a_no_op() -> Result<()> {
    let Some(store) = pg_store().await? else { return Ok(()) };
    let email = store.email("buyer");
    store
        .users
        .register(NewUser {
            email: email.clone(),
            name: None,
            photo_url: None,
        })
        .await?;
    let transaction = format!("pi_{}", store.tag);

    let first = store.users.grant_premium(&email, &transaction).await?;
    assert!(matches!(first, PremiumGrant::Granted(ref u) if u.is_premium));

    let replay = store.users.grant_premium(&email, &transaction).await?;
    assert!(matches!(replay, PremiumGrant::AlreadyProcessed));

    let unknown = store
        .users
        .grant_premium(&store.email("nobody"), &format!("pi_other_{}", store.tag))
        .await?;
    assert!(matches!(unknown, PremiumGrant::UnknownUser));

    let holder = store.users.find_by_transaction(&transaction).await?.context("holder")?;
    assert_eq!(holder.email, email);
    Ok(())
}
