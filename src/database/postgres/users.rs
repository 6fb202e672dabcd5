use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::{debug, info};
use uuid::Uuid;

use super::is_unique_violation;
use crate::database::manager::DatabaseError;
use crate::database::models::{
    normalize_email, AdminUserUpdate, NewUser, PremiumGrant, ProfileUpdate, Registration, Role, User,
};
use crate::database::repository::UserRepository;

const USER_COLUMNS: &str = "id, email, name, photo_url, role, is_premium, transaction_id, created_at";

#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    name: Option<String>,
    photo_url: Option<String>,
    role: String,
    is_premium: bool,
    transaction_id: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = DatabaseError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            email: row.email,
            name: row.name,
            photo_url: row.photo_url,
            role: row.role.parse::<Role>().map_err(DatabaseError::QueryError)?,
            is_premium: row.is_premium,
            transaction_id: row.transaction_id,
            created_at: row.created_at,
        })
    }
}

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_optional(&self, sql: &str, key: &str) -> Result<Option<User>, DatabaseError> {
        sqlx::query_as::<_, UserRow>(sql)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn ping(&self) -> Result<(), DatabaseError> {
        crate::database::DatabaseManager::health_check(&self.pool).await
    }

    async fn register(&self, user: NewUser) -> Result<Registration, DatabaseError> {
        let email = normalize_email(&user.email);
        let sql = format!(
            "INSERT INTO users (id, email, name, photo_url, role, is_premium, created_at) \
             VALUES ($1, $2, $3, $4, 'user', FALSE, now()) \
             ON CONFLICT (email) DO NOTHING \
             RETURNING {}",
            USER_COLUMNS
        );

        let inserted = sqlx::query_as::<_, UserRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(&email)
            .bind(&user.name)
            .bind(&user.photo_url)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(row) = inserted {
            info!("Registered user {}", email);
            return Ok(Registration::Created(row.try_into()?));
        }

        debug!("User {} already registered", email);
        self.find_by_email(&email)
            .await?
            .map(Registration::Existing)
            .ok_or_else(|| DatabaseError::QueryError(format!("user {} vanished during registration", email)))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let sql = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        self.fetch_optional(&sql, &normalize_email(email)).await
    }

    async fn find_by_transaction(&self, transaction_id: &str) -> Result<Option<User>, DatabaseError> {
        let sql = format!("SELECT {} FROM users WHERE transaction_id = $1", USER_COLUMNS);
        self.fetch_optional(&sql, transaction_id).await
    }

    async fn list_except(&self, email: &str) -> Result<Vec<User>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM users WHERE email <> $1 ORDER BY created_at DESC",
            USER_COLUMNS
        );
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(normalize_email(email))
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(User::try_from)
            .collect()
    }

    async fn count(&self) -> Result<i64, DatabaseError> {
        Ok(sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?)
    }

    async fn update_role(&self, id: Uuid, role: Role) -> Result<User, DatabaseError> {
        let sql = format!("UPDATE users SET role = $2 WHERE id = $1 RETURNING {}", USER_COLUMNS);
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .bind(role.as_str())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found(format!("user {}", id)))?;
        row.try_into()
    }

    async fn update_profile(&self, email: &str, update: ProfileUpdate) -> Result<User, DatabaseError> {
        let sql = format!(
            "UPDATE users SET name = COALESCE($2, name), photo_url = COALESCE($3, photo_url) \
             WHERE email = $1 RETURNING {}",
            USER_COLUMNS
        );
        let email = normalize_email(email);
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(&email)
            .bind(&update.name)
            .bind(&update.photo_url)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found(format!("user {}", email)))?;
        row.try_into()
    }

    async fn admin_update(&self, id: Uuid, update: AdminUserUpdate) -> Result<User, DatabaseError> {
        let sql = format!(
            "UPDATE users SET \
                name = COALESCE($2, name), \
                photo_url = COALESCE($3, photo_url), \
                role = COALESCE($4, role), \
                is_premium = COALESCE($5, is_premium) \
             WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .bind(&update.name)
            .bind(&update.photo_url)
            .bind(update.role.map(|r| r.as_str()))
            .bind(update.is_premium)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found(format!("user {}", id)))?;
        row.try_into()
    }

    async fn grant_premium(&self, email: &str, transaction_id: &str) -> Result<PremiumGrant, DatabaseError> {
        let email = normalize_email(email);
        let sql = format!(
            "UPDATE users SET is_premium = TRUE, transaction_id = $2 \
             WHERE email = $1 \
               AND NOT EXISTS (SELECT 1 FROM users WHERE transaction_id = $2) \
             RETURNING {}",
            USER_COLUMNS
        );

        let updated = sqlx::query_as::<_, UserRow>(&sql)
            .bind(&email)
            .bind(transaction_id)
            .fetch_optional(&self.pool)
            .await;

        match updated {
            Ok(Some(row)) => Ok(PremiumGrant::Granted(row.try_into()?)),
            // A concurrent grant won the unique index on transaction_id
            Err(sqlx::Error::Database(e)) if is_unique_violation(e.as_ref()) => Ok(PremiumGrant::AlreadyProcessed),
            Err(e) => Err(e.into()),
            Ok(None) => {
                if self.find_by_transaction(transaction_id).await?.is_some() {
                    Ok(PremiumGrant::AlreadyProcessed)
                } else {
                    Ok(PremiumGrant::UnknownUser)
                }
            }
        }
    }
}
