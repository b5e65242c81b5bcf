use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use authcore_models::{NewUser, PaginatedResult, Pagination, Profile, User};
use chrono::Utc;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::Row;
use uuid::Uuid;

use super::users::UserStore;
use crate::errors::StoreError;

const USER_COLUMNS: &str = "id, email, password_hash, profile, created_at, updated_at";

/// `UserStore` over the `users` table created by `migrations/`.
#[derive(Debug, Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await
            .context("Failed to connect to database")?;

        tracing::info!(max_connections, "User store connected to Postgres");
        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run migrations")?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn fetch_one_where(&self, column: &str, bind: UserKey<'_>) -> Result<User, StoreError> {
        let sql = format!("SELECT {} FROM users WHERE {} = $1", USER_COLUMNS, column);
        let query = sqlx::query(&sql);
        let query = match bind {
            UserKey::Email(email) => query.bind(email),
            UserKey::Id(id) => query.bind(id),
        };

        let row = query
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to find user by {}", column))?
            .ok_or(StoreError::NotFound)?;

        Ok(user_from_row(&row).context("Malformed user row")?)
    }
}

enum UserKey<'a> {
    Email(&'a str),
    Id(Uuid),
}

fn user_from_row(row: &PgRow) -> Result<User, sqlx::Error> {
    let profile: Json<Profile> = row.try_get("profile")?;
    Ok(User {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        profile: profile.0,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn insert_error(err: sqlx::Error) -> StoreError {
    let unique_violation = err
        .as_database_error()
        .map(|db_err| db_err.is_unique_violation())
        .unwrap_or(false);

    if unique_violation {
        StoreError::Duplicate
    } else {
        StoreError::Backend(anyhow::Error::new(err).context("Failed to create user in database"))
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn insert(&self, new_user: NewUser) -> Result<User, StoreError> {
        let sql = format!(
            "INSERT INTO users ({}) VALUES ($1, $2, $3, $4, $5, $5) RETURNING {}",
            USER_COLUMNS, USER_COLUMNS
        );

        let row = sqlx::query(&sql)
            .bind(Uuid::new_v4())
            .bind(&new_user.email)
            .bind(&new_user.password_hash)
            .bind(Json(&new_user.profile))
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await
            .map_err(insert_error)?;

        let user = user_from_row(&row).context("Malformed user row")?;
        tracing::debug!(user_id = %user.id, "Inserted user");
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<User, StoreError> {
        self.fetch_one_where("email", UserKey::Email(email)).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<User, StoreError> {
        self.fetch_one_where("id", UserKey::Id(id)).await
    }

    async fn list(&self, pagination: &Pagination) -> Result<PaginatedResult<User>, StoreError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count users")?;

        let sql = format!(
            "SELECT {} FROM users ORDER BY created_at, id LIMIT $1 OFFSET $2",
            USER_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(pagination.limit())
            .bind(pagination.offset())
            .fetch_all(&self.pool)
            .await
            .context("Failed to list users")?;

        let items = rows
            .iter()
            .map(user_from_row)
            .collect::<Result<Vec<_>, _>>()
            .context("Malformed user row")?;

        Ok(PaginatedResult::new(items, total, pagination))
    }
}
