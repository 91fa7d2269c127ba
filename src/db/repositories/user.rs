//! User repository
//!
//! - `UserRepository` trait defining the interface for user data access
//! - `SqlxUserRepository` implementing the trait for SQLite and MySQL

use crate::db::{backend, Backend, DynDatabasePool};
use crate::models::{Permission, User};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

const USER_COLUMNS: &str = "id, name, email, password_hash, permissions, reset_token, \
                            reset_token_expiry, created_at, updated_at";

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a new user
    async fn create(&self, user: &User) -> Result<User>;

    /// Get user by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Get user by email
    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Find the user holding `token` whose expiry is at or after `not_before`
    async fn find_by_reset_token(
        &self,
        token: &str,
        not_before: DateTime<Utc>,
    ) -> Result<Option<User>>;

    /// Store a reset token and its expiry on the user with `email`
    async fn set_reset_token(
        &self,
        email: &str,
        token: &str,
        expiry: DateTime<Utc>,
    ) -> Result<User>;

    /// Replace the password hash and clear any pending reset token
    async fn update_password(&self, id: i64, password_hash: &str) -> Result<User>;
}

/// SQLx-based user repository implementation
pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    /// Create a new SQLx user repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, user: &User) -> Result<User> {
        match backend(self.pool.as_ref())? {
            Backend::Sqlite(pool) => create_user_sqlite(pool, user).await,
            Backend::Mysql(pool) => create_user_mysql(pool, user).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
        match backend(self.pool.as_ref())? {
            Backend::Sqlite(pool) => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get user by ID")?;
                row.map(|r| row_to_user_sqlite(&r)).transpose()
            }
            Backend::Mysql(pool) => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get user by ID")?;
                row.map(|r| row_to_user_mysql(&r)).transpose()
            }
        }
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS);
        match backend(self.pool.as_ref())? {
            Backend::Sqlite(pool) => {
                let row = sqlx::query(&sql)
                    .bind(email)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get user by email")?;
                row.map(|r| row_to_user_sqlite(&r)).transpose()
            }
            Backend::Mysql(pool) => {
                let row = sqlx::query(&sql)
                    .bind(email)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get user by email")?;
                row.map(|r| row_to_user_mysql(&r)).transpose()
            }
        }
    }

    async fn find_by_reset_token(
        &self,
        token: &str,
        not_before: DateTime<Utc>,
    ) -> Result<Option<User>> {
        let sql = format!(
            "SELECT {} FROM users WHERE reset_token = ? AND reset_token_expiry >= ? LIMIT 1",
            USER_COLUMNS
        );
        let threshold = not_before.timestamp_millis();
        match backend(self.pool.as_ref())? {
            Backend::Sqlite(pool) => {
                let row = sqlx::query(&sql)
                    .bind(token)
                    .bind(threshold)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to find user by reset token")?;
                row.map(|r| row_to_user_sqlite(&r)).transpose()
            }
            Backend::Mysql(pool) => {
                let row = sqlx::query(&sql)
                    .bind(token)
                    .bind(threshold)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to find user by reset token")?;
                row.map(|r| row_to_user_mysql(&r)).transpose()
            }
        }
    }

    async fn set_reset_token(
        &self,
        email: &str,
        token: &str,
        expiry: DateTime<Utc>,
    ) -> Result<User> {
        let sql = "UPDATE users SET reset_token = ?, reset_token_expiry = ?, updated_at = ? WHERE email = ?";
        let now = Utc::now();
        let affected = match backend(self.pool.as_ref())? {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(token)
                .bind(expiry.timestamp_millis())
                .bind(now)
                .bind(email)
                .execute(pool)
                .await
                .context("Failed to set reset token")?
                .rows_affected(),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(token)
                .bind(expiry.timestamp_millis())
                .bind(now)
                .bind(email)
                .execute(pool)
                .await
                .context("Failed to set reset token")?
                .rows_affected(),
        };

        if affected == 0 {
            anyhow::bail!("No user with email {} to update", email);
        }

        self.get_by_email(email)
            .await?
            .ok_or_else(|| anyhow::anyhow!("User not found after update"))
    }

    async fn update_password(&self, id: i64, password_hash: &str) -> Result<User> {
        let sql = "UPDATE users SET password_hash = ?, reset_token = NULL, \
                   reset_token_expiry = NULL, updated_at = ? WHERE id = ?";
        let now = Utc::now();
        match backend(self.pool.as_ref())? {
            Backend::Sqlite(pool) => {
                sqlx::query(sql)
                    .bind(password_hash)
                    .bind(now)
                    .bind(id)
                    .execute(pool)
                    .await
                    .context("Failed to update password")?;
            }
            Backend::Mysql(pool) => {
                sqlx::query(sql)
                    .bind(password_hash)
                    .bind(now)
                    .bind(id)
                    .execute(pool)
                    .await
                    .context("Failed to update password")?;
            }
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("User not found after update"))
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_user_sqlite(pool: &SqlitePool, user: &User) -> Result<User> {
    let now = Utc::now();
    let permissions = encode_permissions(&user.permissions)?;

    let result = sqlx::query(
        r#"
        INSERT INTO users (name, email, password_hash, permissions, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.name)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&permissions)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create user")?;

    Ok(User {
        id: result.last_insert_rowid(),
        reset_token: None,
        reset_token_expiry: None,
        created_at: now,
        updated_at: now,
        ..user.clone()
    })
}

fn row_to_user_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<User> {
    let permissions: String = row.get("permissions");
    let expiry: Option<i64> = row.get("reset_token_expiry");

    Ok(User {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        permissions: decode_permissions(&permissions)?,
        reset_token: row.get("reset_token"),
        reset_token_expiry: expiry.and_then(DateTime::from_timestamp_millis),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_user_mysql(pool: &MySqlPool, user: &User) -> Result<User> {
    let now = Utc::now();
    let permissions = encode_permissions(&user.permissions)?;

    let result = sqlx::query(
        r#"
        INSERT INTO users (name, email, password_hash, permissions, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.name)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&permissions)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create user")?;

    Ok(User {
        id: result.last_insert_id() as i64,
        reset_token: None,
        reset_token_expiry: None,
        created_at: now,
        updated_at: now,
        ..user.clone()
    })
}

fn row_to_user_mysql(row: &sqlx::mysql::MySqlRow) -> Result<User> {
    let permissions: String = row.get("permissions");
    let expiry: Option<i64> = row.get("reset_token_expiry");

    Ok(User {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        permissions: decode_permissions(&permissions)?,
        reset_token: row.get("reset_token"),
        reset_token_expiry: expiry.and_then(DateTime::from_timestamp_millis),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn encode_permissions(permissions: &[Permission]) -> Result<String> {
    serde_json::to_string(permissions).context("Failed to encode permissions")
}

fn decode_permissions(raw: &str) -> Result<Vec<Permission>> {
    serde_json::from_str(raw)
        .with_context(|| format!("Invalid permissions in database: {}", raw))
}
