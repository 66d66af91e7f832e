//! Admin repository
//!
//! Database operations for admin accounts.

use crate::db::{Backend, DynDatabasePool};
use crate::models::Admin;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Profile columns written by `update_profile`. Each value is the final
/// stored value, already merged and normalized by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileFields {
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub avatar: Option<String>,
}

/// Admin repository trait
#[async_trait]
pub trait AdminRepository: Send + Sync {
    /// Create an admin with an already-hashed password
    async fn create(&self, username: &str, password_hash: &str) -> Result<Admin>;

    /// Get admin by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Admin>>;

    /// Get admin by username
    async fn get_by_username(&self, username: &str) -> Result<Option<Admin>>;

    /// Count admin accounts
    async fn count(&self) -> Result<i64>;

    /// Overwrite the profile columns. Returns `None` when the admin doesn't exist.
    async fn update_profile(&self, id: i64, fields: &ProfileFields) -> Result<Option<Admin>>;

    /// Replace the stored password hash
    async fn update_password(&self, id: i64, password_hash: &str) -> Result<()>;
}

/// SQLx-based admin repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxAdminRepository {
    pool: DynDatabasePool,
}

impl SqlxAdminRepository {
    /// Create a new SQLx admin repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn AdminRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl AdminRepository for SqlxAdminRepository {
    async fn create(&self, username: &str, password_hash: &str) -> Result<Admin> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => create_admin_sqlite(pool, username, password_hash).await,
            Backend::Mysql(pool) => create_admin_mysql(pool, username, password_hash).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Admin>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => get_admin_sqlite(pool, "id", AdminKey::Id(id)).await,
            Backend::Mysql(pool) => get_admin_mysql(pool, "id", AdminKey::Id(id)).await,
        }
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<Admin>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                get_admin_sqlite(pool, "username", AdminKey::Username(username)).await
            }
            Backend::Mysql(pool) => {
                get_admin_mysql(pool, "username", AdminKey::Username(username)).await
            }
        }
    }

    async fn count(&self) -> Result<i64> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => count_admins_sqlite(pool).await,
            Backend::Mysql(pool) => count_admins_mysql(pool).await,
        }
    }

    async fn update_profile(&self, id: i64, fields: &ProfileFields) -> Result<Option<Admin>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => update_profile_sqlite(pool, id, fields).await,
            Backend::Mysql(pool) => update_profile_mysql(pool, id, fields).await,
        }
    }

    async fn update_password(&self, id: i64, password_hash: &str) -> Result<()> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => update_password_sqlite(pool, id, password_hash).await,
            Backend::Mysql(pool) => update_password_mysql(pool, id, password_hash).await,
        }
    }
}

/// Lookup key for single-admin reads
enum AdminKey<'a> {
    Id(i64),
    Username(&'a str),
}

fn select_admin_sql(column: &str) -> String {
    format!(
        "SELECT id, username, password_hash, email, display_name, avatar, created_at, updated_at \
         FROM admins WHERE {column} = ?"
    )
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_admin_sqlite(pool: &SqlitePool, username: &str, password_hash: &str) -> Result<Admin> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO admins (username, password_hash, created_at, updated_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(username)
    .bind(password_hash)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create admin")?;

    Ok(Admin {
        id: result.last_insert_rowid(),
        username: username.to_string(),
        password_hash: password_hash.to_string(),
        email: None,
        display_name: None,
        avatar: None,
        created_at: now,
        updated_at: now,
    })
}

async fn get_admin_sqlite(pool: &SqlitePool, column: &str, key: AdminKey<'_>) -> Result<Option<Admin>> {
    let sql = select_admin_sql(column);
    let query = match key {
        AdminKey::Id(id) => sqlx::query(&sql).bind(id),
        AdminKey::Username(username) => sqlx::query(&sql).bind(username),
    };
    let row = query
        .fetch_optional(pool)
        .await
        .with_context(|| format!("Failed to get admin by {}", column))?;

    row.as_ref().map(row_to_admin_sqlite).transpose()
}

async fn count_admins_sqlite(pool: &SqlitePool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) AS count FROM admins")
        .fetch_one(pool)
        .await
        .context("Failed to count admins")?;

    Ok(row.get("count"))
}

async fn update_profile_sqlite(pool: &SqlitePool, id: i64, fields: &ProfileFields) -> Result<Option<Admin>> {
    let result = sqlx::query(
        r#"
        UPDATE admins
        SET email = ?, display_name = ?, avatar = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&fields.email)
    .bind(&fields.display_name)
    .bind(&fields.avatar)
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await
    .context("Failed to update admin profile")?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    get_admin_sqlite(pool, "id", AdminKey::Id(id)).await
}

async fn update_password_sqlite(pool: &SqlitePool, id: i64, password_hash: &str) -> Result<()> {
    sqlx::query("UPDATE admins SET password_hash = ?, updated_at = ? WHERE id = ?")
        .bind(password_hash)
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to update admin password")?;

    Ok(())
}

fn row_to_admin_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Admin> {
    Ok(Admin {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        password_hash: row.try_get("password_hash")?,
        email: row.try_get("email")?,
        display_name: row.try_get("display_name")?,
        avatar: row.try_get("avatar")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_admin_mysql(pool: &MySqlPool, username: &str, password_hash: &str) -> Result<Admin> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO admins (username, password_hash, created_at, updated_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(username)
    .bind(password_hash)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create admin")?;

    Ok(Admin {
        id: result.last_insert_id() as i64,
        username: username.to_string(),
        password_hash: password_hash.to_string(),
        email: None,
        display_name: None,
        avatar: None,
        created_at: now,
        updated_at: now,
    })
}

async fn get_admin_mysql(pool: &MySqlPool, column: &str, key: AdminKey<'_>) -> Result<Option<Admin>> {
    let sql = select_admin_sql(column);
    let query = match key {
        AdminKey::Id(id) => sqlx::query(&sql).bind(id),
        AdminKey::Username(username) => sqlx::query(&sql).bind(username),
    };
    let row = query
        .fetch_optional(pool)
        .await
        .with_context(|| format!("Failed to get admin by {}", column))?;

    row.as_ref().map(row_to_admin_mysql).transpose()
}

async fn count_admins_mysql(pool: &MySqlPool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) AS count FROM admins")
        .fetch_one(pool)
        .await
        .context("Failed to count admins")?;

    Ok(row.get("count"))
}

async fn update_profile_mysql(pool: &MySqlPool, id: i64, fields: &ProfileFields) -> Result<Option<Admin>> {
    // MySQL reports matched-but-unchanged rows as 0 affected, so check existence by reading back
    sqlx::query(
        r#"
        UPDATE admins
        SET email = ?, display_name = ?, avatar = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&fields.email)
    .bind(&fields.display_name)
    .bind(&fields.avatar)
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await
    .context("Failed to update admin profile")?;

    get_admin_mysql(pool, "id", AdminKey::Id(id)).await
}

async fn update_password_mysql(pool: &MySqlPool, id: i64, password_hash: &str) -> Result<()> {
    sqlx::query("UPDATE admins SET password_hash = ?, updated_at = ? WHERE id = ?")
        .bind(password_hash)
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to update admin password")?;

    Ok(())
}

fn row_to_admin_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Admin> {
    Ok(Admin {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        password_hash: row.try_get("password_hash")?,
        email: row.try_get("email")?,
        display_name: row.try_get("display_name")?,
        avatar: row.try_get("avatar")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
