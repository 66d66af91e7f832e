//! Session repository
//!
//! Database operations for admin sessions.
//!
//! This module provides:
//! - `SessionRepository` trait defining the interface for session data access
//! - `SqlxSessionRepository` implementing the trait for SQLite and MySQL

use crate::db::{Backend, DynDatabasePool};
use crate::models::AdminSession;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Session repository trait
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Store a new session
    async fn create(&self, session: &AdminSession) -> Result<AdminSession>;

    /// Get session by ID (token)
    async fn get_by_id(&self, id: &str) -> Result<Option<AdminSession>>;

    /// Delete a session
    async fn delete(&self, id: &str) -> Result<()>;

    /// Delete every session of an admin except `keep_id`
    async fn delete_by_admin_except(&self, admin_id: i64, keep_id: &str) -> Result<u64>;

    /// Delete sessions that expired before `now`
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64>;
}

/// SQLx-based session repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxSessionRepository {
    pool: DynDatabasePool,
}

impl SqlxSessionRepository {
    /// Create a new SQLx session repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SessionRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl SessionRepository for SqlxSessionRepository {
    async fn create(&self, session: &AdminSession) -> Result<AdminSession> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => create_session_sqlite(pool, session).await,
            Backend::Mysql(pool) => create_session_mysql(pool, session).await,
        }
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<AdminSession>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => get_session_by_id_sqlite(pool, id).await,
            Backend::Mysql(pool) => get_session_by_id_mysql(pool, id).await,
        }
    }

    async fn delete(&self, id: &str) -> Result<()> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => delete_session_sqlite(pool, id).await,
            Backend::Mysql(pool) => delete_session_mysql(pool, id).await,
        }
    }

    async fn delete_by_admin_except(&self, admin_id: i64, keep_id: &str) -> Result<u64> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => delete_by_admin_except_sqlite(pool, admin_id, keep_id).await,
            Backend::Mysql(pool) => delete_by_admin_except_mysql(pool, admin_id, keep_id).await,
        }
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => delete_expired_sessions_sqlite(pool, now).await,
            Backend::Mysql(pool) => delete_expired_sessions_mysql(pool, now).await,
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_session_sqlite(pool: &SqlitePool, session: &AdminSession) -> Result<AdminSession> {
    sqlx::query(
        r#"
        INSERT INTO admin_sessions (id, admin_id, expires_at, created_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&session.id)
    .bind(session.admin_id)
    .bind(session.expires_at)
    .bind(session.created_at)
    .execute(pool)
    .await
    .context("Failed to create session")?;

    Ok(session.clone())
}

async fn get_session_by_id_sqlite(pool: &SqlitePool, id: &str) -> Result<Option<AdminSession>> {
    let row = sqlx::query(
        r#"
        SELECT id, admin_id, expires_at, created_at
        FROM admin_sessions
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get session by ID")?;

    row.as_ref().map(row_to_session_sqlite).transpose()
}

async fn delete_session_sqlite(pool: &SqlitePool, id: &str) -> Result<()> {
    sqlx::query("DELETE FROM admin_sessions WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete session")?;

    Ok(())
}

async fn delete_by_admin_except_sqlite(pool: &SqlitePool, admin_id: i64, keep_id: &str) -> Result<u64> {
    let result = sqlx::query("DELETE FROM admin_sessions WHERE admin_id = ? AND id <> ?")
        .bind(admin_id)
        .bind(keep_id)
        .execute(pool)
        .await
        .context("Failed to delete other sessions")?;

    Ok(result.rows_affected())
}

async fn delete_expired_sessions_sqlite(pool: &SqlitePool, now: DateTime<Utc>) -> Result<u64> {
    let result = sqlx::query("DELETE FROM admin_sessions WHERE expires_at < ?")
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to delete expired sessions")?;

    Ok(result.rows_affected())
}

fn row_to_session_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<AdminSession> {
    Ok(AdminSession {
        id: row.try_get("id")?,
        admin_id: row.try_get("admin_id")?,
        expires_at: row.try_get("expires_at")?,
        created_at: row.try_get("created_at")?,
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_session_mysql(pool: &MySqlPool, session: &AdminSession) -> Result<AdminSession> {
    sqlx::query(
        r#"
        INSERT INTO admin_sessions (id, admin_id, expires_at, created_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&session.id)
    .bind(session.admin_id)
    .bind(session.expires_at)
    .bind(session.created_at)
    .execute(pool)
    .await
    .context("Failed to create session")?;

    Ok(session.clone())
}

async fn get_session_by_id_mysql(pool: &MySqlPool, id: &str) -> Result<Option<AdminSession>> {
    let row = sqlx::query(
        r#"
        SELECT id, admin_id, expires_at, created_at
        FROM admin_sessions
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get session by ID")?;

    row.as_ref().map(row_to_session_mysql).transpose()
}

async fn delete_session_mysql(pool: &MySqlPool, id: &str) -> Result<()> {
    sqlx::query("DELETE FROM admin_sessions WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete session")?;

    Ok(())
}

async fn delete_by_admin_except_mysql(pool: &MySqlPool, admin_id: i64, keep_id: &str) -> Result<u64> {
    let result = sqlx::query("DELETE FROM admin_sessions WHERE admin_id = ? AND id <> ?")
        .bind(admin_id)
        .bind(keep_id)
        .execute(pool)
        .await
        .context("Failed to delete other sessions")?;

    Ok(result.rows_affected())
}

async fn delete_expired_sessions_mysql(pool: &MySqlPool, now: DateTime<Utc>) -> Result<u64> {
    let result = sqlx::query("DELETE FROM admin_sessions WHERE expires_at < ?")
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to delete expired sessions")?;

    Ok(result.rows_affected())
}

fn row_to_session_mysql(row: &sqlx::mysql::MySqlRow) -> Result<AdminSession> {
    Ok(AdminSession {
        id: row.try_get("id")?,
        admin_id: row.try_get("admin_id")?,
        expires_at: row.try_get("expires_at")?,
        created_at: row.try_get("created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::admin::{AdminRepository, SqlxAdminRepository};
    use crate::db::{create_test_pool, migrations};
    use chrono::Duration;

    async fn setup() -> (SqlxSessionRepository, SqlxAdminRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        (
            SqlxSessionRepository::new(pool.clone()),
            SqlxAdminRepository::new(pool),
        )
    }

    fn session(id: &str, admin_id: i64, ttl: Duration) -> AdminSession {
        let now = Utc::now();
        AdminSession {
            id: id.to_string(),
            admin_id,
            expires_at: now + ttl,
            created_at: now,
        }
    }

    #[tokio::test]
    async fn test_create_get_delete() {
        let (sessions, admins) = setup().await;
        let admin = admins.create("owner", "hash").await.unwrap();

        sessions.create(&session("tok", admin.id, Duration::hours(1))).await.unwrap();

        let found = sessions.get_by_id("tok").await.unwrap().expect("Session not found");
        assert_eq!(found.admin_id, admin.id);
        assert!(!found.is_expired());

        sessions.delete("tok").await.unwrap();
        assert!(sessions.get_by_id("tok").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_session_requires_admin() {
        let (sessions, _) = setup().await;
        let result = sessions.create(&session("tok", 42, Duration::hours(1))).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_delete_by_admin_except() {
        let (sessions, admins) = setup().await;
        let owner = admins.create("owner", "hash").await.unwrap();
        let other = admins.create("other", "hash").await.unwrap();

        for id in ["a", "b", "c"] {
            sessions.create(&session(id, owner.id, Duration::hours(1))).await.unwrap();
        }
        sessions.create(&session("x", other.id, Duration::hours(1))).await.unwrap();

        let removed = sessions.delete_by_admin_except(owner.id, "b").await.unwrap();
        assert_eq!(removed, 2);
        assert!(sessions.get_by_id("b").await.unwrap().is_some());
        assert!(sessions.get_by_id("a").await.unwrap().is_none());
        assert!(sessions.get_by_id("x").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_expired() {
        let (sessions, admins) = setup().await;
        let admin = admins.create("owner", "hash").await.unwrap();

        sessions.create(&session("old", admin.id, Duration::hours(-1))).await.unwrap();
        sessions.create(&session("live", admin.id, Duration::hours(1))).await.unwrap();

        let removed = sessions.delete_expired(Utc::now()).await.unwrap();
        assert_eq!(removed, 1);
        assert!(sessions.get_by_id("old").await.unwrap().is_none());
        assert!(sessions.get_by_id("live").await.unwrap().is_some());
    }
}
