//! Tag repository
//!
//! Database operations for tags. Post associations live in `post_tags` and are
//! written by the post repository; this module only reads them.

use crate::db::{Backend, DynDatabasePool};
use crate::models::{CreateTagInput, Tag, UpdateTagInput};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Tag repository trait
#[async_trait]
pub trait TagRepository: Send + Sync {
    /// Create a new tag
    async fn create(&self, input: &CreateTagInput) -> Result<Tag>;

    /// Get tag by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Tag>>;

    /// Get tag by slug
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Tag>>;

    /// List all tags ordered by name
    async fn list(&self) -> Result<Vec<Tag>>;

    /// Tags attached to a post, ordered by name
    async fn list_by_post(&self, post_slug: &str) -> Result<Vec<Tag>>;

    /// Apply a partial update. Returns `None` when the tag doesn't exist.
    async fn update(&self, id: i64, input: &UpdateTagInput) -> Result<Option<Tag>>;

    /// Delete a tag and its post associations
    async fn delete(&self, id: i64) -> Result<()>;

    /// Count all tags
    async fn count(&self) -> Result<i64>;
}

/// SQLx-based tag repository implementation
pub struct SqlxTagRepository {
    pool: DynDatabasePool,
}

impl SqlxTagRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn TagRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl TagRepository for SqlxTagRepository {
    async fn create(&self, input: &CreateTagInput) -> Result<Tag> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => create_tag_sqlite(pool, input).await,
            Backend::Mysql(pool) => create_tag_mysql(pool, input).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Tag>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => get_tag_by_id_sqlite(pool, id).await,
            Backend::Mysql(pool) => get_tag_by_id_mysql(pool, id).await,
        }
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Tag>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => get_tag_by_slug_sqlite(pool, slug).await,
            Backend::Mysql(pool) => get_tag_by_slug_mysql(pool, slug).await,
        }
    }

    async fn list(&self) -> Result<Vec<Tag>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => list_tags_sqlite(pool).await,
            Backend::Mysql(pool) => list_tags_mysql(pool).await,
        }
    }

    async fn list_by_post(&self, post_slug: &str) -> Result<Vec<Tag>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => list_tags_by_post_sqlite(pool, post_slug).await,
            Backend::Mysql(pool) => list_tags_by_post_mysql(pool, post_slug).await,
        }
    }

    async fn update(&self, id: i64, input: &UpdateTagInput) -> Result<Option<Tag>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => update_tag_sqlite(pool, id, input).await,
            Backend::Mysql(pool) => update_tag_mysql(pool, id, input).await,
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => delete_tag_sqlite(pool, id).await,
            Backend::Mysql(pool) => delete_tag_mysql(pool, id).await,
        }
    }

    async fn count(&self) -> Result<i64> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => count_tags_sqlite(pool).await,
            Backend::Mysql(pool) => count_tags_mysql(pool).await,
        }
    }
}

fn apply_update(existing: Tag, input: &UpdateTagInput) -> Tag {
    Tag {
        name: input.name.clone().unwrap_or(existing.name),
        slug: input.slug.clone().unwrap_or(existing.slug),
        description: input.description.clone().unwrap_or(existing.description),
        updated_at: Utc::now(),
        ..existing
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_tag_sqlite(pool: &SqlitePool, input: &CreateTagInput) -> Result<Tag> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO tags (name, slug, description, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&input.name)
    .bind(&input.slug)
    .bind(&input.description)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create tag")?;

    Ok(Tag {
        id: result.last_insert_rowid(),
        name: input.name.clone(),
        slug: input.slug.clone(),
        description: input.description.clone(),
        created_at: now,
        updated_at: now,
    })
}

async fn get_tag_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Tag>> {
    let row = sqlx::query(
        "SELECT id, name, slug, description, created_at, updated_at FROM tags WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get tag by ID")?;

    row.as_ref().map(row_to_tag_sqlite).transpose()
}

async fn get_tag_by_slug_sqlite(pool: &SqlitePool, slug: &str) -> Result<Option<Tag>> {
    let row = sqlx::query(
        "SELECT id, name, slug, description, created_at, updated_at FROM tags WHERE slug = ?",
    )
    .bind(slug)
    .fetch_optional(pool)
    .await
    .context("Failed to get tag by slug")?;

    row.as_ref().map(row_to_tag_sqlite).transpose()
}

async fn list_tags_sqlite(pool: &SqlitePool) -> Result<Vec<Tag>> {
    let rows = sqlx::query(
        "SELECT id, name, slug, description, created_at, updated_at FROM tags ORDER BY name",
    )
    .fetch_all(pool)
    .await
    .context("Failed to list tags")?;

    rows.iter().map(row_to_tag_sqlite).collect()
}

pub(super) async fn list_tags_by_post_sqlite(pool: &SqlitePool, post_slug: &str) -> Result<Vec<Tag>> {
    let rows = sqlx::query(
        r#"
        SELECT t.id, t.name, t.slug, t.description, t.created_at, t.updated_at
        FROM tags t
        INNER JOIN post_tags pt ON pt.tag_id = t.id
        WHERE pt.post_slug = ?
        ORDER BY t.name
        "#,
    )
    .bind(post_slug)
    .fetch_all(pool)
    .await
    .context("Failed to get tags for post")?;

    rows.iter().map(row_to_tag_sqlite).collect()
}

async fn update_tag_sqlite(pool: &SqlitePool, id: i64, input: &UpdateTagInput) -> Result<Option<Tag>> {
    let Some(existing) = get_tag_by_id_sqlite(pool, id).await? else {
        return Ok(None);
    };
    let updated = apply_update(existing, input);

    sqlx::query("UPDATE tags SET name = ?, slug = ?, description = ?, updated_at = ? WHERE id = ?")
        .bind(&updated.name)
        .bind(&updated.slug)
        .bind(&updated.description)
        .bind(updated.updated_at)
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to update tag")?;

    Ok(Some(updated))
}

async fn delete_tag_sqlite(pool: &SqlitePool, id: i64) -> Result<()> {
    // post_tags rows go with it (ON DELETE CASCADE)
    sqlx::query("DELETE FROM tags WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete tag")?;

    Ok(())
}

async fn count_tags_sqlite(pool: &SqlitePool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) AS count FROM tags")
        .fetch_one(pool)
        .await
        .context("Failed to count tags")?;

    Ok(row.get("count"))
}

fn row_to_tag_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Tag> {
    Ok(Tag {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        slug: row.try_get("slug")?,
        description: row.try_get("description")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_tag_mysql(pool: &MySqlPool, input: &CreateTagInput) -> Result<Tag> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO tags (name, slug, description, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&input.name)
    .bind(&input.slug)
    .bind(&input.description)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create tag")?;

    Ok(Tag {
        id: result.last_insert_id() as i64,
        name: input.name.clone(),
        slug: input.slug.clone(),
        description: input.description.clone(),
        created_at: now,
        updated_at: now,
    })
}

async fn get_tag_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Tag>> {
    let row = sqlx::query(
        "SELECT id, name, slug, description, created_at, updated_at FROM tags WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get tag by ID")?;

    row.as_ref().map(row_to_tag_mysql).transpose()
}

async fn get_tag_by_slug_mysql(pool: &MySqlPool, slug: &str) -> Result<Option<Tag>> {
    let row = sqlx::query(
        "SELECT id, name, slug, description, created_at, updated_at FROM tags WHERE slug = ?",
    )
    .bind(slug)
    .fetch_optional(pool)
    .await
    .context("Failed to get tag by slug")?;

    row.as_ref().map(row_to_tag_mysql).transpose()
}

async fn list_tags_mysql(pool: &MySqlPool) -> Result<Vec<Tag>> {
    let rows = sqlx::query(
        "SELECT id, name, slug, description, created_at, updated_at FROM tags ORDER BY name",
    )
    .fetch_all(pool)
    .await
    .context("Failed to list tags")?;

    rows.iter().map(row_to_tag_mysql).collect()
}

pub(super) async fn list_tags_by_post_mysql(pool: &MySqlPool, post_slug: &str) -> Result<Vec<Tag>> {
    let rows = sqlx::query(
        r#"
        SELECT t.id, t.name, t.slug, t.description, t.created_at, t.updated_at
        FROM tags t
        INNER JOIN post_tags pt ON pt.tag_id = t.id
        WHERE pt.post_slug = ?
        ORDER BY t.name
        "#,
    )
    .bind(post_slug)
    .fetch_all(pool)
    .await
    .context("Failed to get tags for post")?;

    rows.iter().map(row_to_tag_mysql).collect()
}

async fn update_tag_mysql(pool: &MySqlPool, id: i64, input: &UpdateTagInput) -> Result<Option<Tag>> {
    let Some(existing) = get_tag_by_id_mysql(pool, id).await? else {
        return Ok(None);
    };
    let updated = apply_update(existing, input);

    sqlx::query("UPDATE tags SET name = ?, slug = ?, description = ?, updated_at = ? WHERE id = ?")
        .bind(&updated.name)
        .bind(&updated.slug)
        .bind(&updated.description)
        .bind(updated.updated_at)
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to update tag")?;

    Ok(Some(updated))
}

async fn delete_tag_mysql(pool: &MySqlPool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM tags WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete tag")?;

    Ok(())
}

async fn count_tags_mysql(pool: &MySqlPool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) AS count FROM tags")
        .fetch_one(pool)
        .await
        .context("Failed to count tags")?;

    Ok(row.get("count"))
}

fn row_to_tag_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Tag> {
    Ok(Tag {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        slug: row.try_get("slug")?,
        description: row.try_get("description")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
