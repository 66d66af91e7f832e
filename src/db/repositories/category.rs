//! Category repository
//!
//! Database operations for categories.
//!
//! This module provides:
//! - `CategoryRepository` trait defining the interface for category data access
//! - `SqlxCategoryRepository` implementing the trait for SQLite and MySQL

use crate::db::{Backend, DynDatabasePool};
use crate::models::{Category, CategoryWithCount, CreateCategoryInput, UpdateCategoryInput};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Category repository trait
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Create a new category
    async fn create(&self, input: &CreateCategoryInput) -> Result<Category>;

    /// Get category by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Category>>;

    /// Get category by slug
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>>;

    /// List all categories ordered by `sort_order, name`
    async fn list(&self) -> Result<Vec<Category>>;

    /// List all categories with their published post counts
    async fn list_with_published_counts(&self) -> Result<Vec<CategoryWithCount>>;

    /// Apply a partial update. Returns `None` when the category doesn't exist.
    async fn update(&self, id: i64, input: &UpdateCategoryInput) -> Result<Option<Category>>;

    /// Delete a category. Referencing posts keep existing with `category_id = NULL`.
    async fn delete(&self, id: i64) -> Result<()>;

    /// Count all categories
    async fn count(&self) -> Result<i64>;
}

/// SQLx-based category repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxCategoryRepository {
    pool: DynDatabasePool,
}

impl SqlxCategoryRepository {
    /// Create a new SQLx category repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CategoryRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CategoryRepository for SqlxCategoryRepository {
    async fn create(&self, input: &CreateCategoryInput) -> Result<Category> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => create_category_sqlite(pool, input).await,
            Backend::Mysql(pool) => create_category_mysql(pool, input).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Category>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => get_category_by_id_sqlite(pool, id).await,
            Backend::Mysql(pool) => get_category_by_id_mysql(pool, id).await,
        }
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => get_category_by_slug_sqlite(pool, slug).await,
            Backend::Mysql(pool) => get_category_by_slug_mysql(pool, slug).await,
        }
    }

    async fn list(&self) -> Result<Vec<Category>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => list_categories_sqlite(pool).await,
            Backend::Mysql(pool) => list_categories_mysql(pool).await,
        }
    }

    async fn list_with_published_counts(&self) -> Result<Vec<CategoryWithCount>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => list_with_counts_sqlite(pool).await,
            Backend::Mysql(pool) => list_with_counts_mysql(pool).await,
        }
    }

    async fn update(&self, id: i64, input: &UpdateCategoryInput) -> Result<Option<Category>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => update_category_sqlite(pool, id, input).await,
            Backend::Mysql(pool) => update_category_mysql(pool, id, input).await,
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => delete_category_sqlite(pool, id).await,
            Backend::Mysql(pool) => delete_category_mysql(pool, id).await,
        }
    }

    async fn count(&self) -> Result<i64> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => count_categories_sqlite(pool).await,
            Backend::Mysql(pool) => count_categories_mysql(pool).await,
        }
    }
}

/// Merge a partial update over the stored row
fn apply_update(existing: Category, input: &UpdateCategoryInput) -> Category {
    Category {
        name: input.name.clone().unwrap_or(existing.name),
        slug: input.slug.clone().unwrap_or(existing.slug),
        description: input.description.clone().unwrap_or(existing.description),
        sort_order: input.sort_order.unwrap_or(existing.sort_order),
        updated_at: Utc::now(),
        ..existing
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_category_sqlite(pool: &SqlitePool, input: &CreateCategoryInput) -> Result<Category> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO categories (name, slug, description, sort_order, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&input.name)
    .bind(&input.slug)
    .bind(&input.description)
    .bind(input.sort_order)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create category")?;

    Ok(Category {
        id: result.last_insert_rowid(),
        name: input.name.clone(),
        slug: input.slug.clone(),
        description: input.description.clone(),
        sort_order: input.sort_order,
        created_at: now,
        updated_at: now,
    })
}

async fn get_category_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Category>> {
    let row = sqlx::query(
        r#"
        SELECT id, name, slug, description, sort_order, created_at, updated_at
        FROM categories
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get category by ID")?;

    row.as_ref().map(row_to_category_sqlite).transpose()
}

async fn get_category_by_slug_sqlite(pool: &SqlitePool, slug: &str) -> Result<Option<Category>> {
    let row = sqlx::query(
        r#"
        SELECT id, name, slug, description, sort_order, created_at, updated_at
        FROM categories
        WHERE slug = ?
        "#,
    )
    .bind(slug)
    .fetch_optional(pool)
    .await
    .context("Failed to get category by slug")?;

    row.as_ref().map(row_to_category_sqlite).transpose()
}

async fn list_categories_sqlite(pool: &SqlitePool) -> Result<Vec<Category>> {
    let rows = sqlx::query(
        r#"
        SELECT id, name, slug, description, sort_order, created_at, updated_at
        FROM categories
        ORDER BY sort_order, name
        "#,
    )
    .fetch_all(pool)
    .await
    .context("Failed to list categories")?;

    rows.iter().map(row_to_category_sqlite).collect()
}

async fn list_with_counts_sqlite(pool: &SqlitePool) -> Result<Vec<CategoryWithCount>> {
    let rows = sqlx::query(
        r#"
        SELECT c.id, c.name, c.slug, c.description, c.sort_order, c.created_at, c.updated_at,
               COUNT(p.slug) AS post_count
        FROM categories c
        LEFT JOIN blog_posts p ON p.category_id = c.id AND p.published = ?
        GROUP BY c.id, c.name, c.slug, c.description, c.sort_order, c.created_at, c.updated_at
        ORDER BY c.sort_order, c.name
        "#,
    )
    .bind(true)
    .fetch_all(pool)
    .await
    .context("Failed to list categories with post counts")?;

    rows.iter()
        .map(|row| {
            Ok(CategoryWithCount {
                category: row_to_category_sqlite(row)?,
                post_count: row.get("post_count"),
            })
        })
        .collect()
}

async fn update_category_sqlite(
    pool: &SqlitePool,
    id: i64,
    input: &UpdateCategoryInput,
) -> Result<Option<Category>> {
    let Some(existing) = get_category_by_id_sqlite(pool, id).await? else {
        return Ok(None);
    };
    let updated = apply_update(existing, input);

    sqlx::query(
        r#"
        UPDATE categories
        SET name = ?, slug = ?, description = ?, sort_order = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&updated.name)
    .bind(&updated.slug)
    .bind(&updated.description)
    .bind(updated.sort_order)
    .bind(updated.updated_at)
    .bind(id)
    .execute(pool)
    .await
    .context("Failed to update category")?;

    Ok(Some(updated))
}

async fn delete_category_sqlite(pool: &SqlitePool, id: i64) -> Result<()> {
    // blog_posts.category_id is cleared by ON DELETE SET NULL
    sqlx::query("DELETE FROM categories WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete category")?;

    Ok(())
}

async fn count_categories_sqlite(pool: &SqlitePool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) AS count FROM categories")
        .fetch_one(pool)
        .await
        .context("Failed to count categories")?;

    Ok(row.get("count"))
}

fn row_to_category_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Category> {
    Ok(Category {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        slug: row.try_get("slug")?,
        description: row.try_get("description")?,
        sort_order: row.try_get("sort_order")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_category_mysql(pool: &MySqlPool, input: &CreateCategoryInput) -> Result<Category> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO categories (name, slug, description, sort_order, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&input.name)
    .bind(&input.slug)
    .bind(&input.description)
    .bind(input.sort_order)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create category")?;

    Ok(Category {
        id: result.last_insert_id() as i64,
        name: input.name.clone(),
        slug: input.slug.clone(),
        description: input.description.clone(),
        sort_order: input.sort_order,
        created_at: now,
        updated_at: now,
    })
}

async fn get_category_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Category>> {
    let row = sqlx::query(
        r#"
        SELECT id, name, slug, description, sort_order, created_at, updated_at
        FROM categories
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get category by ID")?;

    row.as_ref().map(row_to_category_mysql).transpose()
}

async fn get_category_by_slug_mysql(pool: &MySqlPool, slug: &str) -> Result<Option<Category>> {
    let row = sqlx::query(
        r#"
        SELECT id, name, slug, description, sort_order, created_at, updated_at
        FROM categories
        WHERE slug = ?
        "#,
    )
    .bind(slug)
    .fetch_optional(pool)
    .await
    .context("Failed to get category by slug")?;

    row.as_ref().map(row_to_category_mysql).transpose()
}

async fn list_categories_mysql(pool: &MySqlPool) -> Result<Vec<Category>> {
    let rows = sqlx::query(
        r#"
        SELECT id, name, slug, description, sort_order, created_at, updated_at
        FROM categories
        ORDER BY sort_order, name
        "#,
    )
    .fetch_all(pool)
    .await
    .context("Failed to list categories")?;

    rows.iter().map(row_to_category_mysql).collect()
}

async fn list_with_counts_mysql(pool: &MySqlPool) -> Result<Vec<CategoryWithCount>> {
    let rows = sqlx::query(
        r#"
        SELECT c.id, c.name, c.slug, c.description, c.sort_order, c.created_at, c.updated_at,
               COUNT(p.slug) AS post_count
        FROM categories c
        LEFT JOIN blog_posts p ON p.category_id = c.id AND p.published = ?
        GROUP BY c.id, c.name, c.slug, c.description, c.sort_order, c.created_at, c.updated_at
        ORDER BY c.sort_order, c.name
        "#,
    )
    .bind(true)
    .fetch_all(pool)
    .await
    .context("Failed to list categories with post counts")?;

    rows.iter()
        .map(|row| {
            Ok(CategoryWithCount {
                category: row_to_category_mysql(row)?,
                post_count: row.get("post_count"),
            })
        })
        .collect()
}

async fn update_category_mysql(
    pool: &MySqlPool,
    id: i64,
    input: &UpdateCategoryInput,
) -> Result<Option<Category>> {
    let Some(existing) = get_category_by_id_mysql(pool, id).await? else {
        return Ok(None);
    };
    let updated = apply_update(existing, input);

    sqlx::query(
        r#"
        UPDATE categories
        SET name = ?, slug = ?, description = ?, sort_order = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&updated.name)
    .bind(&updated.slug)
    .bind(&updated.description)
    .bind(updated.sort_order)
    .bind(updated.updated_at)
    .bind(id)
    .execute(pool)
    .await
    .context("Failed to update category")?;

    Ok(Some(updated))
}

async fn delete_category_mysql(pool: &MySqlPool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM categories WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete category")?;

    Ok(())
}

async fn count_categories_mysql(pool: &MySqlPool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) AS count FROM categories")
        .fetch_one(pool)
        .await
        .context("Failed to count categories")?;

    Ok(row.get("count"))
}

fn row_to_category_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Category> {
    Ok(Category {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        slug: row.try_get("slug")?,
        description: row.try_get("description")?,
        sort_order: row.try_get("sort_order")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::pool::sqlite_of;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> (DynDatabasePool, SqlxCategoryRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let repo = SqlxCategoryRepository::new(pool.clone());
        (pool, repo)
    }

    #[tokio::test]
    async fn test_create_and_get_category() {
        let (_pool, repo) = setup_test_repo().await;

        let input = CreateCategoryInput::new("Tech", "tech")
            .with_description("Technology")
            .with_sort_order(2);
        let created = repo.create(&input).await.expect("Failed to create category");

        assert!(created.id > 0);
        let found = repo
            .get_by_slug("tech")
            .await
            .expect("Failed to get category")
            .expect("Category not found");
        assert_eq!(found.id, created.id);
        assert_eq!(found.name, "Tech");
        assert_eq!(found.description.as_deref(), Some("Technology"));
        assert_eq!(found.sort_order, 2);

        let by_id = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(by_id.slug, "tech");
    }

    #[tokio::test]
    async fn test_get_missing_category() {
        let (_pool, repo) = setup_test_repo().await;

        assert!(repo.get_by_id(999).await.unwrap().is_none());
        assert!(repo.get_by_slug("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_ordered_by_sort_order_then_name() {
        let (_pool, repo) = setup_test_repo().await;

        repo.create(&CreateCategoryInput::new("Zeta", "zeta").with_sort_order(0))
            .await
            .unwrap();
        repo.create(&CreateCategoryInput::new("Beta", "beta").with_sort_order(1))
            .await
            .unwrap();
        repo.create(&CreateCategoryInput::new("Alpha", "alpha").with_sort_order(0))
            .await
            .unwrap();

        let slugs: Vec<String> = repo.list().await.unwrap().into_iter().map(|c| c.slug).collect();
        assert_eq!(slugs, vec!["alpha", "zeta", "beta"]);
    }

    #[tokio::test]
    async fn test_duplicate_slug_rejected() {
        let (_pool, repo) = setup_test_repo().await;

        repo.create(&CreateCategoryInput::new("Tech", "tech")).await.unwrap();
        let err = repo
            .create(&CreateCategoryInput::new("Tech 2", "tech"))
            .await
            .unwrap_err();

        let db_err = err
            .downcast_ref::<sqlx::Error>()
            .and_then(|e| e.as_database_error())
            .expect("expected a database error");
        assert!(db_err.is_unique_violation());
    }

    #[tokio::test]
    async fn test_partial_update() {
        let (_pool, repo) = setup_test_repo().await;
        let created = repo
            .create(&CreateCategoryInput::new("Tech", "tech").with_description("old"))
            .await
            .unwrap();

        let update = UpdateCategoryInput {
            name: Some("Technology".to_string()),
            ..Default::default()
        };
        let updated = repo.update(created.id, &update).await.unwrap().unwrap();
        assert_eq!(updated.name, "Technology");
        assert_eq!(updated.slug, "tech");
        assert_eq!(updated.description.as_deref(), Some("old"));
        assert!(updated.updated_at >= created.updated_at);

        let clear = UpdateCategoryInput {
            description: Some(None),
            ..Default::default()
        };
        repo.update(created.id, &clear).await.unwrap();
        let stored = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert!(stored.description.is_none());
        assert_eq!(stored.name, "Technology");
    }

    #[tokio::test]
    async fn test_update_missing_category() {
        let (_pool, repo) = setup_test_repo().await;

        let update = UpdateCategoryInput {
            name: Some("X".to_string()),
            ..Default::default()
        };
        assert!(repo.update(42, &update).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_category() {
        let (_pool, repo) = setup_test_repo().await;
        let created = repo.create(&CreateCategoryInput::new("Tech", "tech")).await.unwrap();

        repo.delete(created.id).await.unwrap();
        assert!(repo.get_by_id(created.id).await.unwrap().is_none());

        // Deleting again is a no-op
        repo.delete(created.id).await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_published_counts() {
        let (pool, repo) = setup_test_repo().await;
        let sqlite_pool = sqlite_of(&pool);
        let tech = repo.create(&CreateCategoryInput::new("Tech", "tech")).await.unwrap();
        repo.create(&CreateCategoryInput::new("Life", "life")).await.unwrap();

        for (slug, published) in [("a", true), ("b", true), ("c", false)] {
            sqlx::query(
                "INSERT INTO blog_posts (slug, title, date, excerpt, content, category_id, published)
                 VALUES (?, ?, '2024-01-01', '', '', ?, ?)",
            )
            .bind(slug)
            .bind(slug)
            .bind(tech.id)
            .bind(published)
            .execute(sqlite_pool)
            .await
            .unwrap();
        }

        let counts = repo.list_with_published_counts().await.unwrap();
        let tech_count = counts.iter().find(|c| c.category.slug == "tech").unwrap();
        let life_count = counts.iter().find(|c| c.category.slug == "life").unwrap();
        assert_eq!(tech_count.post_count, 2);
        assert_eq!(life_count.post_count, 0);
    }
}
