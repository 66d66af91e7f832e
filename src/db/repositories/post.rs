//! Post repository
//!
//! Database operations for blog posts, keyed by slug.
//!
//! This module provides:
//! - `PostRepository` trait defining the interface for post data access
//! - `SqlxPostRepository` implementing the trait for SQLite and MySQL
//!
//! Reads that return `PostWithRelations` run one query with a `LEFT JOIN` on
//! `categories` and one tag query per post. List queries resolve the tag
//! queries concurrently. Writes that carry `tag_ids` replace the whole
//! association set in the same transaction as the post row.

use crate::db::{Backend, DynDatabasePool};
use crate::models::{
    AdjacentPosts, Category, CreatePostInput, Post, PostLink, PostWithRelations, UpdatePostInput,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use futures::future::try_join_all;
use sqlx::{MySql, MySqlPool, Row, Sqlite, SqlitePool, Transaction};
use std::collections::HashSet;
use std::sync::Arc;

use super::tag::{list_tags_by_post_mysql, list_tags_by_post_sqlite};

/// Post repository trait
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Create a post, attaching `tag_ids` when present
    async fn create(&self, input: &CreatePostInput) -> Result<Post>;

    /// Get any post (draft or published) with category and tags
    async fn get_by_slug(&self, slug: &str) -> Result<Option<PostWithRelations>>;

    /// Get a published post with category and tags
    async fn get_published_by_slug(&self, slug: &str) -> Result<Option<PostWithRelations>>;

    /// All posts, newest `created_at` first, drafts included
    async fn list(&self) -> Result<Vec<PostWithRelations>>;

    /// Published posts, newest `date` first
    async fn list_published(&self) -> Result<Vec<PostWithRelations>>;

    /// Published posts in a category, newest `date` first
    async fn list_published_by_category(&self, category_id: i64) -> Result<Vec<Post>>;

    /// Published posts carrying a tag, newest `date` first
    async fn list_published_by_tag(&self, tag_id: i64) -> Result<Vec<Post>>;

    /// Chronological neighbours of a published post. `None` when the slug is
    /// unknown or unpublished.
    async fn adjacent(&self, slug: &str) -> Result<Option<AdjacentPosts>>;

    /// Other published posts related by category and shared tags
    async fn related(&self, slug: &str, limit: i64) -> Result<Vec<Post>>;

    /// Apply a partial update. Returns `None` when the post doesn't exist.
    async fn update(&self, slug: &str, input: &UpdatePostInput) -> Result<Option<Post>>;

    /// Delete a post and its tag associations
    async fn delete(&self, slug: &str) -> Result<()>;

    /// Add one to the view counter. Returns false when no row matched.
    async fn increment_view_count(&self, slug: &str) -> Result<bool>;

    /// Count all posts
    async fn count(&self) -> Result<i64>;

    /// Count published posts
    async fn count_published(&self) -> Result<i64>;
}

/// SQLx-based post repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxPostRepository {
    pool: DynDatabasePool,
}

impl SqlxPostRepository {
    /// Create a new SQLx post repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PostRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl PostRepository for SqlxPostRepository {
    async fn create(&self, input: &CreatePostInput) -> Result<Post> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => create_post_sqlite(pool, input).await,
            Backend::Mysql(pool) => create_post_mysql(pool, input).await,
        }
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<PostWithRelations>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => get_with_relations_sqlite(pool, slug, false).await,
            Backend::Mysql(pool) => get_with_relations_mysql(pool, slug, false).await,
        }
    }

    async fn get_published_by_slug(&self, slug: &str) -> Result<Option<PostWithRelations>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => get_with_relations_sqlite(pool, slug, true).await,
            Backend::Mysql(pool) => get_with_relations_mysql(pool, slug, true).await,
        }
    }

    async fn list(&self) -> Result<Vec<PostWithRelations>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => list_with_relations_sqlite(pool, false).await,
            Backend::Mysql(pool) => list_with_relations_mysql(pool, false).await,
        }
    }

    async fn list_published(&self) -> Result<Vec<PostWithRelations>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => list_with_relations_sqlite(pool, true).await,
            Backend::Mysql(pool) => list_with_relations_mysql(pool, true).await,
        }
    }

    async fn list_published_by_category(&self, category_id: i64) -> Result<Vec<Post>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => list_published_by_category_sqlite(pool, category_id).await,
            Backend::Mysql(pool) => list_published_by_category_mysql(pool, category_id).await,
        }
    }

    async fn list_published_by_tag(&self, tag_id: i64) -> Result<Vec<Post>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => list_published_by_tag_sqlite(pool, tag_id).await,
            Backend::Mysql(pool) => list_published_by_tag_mysql(pool, tag_id).await,
        }
    }

    async fn adjacent(&self, slug: &str) -> Result<Option<AdjacentPosts>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => adjacent_sqlite(pool, slug).await,
            Backend::Mysql(pool) => adjacent_mysql(pool, slug).await,
        }
    }

    async fn related(&self, slug: &str, limit: i64) -> Result<Vec<Post>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => related_sqlite(pool, slug, limit).await,
            Backend::Mysql(pool) => related_mysql(pool, slug, limit).await,
        }
    }

    async fn update(&self, slug: &str, input: &UpdatePostInput) -> Result<Option<Post>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => update_post_sqlite(pool, slug, input).await,
            Backend::Mysql(pool) => update_post_mysql(pool, slug, input).await,
        }
    }

    async fn delete(&self, slug: &str) -> Result<()> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => delete_post_sqlite(pool, slug).await,
            Backend::Mysql(pool) => delete_post_mysql(pool, slug).await,
        }
    }

    async fn increment_view_count(&self, slug: &str) -> Result<bool> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => increment_view_count_sqlite(pool, slug).await,
            Backend::Mysql(pool) => increment_view_count_mysql(pool, slug).await,
        }
    }

    async fn count(&self) -> Result<i64> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => count_posts_sqlite(pool, None).await,
            Backend::Mysql(pool) => count_posts_mysql(pool, None).await,
        }
    }

    async fn count_published(&self) -> Result<i64> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => count_posts_sqlite(pool, Some(true)).await,
            Backend::Mysql(pool) => count_posts_mysql(pool, Some(true)).await,
        }
    }
}

// ============================================================================
// Shared SQL
// ============================================================================

const POST_COLUMNS: &str = "p.slug, p.title, p.subtitle, p.date, p.excerpt, p.content, \
     p.markdown_content, p.featured_image, p.view_count, p.like_count, p.category_id, \
     p.published, p.created_at, p.updated_at";

const CATEGORY_JOIN_COLUMNS: &str = "c.id AS category_ref_id, c.name AS category_name, \
     c.slug AS category_slug, c.description AS category_description, \
     c.sort_order AS category_sort_order, c.created_at AS category_created_at, \
     c.updated_at AS category_updated_at";

fn select_with_category(filter: &str) -> String {
    format!(
        "SELECT {POST_COLUMNS}, {CATEGORY_JOIN_COLUMNS} \
         FROM blog_posts p LEFT JOIN categories c ON c.id = p.category_id {filter}"
    )
}

fn get_with_category_sql(published_only: bool) -> String {
    if published_only {
        select_with_category("WHERE p.slug = ? AND p.published = ?")
    } else {
        select_with_category("WHERE p.slug = ?")
    }
}

fn list_with_category_sql(published_only: bool) -> String {
    if published_only {
        select_with_category("WHERE p.published = ? ORDER BY p.date DESC")
    } else {
        select_with_category("ORDER BY p.created_at DESC")
    }
}

fn get_post_sql() -> String {
    format!("SELECT {POST_COLUMNS} FROM blog_posts p WHERE p.slug = ?")
}

fn published_by_category_sql() -> String {
    format!(
        "SELECT {POST_COLUMNS} FROM blog_posts p \
         WHERE p.published = ? AND p.category_id = ? ORDER BY p.date DESC"
    )
}

fn published_by_tag_sql() -> String {
    format!(
        "SELECT {POST_COLUMNS} FROM blog_posts p \
         INNER JOIN post_tags pt ON pt.post_slug = p.slug \
         WHERE p.published = ? AND pt.tag_id = ? ORDER BY p.date DESC"
    )
}

/// Related-posts query. Binds, in order: published flag, source slug,
/// category id (if any), each tag id, limit.
fn related_sql(with_category: bool, tag_count: usize) -> String {
    let mut sql = format!(
        "SELECT {POST_COLUMNS} FROM blog_posts p WHERE p.published = ? AND p.slug <> ?"
    );
    if with_category {
        sql.push_str(" AND p.category_id = ?");
    }
    if tag_count > 0 {
        let placeholders = vec!["?"; tag_count].join(", ");
        sql.push_str(&format!(
            " AND EXISTS (SELECT 1 FROM post_tags pt \
             WHERE pt.post_slug = p.slug AND pt.tag_id IN ({placeholders}))"
        ));
    }
    sql.push_str(" ORDER BY p.date DESC LIMIT ?");
    sql
}

const INSERT_POST_SQL: &str = r#"
    INSERT INTO blog_posts (slug, title, subtitle, date, excerpt, content, markdown_content,
        featured_image, view_count, like_count, category_id, published, created_at, updated_at)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0, 0, ?, ?, ?, ?)
"#;

const UPDATE_POST_SQL: &str = r#"
    UPDATE blog_posts
    SET title = ?, subtitle = ?, date = ?, excerpt = ?, content = ?, markdown_content = ?,
        featured_image = ?, category_id = ?, published = ?, updated_at = ?
    WHERE slug = ?
"#;

/// Distinct ids in first-seen order
fn distinct_ids(ids: &[i64]) -> Vec<i64> {
    let mut seen = HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

fn new_post(input: &CreatePostInput) -> Post {
    let now = Utc::now();
    Post {
        slug: input.slug.clone(),
        title: input.title.clone(),
        subtitle: input.subtitle.clone(),
        date: input.date,
        excerpt: input.excerpt.clone(),
        content: input.content.clone(),
        markdown_content: input.markdown_content.clone(),
        featured_image: input.featured_image.clone(),
        view_count: 0,
        like_count: 0,
        category_id: input.category_id,
        published: input.published,
        created_at: now,
        updated_at: now,
    }
}

/// Merge a partial update over the stored row
fn apply_update(existing: Post, input: &UpdatePostInput) -> Post {
    Post {
        title: input.title.clone().unwrap_or(existing.title),
        subtitle: input.subtitle.clone().unwrap_or(existing.subtitle),
        date: input.date.unwrap_or(existing.date),
        excerpt: input.excerpt.clone().unwrap_or(existing.excerpt),
        content: input.content.clone().unwrap_or(existing.content),
        markdown_content: input
            .markdown_content
            .clone()
            .unwrap_or(existing.markdown_content),
        featured_image: input.featured_image.clone().unwrap_or(existing.featured_image),
        category_id: input.category_id.unwrap_or(existing.category_id),
        published: input.published.unwrap_or(existing.published),
        updated_at: Utc::now(),
        ..existing
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_post_sqlite(pool: &SqlitePool, input: &CreatePostInput) -> Result<Post> {
    let post = new_post(input);
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query(INSERT_POST_SQL)
        .bind(&post.slug)
        .bind(&post.title)
        .bind(&post.subtitle)
        .bind(post.date)
        .bind(&post.excerpt)
        .bind(&post.content)
        .bind(&post.markdown_content)
        .bind(&post.featured_image)
        .bind(post.category_id)
        .bind(post.published)
        .bind(post.created_at)
        .bind(post.updated_at)
        .execute(&mut *tx)
        .await
        .context("Failed to create post")?;

    if let Some(tag_ids) = &input.tag_ids {
        replace_tags_sqlite(&mut tx, &post.slug, tag_ids).await?;
    }

    tx.commit().await.context("Failed to commit post")?;
    Ok(post)
}

async fn replace_tags_sqlite(
    tx: &mut Transaction<'_, Sqlite>,
    slug: &str,
    tag_ids: &[i64],
) -> Result<()> {
    sqlx::query("DELETE FROM post_tags WHERE post_slug = ?")
        .bind(slug)
        .execute(&mut **tx)
        .await
        .context("Failed to clear post tags")?;

    for tag_id in distinct_ids(tag_ids) {
        sqlx::query("INSERT INTO post_tags (post_slug, tag_id) VALUES (?, ?)")
            .bind(slug)
            .bind(tag_id)
            .execute(&mut **tx)
            .await
            .with_context(|| format!("Failed to attach tag {} to post", tag_id))?;
    }

    Ok(())
}

async fn get_post_sqlite<'e, E>(executor: E, slug: &str) -> Result<Option<Post>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(&get_post_sql())
        .bind(slug)
        .fetch_optional(executor)
        .await
        .context("Failed to get post by slug")?;

    row.as_ref().map(row_to_post_sqlite).transpose()
}

async fn get_with_relations_sqlite(
    pool: &SqlitePool,
    slug: &str,
    published_only: bool,
) -> Result<Option<PostWithRelations>> {
    let sql = get_with_category_sql(published_only);
    let mut query = sqlx::query(&sql).bind(slug);
    if published_only {
        query = query.bind(true);
    }
    let row = query
        .fetch_optional(pool)
        .await
        .context("Failed to get post with category")?;

    let Some(row) = row else {
        return Ok(None);
    };
    let (post, category) = row_to_post_with_category_sqlite(&row)?;
    let tags = list_tags_by_post_sqlite(pool, &post.slug).await?;

    Ok(Some(PostWithRelations { post, category, tags }))
}

async fn list_with_relations_sqlite(
    pool: &SqlitePool,
    published_only: bool,
) -> Result<Vec<PostWithRelations>> {
    let sql = list_with_category_sql(published_only);
    let mut query = sqlx::query(&sql);
    if published_only {
        query = query.bind(true);
    }
    let rows = query
        .fetch_all(pool)
        .await
        .context("Failed to list posts")?;

    let posts = rows
        .iter()
        .map(row_to_post_with_category_sqlite)
        .collect::<Result<Vec<_>>>()?;

    try_join_all(posts.into_iter().map(|(post, category)| async move {
        let tags = list_tags_by_post_sqlite(pool, &post.slug).await?;
        Ok::<_, anyhow::Error>(PostWithRelations { post, category, tags })
    }))
    .await
}

async fn list_published_by_category_sqlite(pool: &SqlitePool, category_id: i64) -> Result<Vec<Post>> {
    let rows = sqlx::query(&published_by_category_sql())
        .bind(true)
        .bind(category_id)
        .fetch_all(pool)
        .await
        .context("Failed to list posts by category")?;

    rows.iter().map(row_to_post_sqlite).collect()
}

async fn list_published_by_tag_sqlite(pool: &SqlitePool, tag_id: i64) -> Result<Vec<Post>> {
    let rows = sqlx::query(&published_by_tag_sql())
        .bind(true)
        .bind(tag_id)
        .fetch_all(pool)
        .await
        .context("Failed to list posts by tag")?;

    rows.iter().map(row_to_post_sqlite).collect()
}

async fn adjacent_sqlite(pool: &SqlitePool, slug: &str) -> Result<Option<AdjacentPosts>> {
    let row = sqlx::query("SELECT date FROM blog_posts WHERE slug = ? AND published = ?")
        .bind(slug)
        .bind(true)
        .fetch_optional(pool)
        .await
        .context("Failed to get post date")?;
    let Some(row) = row else {
        return Ok(None);
    };
    let date: NaiveDate = row.try_get("date")?;

    let prev = sqlx::query(
        "SELECT slug, title FROM blog_posts WHERE published = ? AND date < ? ORDER BY date DESC LIMIT 1",
    )
    .bind(true)
    .bind(date)
    .fetch_optional(pool)
    .await
    .context("Failed to get previous post")?;

    let next = sqlx::query(
        "SELECT slug, title FROM blog_posts WHERE published = ? AND date > ? ORDER BY date ASC LIMIT 1",
    )
    .bind(true)
    .bind(date)
    .fetch_optional(pool)
    .await
    .context("Failed to get next post")?;

    Ok(Some(AdjacentPosts {
        prev: prev.as_ref().map(row_to_link_sqlite).transpose()?,
        next: next.as_ref().map(row_to_link_sqlite).transpose()?,
    }))
}

async fn related_sqlite(pool: &SqlitePool, slug: &str, limit: i64) -> Result<Vec<Post>> {
    let source = sqlx::query("SELECT category_id FROM blog_posts WHERE slug = ? AND published = ?")
        .bind(slug)
        .bind(true)
        .fetch_optional(pool)
        .await
        .context("Failed to get source post")?;
    let Some(source) = source else {
        return Ok(Vec::new());
    };
    let category_id: Option<i64> = source.try_get("category_id")?;

    let tag_rows = sqlx::query("SELECT tag_id FROM post_tags WHERE post_slug = ?")
        .bind(slug)
        .fetch_all(pool)
        .await
        .context("Failed to get source post tags")?;
    let tag_ids = tag_rows
        .iter()
        .map(|row| row.try_get::<i64, _>("tag_id"))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let sql = related_sql(category_id.is_some(), tag_ids.len());
    let mut query = sqlx::query(&sql).bind(true).bind(slug);
    if let Some(category_id) = category_id {
        query = query.bind(category_id);
    }
    for tag_id in &tag_ids {
        query = query.bind(*tag_id);
    }
    let rows = query
        .bind(limit)
        .fetch_all(pool)
        .await
        .context("Failed to get related posts")?;

    rows.iter().map(row_to_post_sqlite).collect()
}

async fn update_post_sqlite(
    pool: &SqlitePool,
    slug: &str,
    input: &UpdatePostInput,
) -> Result<Option<Post>> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let Some(existing) = get_post_sqlite(&mut *tx, slug).await? else {
        return Ok(None);
    };
    let updated = apply_update(existing, input);

    sqlx::query(UPDATE_POST_SQL)
        .bind(&updated.title)
        .bind(&updated.subtitle)
        .bind(updated.date)
        .bind(&updated.excerpt)
        .bind(&updated.content)
        .bind(&updated.markdown_content)
        .bind(&updated.featured_image)
        .bind(updated.category_id)
        .bind(updated.published)
        .bind(updated.updated_at)
        .bind(slug)
        .execute(&mut *tx)
        .await
        .context("Failed to update post")?;

    if let Some(tag_ids) = &input.tag_ids {
        replace_tags_sqlite(&mut tx, slug, tag_ids).await?;
    }

    tx.commit().await.context("Failed to commit post update")?;
    Ok(Some(updated))
}

async fn delete_post_sqlite(pool: &SqlitePool, slug: &str) -> Result<()> {
    // post_tags rows go with it (ON DELETE CASCADE)
    sqlx::query("DELETE FROM blog_posts WHERE slug = ?")
        .bind(slug)
        .execute(pool)
        .await
        .context("Failed to delete post")?;

    Ok(())
}

async fn increment_view_count_sqlite(pool: &SqlitePool, slug: &str) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE blog_posts SET view_count = COALESCE(view_count, 0) + 1 WHERE slug = ?",
    )
    .bind(slug)
    .execute(pool)
    .await
    .context("Failed to increment view count")?;

    Ok(result.rows_affected() > 0)
}

async fn count_posts_sqlite(pool: &SqlitePool, published: Option<bool>) -> Result<i64> {
    let row = match published {
        Some(published) => {
            sqlx::query("SELECT COUNT(*) AS count FROM blog_posts WHERE published = ?")
                .bind(published)
                .fetch_one(pool)
                .await
        }
        None => {
            sqlx::query("SELECT COUNT(*) AS count FROM blog_posts")
                .fetch_one(pool)
                .await
        }
    }
    .context("Failed to count posts")?;

    Ok(row.get("count"))
}

fn row_to_post_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Post> {
    Ok(Post {
        slug: row.try_get("slug")?,
        title: row.try_get("title")?,
        subtitle: row.try_get("subtitle")?,
        date: row.try_get("date")?,
        excerpt: row.try_get("excerpt")?,
        content: row.try_get("content")?,
        markdown_content: row.try_get("markdown_content")?,
        featured_image: row.try_get("featured_image")?,
        view_count: row.try_get::<Option<i64>, _>("view_count")?.unwrap_or(0),
        like_count: row.try_get::<Option<i64>, _>("like_count")?.unwrap_or(0),
        category_id: row.try_get("category_id")?,
        published: row.try_get("published")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_post_with_category_sqlite(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<(Post, Option<Category>)> {
    let post = row_to_post_sqlite(row)?;
    let category = match row.try_get::<Option<i64>, _>("category_ref_id")? {
        Some(id) => Some(Category {
            id,
            name: row.try_get("category_name")?,
            slug: row.try_get("category_slug")?,
            description: row.try_get("category_description")?,
            sort_order: row.try_get("category_sort_order")?,
            created_at: row.try_get("category_created_at")?,
            updated_at: row.try_get("category_updated_at")?,
        }),
        None => None,
    };
    Ok((post, category))
}

fn row_to_link_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<PostLink> {
    Ok(PostLink {
        slug: row.try_get("slug")?,
        title: row.try_get("title")?,
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_post_mysql(pool: &MySqlPool, input: &CreatePostInput) -> Result<Post> {
    let post = new_post(input);
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query(INSERT_POST_SQL)
        .bind(&post.slug)
        .bind(&post.title)
        .bind(&post.subtitle)
        .bind(post.date)
        .bind(&post.excerpt)
        .bind(&post.content)
        .bind(&post.markdown_content)
        .bind(&post.featured_image)
        .bind(post.category_id)
        .bind(post.published)
        .bind(post.created_at)
        .bind(post.updated_at)
        .execute(&mut *tx)
        .await
        .context("Failed to create post")?;

    if let Some(tag_ids) = &input.tag_ids {
        replace_tags_mysql(&mut tx, &post.slug, tag_ids).await?;
    }

    tx.commit().await.context("Failed to commit post")?;
    Ok(post)
}

async fn replace_tags_mysql(
    tx: &mut Transaction<'_, MySql>,
    slug: &str,
    tag_ids: &[i64],
) -> Result<()> {
    sqlx::query("DELETE FROM post_tags WHERE post_slug = ?")
        .bind(slug)
        .execute(&mut **tx)
        .await
        .context("Failed to clear post tags")?;

    for tag_id in distinct_ids(tag_ids) {
        sqlx::query("INSERT INTO post_tags (post_slug, tag_id) VALUES (?, ?)")
            .bind(slug)
            .bind(tag_id)
            .execute(&mut **tx)
            .await
            .with_context(|| format!("Failed to attach tag {} to post", tag_id))?;
    }

    Ok(())
}

async fn get_post_mysql<'e, E>(executor: E, slug: &str) -> Result<Option<Post>>
where
    E: sqlx::Executor<'e, Database = MySql>,
{
    let row = sqlx::query(&get_post_sql())
        .bind(slug)
        .fetch_optional(executor)
        .await
        .context("Failed to get post by slug")?;

    row.as_ref().map(row_to_post_mysql).transpose()
}

async fn get_with_relations_mysql(
    pool: &MySqlPool,
    slug: &str,
    published_only: bool,
) -> Result<Option<PostWithRelations>> {
    let sql = get_with_category_sql(published_only);
    let mut query = sqlx::query(&sql).bind(slug);
    if published_only {
        query = query.bind(true);
    }
    let row = query
        .fetch_optional(pool)
        .await
        .context("Failed to get post with category")?;

    let Some(row) = row else {
        return Ok(None);
    };
    let (post, category) = row_to_post_with_category_mysql(&row)?;
    let tags = list_tags_by_post_mysql(pool, &post.slug).await?;

    Ok(Some(PostWithRelations { post, category, tags }))
}

async fn list_with_relations_mysql(
    pool: &MySqlPool,
    published_only: bool,
) -> Result<Vec<PostWithRelations>> {
    let sql = list_with_category_sql(published_only);
    let mut query = sqlx::query(&sql);
    if published_only {
        query = query.bind(true);
    }
    let rows = query
        .fetch_all(pool)
        .await
        .context("Failed to list posts")?;

    let posts = rows
        .iter()
        .map(row_to_post_with_category_mysql)
        .collect::<Result<Vec<_>>>()?;

    try_join_all(posts.into_iter().map(|(post, category)| async move {
        let tags = list_tags_by_post_mysql(pool, &post.slug).await?;
        Ok::<_, anyhow::Error>(PostWithRelations { post, category, tags })
    }))
    .await
}

async fn list_published_by_category_mysql(pool: &MySqlPool, category_id: i64) -> Result<Vec<Post>> {
    let rows = sqlx::query(&published_by_category_sql())
        .bind(true)
        .bind(category_id)
        .fetch_all(pool)
        .await
        .context("Failed to list posts by category")?;

    rows.iter().map(row_to_post_mysql).collect()
}

async fn list_published_by_tag_mysql(pool: &MySqlPool, tag_id: i64) -> Result<Vec<Post>> {
    let rows = sqlx::query(&published_by_tag_sql())
        .bind(true)
        .bind(tag_id)
        .fetch_all(pool)
        .await
        .context("Failed to list posts by tag")?;

    rows.iter().map(row_to_post_mysql).collect()
}

async fn adjacent_mysql(pool: &MySqlPool, slug: &str) -> Result<Option<AdjacentPosts>> {
    let row = sqlx::query("SELECT date FROM blog_posts WHERE slug = ? AND published = ?")
        .bind(slug)
        .bind(true)
        .fetch_optional(pool)
        .await
        .context("Failed to get post date")?;
    let Some(row) = row else {
        return Ok(None);
    };
    let date: NaiveDate = row.try_get("date")?;

    let prev = sqlx::query(
        "SELECT slug, title FROM blog_posts WHERE published = ? AND date < ? ORDER BY date DESC LIMIT 1",
    )
    .bind(true)
    .bind(date)
    .fetch_optional(pool)
    .await
    .context("Failed to get previous post")?;

    let next = sqlx::query(
        "SELECT slug, title FROM blog_posts WHERE published = ? AND date > ? ORDER BY date ASC LIMIT 1",
    )
    .bind(true)
    .bind(date)
    .fetch_optional(pool)
    .await
    .context("Failed to get next post")?;

    Ok(Some(AdjacentPosts {
        prev: prev.as_ref().map(row_to_link_mysql).transpose()?,
        next: next.as_ref().map(row_to_link_mysql).transpose()?,
    }))
}

async fn related_mysql(pool: &MySqlPool, slug: &str, limit: i64) -> Result<Vec<Post>> {
    let source = sqlx::query("SELECT category_id FROM blog_posts WHERE slug = ? AND published = ?")
        .bind(slug)
        .bind(true)
        .fetch_optional(pool)
        .await
        .context("Failed to get source post")?;
    let Some(source) = source else {
        return Ok(Vec::new());
    };
    let category_id: Option<i64> = source.try_get("category_id")?;

    let tag_rows = sqlx::query("SELECT tag_id FROM post_tags WHERE post_slug = ?")
        .bind(slug)
        .fetch_all(pool)
        .await
        .context("Failed to get source post tags")?;
    let tag_ids = tag_rows
        .iter()
        .map(|row| row.try_get::<i64, _>("tag_id"))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let sql = related_sql(category_id.is_some(), tag_ids.len());
    let mut query = sqlx::query(&sql).bind(true).bind(slug);
    if let Some(category_id) = category_id {
        query = query.bind(category_id);
    }
    for tag_id in &tag_ids {
        query = query.bind(*tag_id);
    }
    let rows = query
        .bind(limit)
        .fetch_all(pool)
        .await
        .context("Failed to get related posts")?;

    rows.iter().map(row_to_post_mysql).collect()
}

async fn update_post_mysql(
    pool: &MySqlPool,
    slug: &str,
    input: &UpdatePostInput,
) -> Result<Option<Post>> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let Some(existing) = get_post_mysql(&mut *tx, slug).await? else {
        return Ok(None);
    };
    let updated = apply_update(existing, input);

    sqlx::query(UPDATE_POST_SQL)
        .bind(&updated.title)
        .bind(&updated.subtitle)
        .bind(updated.date)
        .bind(&updated.excerpt)
        .bind(&updated.content)
        .bind(&updated.markdown_content)
        .bind(&updated.featured_image)
        .bind(updated.category_id)
        .bind(updated.published)
        .bind(updated.updated_at)
        .bind(slug)
        .execute(&mut *tx)
        .await
        .context("Failed to update post")?;

    if let Some(tag_ids) = &input.tag_ids {
        replace_tags_mysql(&mut tx, slug, tag_ids).await?;
    }

    tx.commit().await.context("Failed to commit post update")?;
    Ok(Some(updated))
}

async fn delete_post_mysql(pool: &MySqlPool, slug: &str) -> Result<()> {
    sqlx::query("DELETE FROM blog_posts WHERE slug = ?")
        .bind(slug)
        .execute(pool)
        .await
        .context("Failed to delete post")?;

    Ok(())
}

async fn increment_view_count_mysql(pool: &MySqlPool, slug: &str) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE blog_posts SET view_count = COALESCE(view_count, 0) + 1 WHERE slug = ?",
    )
    .bind(slug)
    .execute(pool)
    .await
    .context("Failed to increment view count")?;

    Ok(result.rows_affected() > 0)
}

async fn count_posts_mysql(pool: &MySqlPool, published: Option<bool>) -> Result<i64> {
    let row = match published {
        Some(published) => {
            sqlx::query("SELECT COUNT(*) AS count FROM blog_posts WHERE published = ?")
                .bind(published)
                .fetch_one(pool)
                .await
        }
        None => {
            sqlx::query("SELECT COUNT(*) AS count FROM blog_posts")
                .fetch_one(pool)
                .await
        }
    }
    .context("Failed to count posts")?;

    Ok(row.get("count"))
}

fn row_to_post_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Post> {
    Ok(Post {
        slug: row.try_get("slug")?,
        title: row.try_get("title")?,
        subtitle: row.try_get("subtitle")?,
        date: row.try_get("date")?,
        excerpt: row.try_get("excerpt")?,
        content: row.try_get("content")?,
        markdown_content: row.try_get("markdown_content")?,
        featured_image: row.try_get("featured_image")?,
        view_count: row.try_get::<Option<i64>, _>("view_count")?.unwrap_or(0),
        like_count: row.try_get::<Option<i64>, _>("like_count")?.unwrap_or(0),
        category_id: row.try_get("category_id")?,
        published: row.try_get("published")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_post_with_category_mysql(
    row: &sqlx::mysql::MySqlRow,
) -> Result<(Post, Option<Category>)> {
    let post = row_to_post_mysql(row)?;
    let category = match row.try_get::<Option<i64>, _>("category_ref_id")? {
        Some(id) => Some(Category {
            id,
            name: row.try_get("category_name")?,
            slug: row.try_get("category_slug")?,
            description: row.try_get("category_description")?,
            sort_order: row.try_get("category_sort_order")?,
            created_at: row.try_get("category_created_at")?,
            updated_at: row.try_get("category_updated_at")?,
        }),
        None => None,
    };
    Ok((post, category))
}

fn row_to_link_mysql(row: &sqlx::mysql::MySqlRow) -> Result<PostLink> {
    Ok(PostLink {
        slug: row.try_get("slug")?,
        title: row.try_get("title")?,
    })
}
