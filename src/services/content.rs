//! Content service
//!
//! Admin-facing CRUD for categories, tags and posts, plus dashboard counts.
//!
//! Every entry point asks the `Store` for a pool. Without one, reads return
//! empty results and writes fail with `StoreUnavailable`. Store errors that
//! are unique or foreign-key violations become `ConstraintViolation`;
//! anything else is passed through as `InternalError`.

use crate::db::repositories::{
    CategoryRepository, PostRepository, SqlxCategoryRepository, SqlxPostRepository,
    SqlxTagRepository, TagRepository,
};
use crate::db::Store;
use crate::models::patch::non_empty;
use crate::models::{
    Category, CreateCategoryInput, CreatePostInput, CreateTagInput, DashboardStats,
    PostWithRelations, Tag, UpdateCategoryInput, UpdatePostInput, UpdateTagInput,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

/// Lowercase ASCII alphanumerics separated by single hyphens
static SLUG_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("slug pattern is a valid regex")
});

/// Error types for content operations
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    /// No backing store is configured
    #[error("Content store is not available")]
    StoreUnavailable,

    /// Input rejected before reaching the store
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Unique or foreign-key violation reported by the store
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Update target doesn't exist
    #[error("{0} not found")]
    NotFound(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl ContentError {
    /// Classify an error coming back from a repository.
    pub fn from_store(err: anyhow::Error) -> Self {
        let violation = err
            .downcast_ref::<sqlx::Error>()
            .and_then(|e| e.as_database_error())
            .filter(|db| db.is_unique_violation() || db.is_foreign_key_violation())
            .map(|db| db.message().to_string());

        match violation {
            Some(message) => ContentError::ConstraintViolation(message),
            None => ContentError::InternalError(err),
        }
    }
}

/// Check a slug against the URL-safe slug format.
pub fn is_valid_slug(slug: &str) -> bool {
    SLUG_PATTERN.is_match(slug)
}

fn validate_slug(kind: &str, slug: &str) -> Result<(), ContentError> {
    if is_valid_slug(slug) {
        Ok(())
    } else {
        Err(ContentError::ValidationError(format!(
            "{} slug must be lowercase letters, digits and single hyphens: {:?}",
            kind, slug
        )))
    }
}

fn validate_required(kind: &str, field: &str, value: &str) -> Result<(), ContentError> {
    if value.trim().is_empty() {
        return Err(ContentError::ValidationError(format!(
            "{} {} cannot be empty",
            kind, field
        )));
    }
    Ok(())
}

/// Content service for the admin console
#[derive(Debug, Clone)]
pub struct ContentService {
    store: Store,
}

impl ContentService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    fn categories(&self) -> Option<Arc<dyn CategoryRepository>> {
        self.store
            .pool()
            .map(|pool| SqlxCategoryRepository::boxed(pool.clone()))
    }

    fn tags(&self) -> Option<Arc<dyn TagRepository>> {
        self.store.pool().map(|pool| SqlxTagRepository::boxed(pool.clone()))
    }

    fn posts(&self) -> Option<Arc<dyn PostRepository>> {
        self.store.pool().map(|pool| SqlxPostRepository::boxed(pool.clone()))
    }

    // ------------------------------------------------------------------
    // Categories
    // ------------------------------------------------------------------

    /// All categories, ordered by `sort_order` then name
    pub async fn list_categories(&self) -> Result<Vec<Category>, ContentError> {
        let Some(repo) = self.categories() else {
            return Ok(Vec::new());
        };
        repo.list().await.map_err(ContentError::from_store)
    }

    pub async fn get_category(&self, id: i64) -> Result<Option<Category>, ContentError> {
        let Some(repo) = self.categories() else {
            return Ok(None);
        };
        repo.get_by_id(id).await.map_err(ContentError::from_store)
    }

    pub async fn get_category_by_slug(&self, slug: &str) -> Result<Option<Category>, ContentError> {
        let Some(repo) = self.categories() else {
            return Ok(None);
        };
        repo.get_by_slug(slug).await.map_err(ContentError::from_store)
    }

    pub async fn create_category(&self, input: CreateCategoryInput) -> Result<Category, ContentError> {
        let repo = self.categories().ok_or(ContentError::StoreUnavailable)?;

        validate_required("Category", "name", &input.name)?;
        validate_slug("Category", &input.slug)?;

        let input = CreateCategoryInput {
            description: non_empty(input.description),
            ..input
        };
        let category = repo.create(&input).await.map_err(ContentError::from_store)?;

        tracing::info!(id = category.id, slug = %category.slug, "Category created");
        Ok(category)
    }

    pub async fn update_category(
        &self,
        id: i64,
        input: UpdateCategoryInput,
    ) -> Result<Category, ContentError> {
        let repo = self.categories().ok_or(ContentError::StoreUnavailable)?;

        if let Some(name) = &input.name {
            validate_required("Category", "name", name)?;
        }
        if let Some(slug) = &input.slug {
            validate_slug("Category", slug)?;
        }

        repo.update(id, &input)
            .await
            .map_err(ContentError::from_store)?
            .ok_or_else(|| ContentError::NotFound(format!("Category {}", id)))
    }

    /// Delete a category. Posts in it keep existing with no category.
    pub async fn delete_category(&self, id: i64) -> Result<(), ContentError> {
        let repo = self.categories().ok_or(ContentError::StoreUnavailable)?;
        repo.delete(id).await.map_err(ContentError::from_store)
    }

    // ------------------------------------------------------------------
    // Tags
    // ------------------------------------------------------------------

    pub async fn list_tags(&self) -> Result<Vec<Tag>, ContentError> {
        let Some(repo) = self.tags() else {
            return Ok(Vec::new());
        };
        repo.list().await.map_err(ContentError::from_store)
    }

    pub async fn get_tag(&self, id: i64) -> Result<Option<Tag>, ContentError> {
        let Some(repo) = self.tags() else {
            return Ok(None);
        };
        repo.get_by_id(id).await.map_err(ContentError::from_store)
    }

    pub async fn get_tag_by_slug(&self, slug: &str) -> Result<Option<Tag>, ContentError> {
        let Some(repo) = self.tags() else {
            return Ok(None);
        };
        repo.get_by_slug(slug).await.map_err(ContentError::from_store)
    }

    pub async fn create_tag(&self, input: CreateTagInput) -> Result<Tag, ContentError> {
        let repo = self.tags().ok_or(ContentError::StoreUnavailable)?;

        validate_required("Tag", "name", &input.name)?;
        validate_slug("Tag", &input.slug)?;

        let input = CreateTagInput {
            description: non_empty(input.description),
            ..input
        };
        let tag = repo.create(&input).await.map_err(ContentError::from_store)?;

        tracing::info!(id = tag.id, slug = %tag.slug, "Tag created");
        Ok(tag)
    }

    pub async fn update_tag(&self, id: i64, input: UpdateTagInput) -> Result<Tag, ContentError> {
        let repo = self.tags().ok_or(ContentError::StoreUnavailable)?;

        if let Some(name) = &input.name {
            validate_required("Tag", "name", name)?;
        }
        if let Some(slug) = &input.slug {
            validate_slug("Tag", slug)?;
        }

        repo.update(id, &input)
            .await
            .map_err(ContentError::from_store)?
            .ok_or_else(|| ContentError::NotFound(format!("Tag {}", id)))
    }

    pub async fn delete_tag(&self, id: i64) -> Result<(), ContentError> {
        let repo = self.tags().ok_or(ContentError::StoreUnavailable)?;
        repo.delete(id).await.map_err(ContentError::from_store)
    }

    // ------------------------------------------------------------------
    // Posts
    // ------------------------------------------------------------------

    /// All posts including drafts, newest first by creation time
    pub async fn list_posts(&self) -> Result<Vec<PostWithRelations>, ContentError> {
        let Some(repo) = self.posts() else {
            return Ok(Vec::new());
        };
        repo.list().await.map_err(ContentError::from_store)
    }

    pub async fn get_post(&self, slug: &str) -> Result<Option<PostWithRelations>, ContentError> {
        let Some(repo) = self.posts() else {
            return Ok(None);
        };
        repo.get_by_slug(slug).await.map_err(ContentError::from_store)
    }

    pub async fn create_post(&self, input: CreatePostInput) -> Result<PostWithRelations, ContentError> {
        let repo = self.posts().ok_or(ContentError::StoreUnavailable)?;

        validate_required("Post", "title", &input.title)?;
        validate_slug("Post", &input.slug)?;

        let input = CreatePostInput {
            subtitle: non_empty(input.subtitle),
            markdown_content: non_empty(input.markdown_content),
            featured_image: non_empty(input.featured_image),
            ..input
        };
        let post = repo.create(&input).await.map_err(ContentError::from_store)?;
        tracing::info!(slug = %post.slug, published = post.published, "Post created");

        self.reload_post(repo.as_ref(), &post.slug).await
    }

    /// Apply a partial update. The slug itself cannot change.
    pub async fn update_post(
        &self,
        slug: &str,
        input: UpdatePostInput,
    ) -> Result<PostWithRelations, ContentError> {
        let repo = self.posts().ok_or(ContentError::StoreUnavailable)?;

        if let Some(title) = &input.title {
            validate_required("Post", "title", title)?;
        }

        repo.update(slug, &input)
            .await
            .map_err(ContentError::from_store)?
            .ok_or_else(|| ContentError::NotFound(format!("Post {}", slug)))?;

        self.reload_post(repo.as_ref(), slug).await
    }

    pub async fn delete_post(&self, slug: &str) -> Result<(), ContentError> {
        let repo = self.posts().ok_or(ContentError::StoreUnavailable)?;
        repo.delete(slug).await.map_err(ContentError::from_store)
    }

    async fn reload_post(
        &self,
        repo: &dyn PostRepository,
        slug: &str,
    ) -> Result<PostWithRelations, ContentError> {
        repo.get_by_slug(slug)
            .await
            .map_err(ContentError::from_store)?
            .ok_or_else(|| {
                ContentError::InternalError(anyhow::anyhow!("Post {} vanished after write", slug))
            })
    }

    // ------------------------------------------------------------------
    // Dashboard
    // ------------------------------------------------------------------

    /// Post, category and tag counts. All zero without a store.
    pub async fn dashboard_stats(&self) -> Result<DashboardStats, ContentError> {
        let (Some(posts), Some(categories), Some(tags)) =
            (self.posts(), self.categories(), self.tags())
        else {
            return Ok(DashboardStats::default());
        };

        let total_posts = posts.count().await.map_err(ContentError::from_store)?;
        let published_posts = posts.count_published().await.map_err(ContentError::from_store)?;
        let total_categories = categories.count().await.map_err(ContentError::from_store)?;
        let total_tags = tags.count().await.map_err(ContentError::from_store)?;

        Ok(DashboardStats {
            total_posts,
            published_posts,
            draft_posts: total_posts - published_posts,
            total_categories,
            total_tags,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use chrono::NaiveDate;
    use proptest::prelude::*;

    async fn service() -> ContentService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        ContentService::new(Store::new(pool))
    }

    fn jan(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[tokio::test]
    async fn test_tech_go_rust_scenario() {
        let svc = service().await;
        let tech = svc
            .create_category(CreateCategoryInput::new("Tech", "tech").with_sort_order(0))
            .await
            .unwrap();
        let go = svc.create_tag(CreateTagInput::new("Go", "go")).await.unwrap();
        let rust = svc.create_tag(CreateTagInput::new("Rust", "rust")).await.unwrap();

        let mut input = CreatePostInput::new("p1", "T", jan(1), "<p>c</p>")
            .with_category(tech.id)
            .with_tags(vec![go.id, rust.id])
            .published();
        input.excerpt = "e".to_string();
        svc.create_post(input).await.unwrap();

        let post = svc.get_post("p1").await.unwrap().expect("p1 exists");
        assert_eq!(post.category.map(|c| c.slug), Some("tech".to_string()));
        let mut slugs: Vec<String> = post.tags.into_iter().map(|t| t.slug).collect();
        slugs.sort();
        assert_eq!(slugs, vec!["go", "rust"]);
        assert_eq!(post.post.excerpt, "e");
    }

    #[tokio::test]
    async fn test_create_normalizes_empty_optionals() {
        let svc = service().await;

        let category = svc
            .create_category(CreateCategoryInput::new("Tech", "tech").with_description(""))
            .await
            .unwrap();
        assert!(category.description.is_none());

        let mut input = CreatePostInput::new("p1", "T", jan(1), "");
        input.subtitle = Some(String::new());
        input.featured_image = Some("  ".to_string());
        input.markdown_content = Some("# md".to_string());
        let post = svc.create_post(input).await.unwrap();
        assert!(post.post.subtitle.is_none());
        assert!(post.post.featured_image.is_none());
        assert_eq!(post.post.markdown_content.as_deref(), Some("# md"));
    }

    #[tokio::test]
    async fn test_update_writes_explicit_empty_string() {
        let svc = service().await;
        let mut input = CreatePostInput::new("p1", "T", jan(1), "");
        input.subtitle = Some("keep".to_string());
        input.excerpt = "old".to_string();
        svc.create_post(input).await.unwrap();

        let update: UpdatePostInput = serde_json::from_str(r#"{"excerpt": ""}"#).unwrap();
        let post = svc.update_post("p1", update).await.unwrap();
        assert_eq!(post.post.excerpt, "");
        assert_eq!(post.post.subtitle.as_deref(), Some("keep"));
        assert_eq!(post.post.title, "T");
    }

    #[tokio::test]
    async fn test_validation_errors() {
        let svc = service().await;

        let err = svc
            .create_category(CreateCategoryInput::new("  ", "tech"))
            .await
            .unwrap_err();
        assert!(matches!(err, ContentError::ValidationError(_)));

        let err = svc
            .create_tag(CreateTagInput::new("Go", "Go Lang"))
            .await
            .unwrap_err();
        assert!(matches!(err, ContentError::ValidationError(_)));

        let err = svc
            .create_post(CreatePostInput::new("p1", "", jan(1), ""))
            .await
            .unwrap_err();
        assert!(matches!(err, ContentError::ValidationError(_)));

        let update = UpdateCategoryInput {
            slug: Some("bad--slug".to_string()),
            ..Default::default()
        };
        let err = svc.update_category(1, update).await.unwrap_err();
        assert!(matches!(err, ContentError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_constraint_violations() {
        let svc = service().await;
        svc.create_tag(CreateTagInput::new("Go", "go")).await.unwrap();

        let err = svc
            .create_tag(CreateTagInput::new("Golang", "go"))
            .await
            .unwrap_err();
        assert!(matches!(err, ContentError::ConstraintViolation(_)));

        let err = svc
            .create_post(CreatePostInput::new("p1", "T", jan(1), "").with_tags(vec![404]))
            .await
            .unwrap_err();
        assert!(matches!(err, ContentError::ConstraintViolation(_)));

        let err = svc
            .create_post(CreatePostInput::new("p2", "T", jan(1), "").with_category(404))
            .await
            .unwrap_err();
        assert!(matches!(err, ContentError::ConstraintViolation(_)));
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let svc = service().await;

        let err = svc
            .update_tag(7, UpdateTagInput::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ContentError::NotFound(_)));

        let err = svc
            .update_post("ghost", UpdatePostInput::new().with_title("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, ContentError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_deletes_are_unconditional() {
        let svc = service().await;
        svc.delete_category(99).await.unwrap();
        svc.delete_tag(99).await.unwrap();
        svc.delete_post("nope").await.unwrap();
    }

    #[tokio::test]
    async fn test_dashboard_stats() {
        let svc = service().await;
        svc.create_category(CreateCategoryInput::new("Tech", "tech")).await.unwrap();
        svc.create_tag(CreateTagInput::new("Go", "go")).await.unwrap();
        svc.create_tag(CreateTagInput::new("Rust", "rust")).await.unwrap();
        svc.create_post(CreatePostInput::new("a", "A", jan(1), "").published())
            .await
            .unwrap();
        svc.create_post(CreatePostInput::new("b", "B", jan(2), "")).await.unwrap();
        svc.create_post(CreatePostInput::new("c", "C", jan(3), "")).await.unwrap();

        let stats = svc.dashboard_stats().await.unwrap();
        assert_eq!(
            stats,
            DashboardStats {
                total_posts: 3,
                published_posts: 1,
                draft_posts: 2,
                total_categories: 1,
                total_tags: 2,
            }
        );
    }

    #[tokio::test]
    async fn test_without_store() {
        let svc = ContentService::new(Store::unavailable());

        assert!(svc.list_categories().await.unwrap().is_empty());
        assert!(svc.list_tags().await.unwrap().is_empty());
        assert!(svc.list_posts().await.unwrap().is_empty());
        assert!(svc.get_post("p1").await.unwrap().is_none());
        assert!(svc.get_category(1).await.unwrap().is_none());
        assert_eq!(svc.dashboard_stats().await.unwrap(), DashboardStats::default());

        let err = svc
            .create_category(CreateCategoryInput::new("Tech", "tech"))
            .await
            .unwrap_err();
        assert!(matches!(err, ContentError::StoreUnavailable));
        let err = svc.delete_post("p1").await.unwrap_err();
        assert!(matches!(err, ContentError::StoreUnavailable));
    }

    #[test]
    fn test_slug_examples() {
        for ok in ["a", "tech", "nextjs-mui-setup", "2024-recap", "x1-y2"] {
            assert!(is_valid_slug(ok), "{} should be valid", ok);
        }
        for bad in ["", "-a", "a-", "a--b", "Tech", "a b", "a_b", "café"] {
            assert!(!is_valid_slug(bad), "{:?} should be invalid", bad);
        }
    }

    proptest! {
        #[test]
        fn prop_joined_segments_are_valid_slugs(
            segments in prop::collection::vec("[a-z0-9]{1,8}", 1..5)
        ) {
            prop_assert!(is_valid_slug(&segments.join("-")));
        }

        #[test]
        fn prop_uppercase_or_space_is_rejected(
            prefix in "[a-z0-9]{0,6}",
            bad in "[A-Z _]",
            suffix in "[a-z0-9]{0,6}",
        ) {
            let slug = format!("{}{}{}", prefix, bad, suffix);
            prop_assert!(!is_valid_slug(&slug));
        }
    }
}
