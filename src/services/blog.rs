//! Public read façade
//!
//! Published-only reads for the public blog. Nothing here returns an error to
//! the caller: without a store, or when the store fails, reads degrade to the
//! sample provider (post listing and detail) or to empty results, and the
//! failure is logged.

use crate::db::repositories::{
    CategoryRepository, PostRepository, SqlxCategoryRepository, SqlxPostRepository,
    SqlxTagRepository, TagRepository,
};
use crate::db::Store;
use crate::models::{AdjacentPosts, Category, CategoryWithCount, PostSummary, PostWithRelations, Tag};
use serde::Serialize;
use std::sync::Arc;

use super::samples::{SampleContent, StaticSamples};

/// Upper bound for `related` regardless of the requested limit
pub const MAX_RELATED: i64 = 20;

/// A category with its published posts
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CategoryPage {
    pub category: Category,
    pub posts: Vec<PostSummary>,
}

/// A tag with its published posts
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TagPage {
    pub tag: Tag,
    pub posts: Vec<PostSummary>,
}

/// Public blog service
#[derive(Clone)]
pub struct BlogService {
    store: Store,
    samples: Arc<dyn SampleContent>,
}

impl BlogService {
    /// Service backed by `store`, falling back to the built-in samples
    pub fn new(store: Store) -> Self {
        Self::with_samples(store, Arc::new(StaticSamples))
    }

    pub fn with_samples(store: Store, samples: Arc<dyn SampleContent>) -> Self {
        Self { store, samples }
    }

    fn posts(&self) -> Option<SqlxPostRepository> {
        self.store.pool().map(|pool| SqlxPostRepository::new(pool.clone()))
    }

    /// Published posts, newest first
    pub async fn list_published(&self) -> Vec<PostWithRelations> {
        let Some(repo) = self.posts() else {
            return self.samples.sample_posts();
        };

        match repo.list_published().await {
            Ok(posts) => posts,
            Err(e) => {
                tracing::error!("Failed to list published posts, serving samples: {:#}", e);
                self.samples.sample_posts()
            }
        }
    }

    /// A published post by slug
    pub async fn get_published(&self, slug: &str) -> Option<PostWithRelations> {
        let Some(repo) = self.posts() else {
            return self.sample_by_slug(slug);
        };

        match repo.get_published_by_slug(slug).await {
            Ok(post) => post,
            Err(e) => {
                tracing::error!(slug, "Failed to get published post, serving samples: {:#}", e);
                self.sample_by_slug(slug)
            }
        }
    }

    fn sample_by_slug(&self, slug: &str) -> Option<PostWithRelations> {
        self.samples
            .sample_posts()
            .into_iter()
            .find(|p| p.post.slug == slug)
    }

    /// Previous and next published posts by date
    pub async fn adjacent(&self, slug: &str) -> AdjacentPosts {
        let Some(repo) = self.posts() else {
            return AdjacentPosts::default();
        };

        match repo.adjacent(slug).await {
            Ok(adjacent) => adjacent.unwrap_or_default(),
            Err(e) => {
                tracing::error!(slug, "Failed to get adjacent posts: {:#}", e);
                AdjacentPosts::default()
            }
        }
    }

    /// Up to `limit` related published posts, capped at `MAX_RELATED`
    pub async fn related(&self, slug: &str, limit: i64) -> Vec<PostSummary> {
        let Some(repo) = self.posts() else {
            return Vec::new();
        };
        let limit = limit.clamp(0, MAX_RELATED);
        if limit == 0 {
            return Vec::new();
        }

        match repo.related(slug, limit).await {
            Ok(posts) => posts.into_iter().map(PostSummary::from).collect(),
            Err(e) => {
                tracing::error!(slug, "Failed to get related posts: {:#}", e);
                Vec::new()
            }
        }
    }

    /// Count a view. Failures are logged and swallowed.
    pub async fn increment_view_count(&self, slug: &str) {
        let Some(repo) = self.posts() else {
            return;
        };

        match repo.increment_view_count(slug).await {
            Ok(true) => {}
            Ok(false) => tracing::debug!(slug, "View counted for unknown post"),
            Err(e) => tracing::warn!(slug, "Failed to increment view count: {:#}", e),
        }
    }

    /// Categories with their published post counts
    pub async fn list_categories(&self) -> Vec<CategoryWithCount> {
        let Some(pool) = self.store.pool() else {
            return Vec::new();
        };

        match SqlxCategoryRepository::new(pool.clone())
            .list_with_published_counts()
            .await
        {
            Ok(categories) => categories,
            Err(e) => {
                tracing::error!("Failed to list categories: {:#}", e);
                Vec::new()
            }
        }
    }

    /// A category and its published posts, newest first
    pub async fn category_posts(&self, slug: &str) -> Option<CategoryPage> {
        let pool = self.store.pool()?;
        let categories = SqlxCategoryRepository::new(pool.clone());
        let posts = SqlxPostRepository::new(pool.clone());

        let result = async {
            let Some(category) = categories.get_by_slug(slug).await? else {
                return Ok(None);
            };
            let posts = posts.list_published_by_category(category.id).await?;
            Ok::<_, anyhow::Error>(Some(CategoryPage {
                category,
                posts: posts.into_iter().map(PostSummary::from).collect(),
            }))
        }
        .await;

        result.unwrap_or_else(|e| {
            tracing::error!(slug, "Failed to load category page: {:#}", e);
            None
        })
    }

    /// A tag and its published posts, newest first
    pub async fn tag_posts(&self, slug: &str) -> Option<TagPage> {
        let pool = self.store.pool()?;
        let tags = SqlxTagRepository::new(pool.clone());
        let posts = SqlxPostRepository::new(pool.clone());

        let result = async {
            let Some(tag) = tags.get_by_slug(slug).await? else {
                return Ok(None);
            };
            let posts = posts.list_published_by_tag(tag.id).await?;
            Ok::<_, anyhow::Error>(Some(TagPage {
                tag,
                posts: posts.into_iter().map(PostSummary::from).collect(),
            }))
        }
        .await;

        result.unwrap_or_else(|e| {
            tracing::error!(slug, "Failed to load tag page: {:#}", e);
            None
        })
    }
}

impl std::fmt::Debug for BlogService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlogService")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations, DynDatabasePool};
    use crate::models::{CreateCategoryInput, CreatePostInput, CreateTagInput, Post};
    use crate::services::content::ContentService;
    use chrono::{NaiveDate, Utc};

    async fn services() -> (BlogService, ContentService, DynDatabasePool) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let store = Store::new(pool.clone());
        (BlogService::new(store.clone()), ContentService::new(store), pool)
    }

    fn jan(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    struct OneSample;

    impl SampleContent for OneSample {
        fn sample_posts(&self) -> Vec<PostWithRelations> {
            let now = Utc::now();
            vec![PostWithRelations {
                post: Post {
                    slug: "only".to_string(),
                    title: "Only".to_string(),
                    subtitle: None,
                    date: jan(9),
                    excerpt: String::new(),
                    content: String::new(),
                    markdown_content: None,
                    featured_image: None,
                    view_count: 0,
                    like_count: 0,
                    category_id: None,
                    published: true,
                    created_at: now,
                    updated_at: now,
                },
                category: None,
                tags: vec![],
            }]
        }
    }

    #[tokio::test]
    async fn test_published_reads_hide_drafts() {
        let (blog, content, _) = services().await;
        content
            .create_post(CreatePostInput::new("live", "Live", jan(1), "").published())
            .await
            .unwrap();
        content
            .create_post(CreatePostInput::new("draft", "Draft", jan(2), ""))
            .await
            .unwrap();

        let listed = blog.list_published().await;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].post.slug, "live");
        assert!(blog.get_published("draft").await.is_none());
        assert!(blog.get_published("live").await.is_some());
        assert!(blog.get_published("missing").await.is_none());
    }

    #[tokio::test]
    async fn test_empty_store_does_not_fall_back() {
        let (blog, _, _) = services().await;
        assert!(blog.list_published().await.is_empty());
    }

    #[tokio::test]
    async fn test_without_store_serves_samples() {
        let blog = BlogService::new(Store::unavailable());

        assert_eq!(blog.list_published().await.len(), 3);
        let welcome = blog.get_published("welcome-to-my-blog").await.expect("sample post");
        assert_eq!(welcome.post.view_count, 128);
        assert!(blog.get_published("nope").await.is_none());

        assert_eq!(blog.adjacent("welcome-to-my-blog").await, AdjacentPosts::default());
        assert!(blog.related("welcome-to-my-blog", 3).await.is_empty());
        assert!(blog.list_categories().await.is_empty());
        assert!(blog.category_posts("tech").await.is_none());
        assert!(blog.tag_posts("go").await.is_none());
        blog.increment_view_count("welcome-to-my-blog").await;
    }

    #[tokio::test]
    async fn test_custom_sample_provider() {
        let blog = BlogService::with_samples(Store::unavailable(), Arc::new(OneSample));
        let posts = blog.list_published().await;
        assert_eq!(posts.len(), 1);
        assert!(blog.get_published("only").await.is_some());
    }

    #[tokio::test]
    async fn test_store_error_falls_back_to_samples() {
        let (blog, _, pool) = services().await;
        pool.execute("DROP TABLE post_tags").await.unwrap();
        pool.execute("DROP TABLE blog_posts").await.unwrap();

        assert_eq!(blog.list_published().await.len(), 3);
        assert!(blog.get_published("typescript-tips").await.is_some());
        assert_eq!(blog.adjacent("x").await, AdjacentPosts::default());
        assert!(blog.related("x", 3).await.is_empty());
        blog.increment_view_count("x").await;
    }

    #[tokio::test]
    async fn test_adjacent_and_related_through_facade() {
        let (blog, content, _) = services().await;
        for (slug, day) in [("a", 1), ("b", 2), ("c", 3), ("d", 4)] {
            content
                .create_post(CreatePostInput::new(slug, slug, jan(day), "").published())
                .await
                .unwrap();
        }

        let adjacent = blog.adjacent("b").await;
        assert_eq!(adjacent.prev.map(|p| p.slug).as_deref(), Some("a"));
        assert_eq!(adjacent.next.map(|p| p.slug).as_deref(), Some("c"));
        assert_eq!(blog.adjacent("zzz").await, AdjacentPosts::default());

        let related = blog.related("a", 2).await;
        assert_eq!(related.len(), 2);
        assert!(related.iter().all(|p| p.slug != "a"));
        assert!(blog.related("a", 0).await.is_empty());
        assert_eq!(blog.related("a", 1000).await.len(), 3);
    }

    #[tokio::test]
    async fn test_view_count() {
        let (blog, content, _) = services().await;
        content
            .create_post(CreatePostInput::new("p", "P", jan(1), "").published())
            .await
            .unwrap();

        for _ in 0..4 {
            blog.increment_view_count("p").await;
        }
        blog.increment_view_count("missing").await;

        let post = blog.get_published("p").await.unwrap();
        assert_eq!(post.post.view_count, 4);
    }

    #[tokio::test]
    async fn test_category_and_tag_pages() {
        let (blog, content, _) = services().await;
        let tech = content
            .create_category(CreateCategoryInput::new("Tech", "tech"))
            .await
            .unwrap();
        content
            .create_category(CreateCategoryInput::new("Life", "life").with_sort_order(1))
            .await
            .unwrap();
        let go = content.create_tag(CreateTagInput::new("Go", "go")).await.unwrap();

        content
            .create_post(
                CreatePostInput::new("a", "A", jan(1), "")
                    .with_category(tech.id)
                    .with_tags(vec![go.id])
                    .published(),
            )
            .await
            .unwrap();
        content
            .create_post(
                CreatePostInput::new("b", "B", jan(2), "")
                    .with_category(tech.id)
                    .with_tags(vec![go.id]),
            )
            .await
            .unwrap();

        let categories = blog.list_categories().await;
        let counts: Vec<(String, i64)> = categories
            .into_iter()
            .map(|c| (c.category.slug, c.post_count))
            .collect();
        assert_eq!(counts, vec![("tech".to_string(), 1), ("life".to_string(), 0)]);

        let page = blog.category_posts("tech").await.expect("tech page");
        assert_eq!(page.posts.len(), 1);
        assert_eq!(page.posts[0].slug, "a");
        assert!(blog.category_posts("missing").await.is_none());

        let page = blog.tag_posts("go").await.expect("go page");
        assert_eq!(page.tag.name, "Go");
        assert_eq!(page.posts.len(), 1);
        assert!(blog.tag_posts("missing").await.is_none());
    }
}
