//! Post model
//!
//! This module provides:
//! - `Post` entity, keyed by its slug
//! - `PostWithRelations` with the embedded category and tag list
//! - Summary and adjacency shapes for the public read paths
//! - Input types for creating and partially updating posts

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::patch::double_option;
use super::{Category, Tag};

/// Post entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Post {
    /// URL-friendly slug, also the primary key
    pub slug: String,
    pub title: String,
    pub subtitle: Option<String>,
    /// Publication date shown to readers
    pub date: NaiveDate,
    pub excerpt: String,
    /// Rendered HTML
    pub content: String,
    /// Markdown source the HTML was rendered from
    pub markdown_content: Option<String>,
    pub featured_image: Option<String>,
    #[serde(default)]
    pub view_count: i64,
    #[serde(default)]
    pub like_count: i64,
    pub category_id: Option<i64>,
    /// Unpublished posts never appear on public read paths
    pub published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A post with its category and tags resolved
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PostWithRelations {
    #[serde(flatten)]
    pub post: Post,
    pub category: Option<Category>,
    pub tags: Vec<Tag>,
}

/// Listing shape without the post body
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PostSummary {
    pub slug: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub date: NaiveDate,
    pub excerpt: String,
    pub featured_image: Option<String>,
    pub view_count: i64,
    pub like_count: i64,
    pub category_id: Option<i64>,
}

impl From<Post> for PostSummary {
    fn from(post: Post) -> Self {
        Self {
            slug: post.slug,
            title: post.title,
            subtitle: post.subtitle,
            date: post.date,
            excerpt: post.excerpt,
            featured_image: post.featured_image,
            view_count: post.view_count,
            like_count: post.like_count,
            category_id: post.category_id,
        }
    }
}

/// Slug and title of a neighbouring post
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PostLink {
    pub slug: String,
    pub title: String,
}

/// Chronological neighbours of a published post
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdjacentPosts {
    /// Nearest published post with an earlier date
    pub prev: Option<PostLink>,
    /// Nearest published post with a later date
    pub next: Option<PostLink>,
}

/// Input for creating a new post
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePostInput {
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    pub date: NaiveDate,
    #[serde(default)]
    pub excerpt: String,
    pub content: String,
    #[serde(default)]
    pub markdown_content: Option<String>,
    #[serde(default)]
    pub featured_image: Option<String>,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub published: bool,
    /// Tag ids to associate; `None` creates the post untagged
    #[serde(default)]
    pub tag_ids: Option<Vec<i64>>,
}

impl CreatePostInput {
    /// Minimal draft with the required fields
    pub fn new(
        slug: impl Into<String>,
        title: impl Into<String>,
        date: NaiveDate,
        content: impl Into<String>,
    ) -> Self {
        Self {
            slug: slug.into(),
            title: title.into(),
            subtitle: None,
            date,
            excerpt: String::new(),
            content: content.into(),
            markdown_content: None,
            featured_image: None,
            category_id: None,
            published: false,
            tag_ids: None,
        }
    }

    pub fn with_category(mut self, category_id: i64) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn with_tags(mut self, tag_ids: Vec<i64>) -> Self {
        self.tag_ids = Some(tag_ids);
        self
    }

    pub fn published(mut self) -> Self {
        self.published = true;
        self
    }
}

/// Partial update for a post. The slug is the key and cannot change.
///
/// Nullable columns use `Option<Option<T>>`: `None` leaves the column alone,
/// `Some(None)` writes NULL. `tag_ids` replaces the full association set when
/// present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePostInput {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub subtitle: Option<Option<String>>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub markdown_content: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub featured_image: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub category_id: Option<Option<i64>>,
    #[serde(default)]
    pub published: Option<bool>,
    #[serde(default)]
    pub tag_ids: Option<Vec<i64>>,
}

impl UpdatePostInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_subtitle(mut self, subtitle: Option<String>) -> Self {
        self.subtitle = Some(subtitle);
        self
    }

    pub fn with_category(mut self, category_id: Option<i64>) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn with_published(mut self, published: bool) -> Self {
        self.published = Some(published);
        self
    }

    pub fn with_tags(mut self, tag_ids: Vec<i64>) -> Self {
        self.tag_ids = Some(tag_ids);
        self
    }
}

/// Counts shown on the admin dashboard
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DashboardStats {
    pub total_posts: i64,
    pub published_posts: i64,
    pub draft_posts: i64,
    pub total_categories: i64,
    pub total_tags: i64,
}
