//! Public blog endpoints
//!
//! Everything here is published-only and never fails with a store error;
//! the blog service degrades to samples or empty results instead.

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use super::auth::SuccessResponse;
use super::middleware::ApiError;
use super::AppState;
use crate::models::{AdjacentPosts, CategoryWithCount, PostSummary, PostWithRelations};
use crate::services::{CategoryPage, TagPage};

/// Related posts returned when `limit` is not given
const DEFAULT_RELATED_LIMIT: i64 = 3;

#[derive(Debug, Deserialize)]
pub struct RelatedQuery {
    pub limit: Option<i64>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/posts", get(list_posts))
        .route("/posts/{slug}", get(get_post))
        .route("/posts/{slug}/adjacent", get(adjacent_posts))
        .route("/posts/{slug}/related", get(related_posts))
        .route("/posts/{slug}/view", post(record_view))
        .route("/categories", get(list_categories))
        .route("/categories/{slug}", get(category_posts))
        .route("/tags/{slug}", get(tag_posts))
}

/// GET /api/v1/blog/posts
async fn list_posts(State(state): State<AppState>) -> Json<Vec<PostWithRelations>> {
    Json(state.blog.list_published().await)
}

/// GET /api/v1/blog/posts/{slug}
async fn get_post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<PostWithRelations>, ApiError> {
    state
        .blog
        .get_published(&slug)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Post {} not found", slug)))
}

/// GET /api/v1/blog/posts/{slug}/adjacent
async fn adjacent_posts(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Json<AdjacentPosts> {
    Json(state.blog.adjacent(&slug).await)
}

/// GET /api/v1/blog/posts/{slug}/related?limit=N
async fn related_posts(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<RelatedQuery>,
) -> Json<Vec<PostSummary>> {
    let limit = query.limit.unwrap_or(DEFAULT_RELATED_LIMIT);
    Json(state.blog.related(&slug, limit).await)
}

/// POST /api/v1/blog/posts/{slug}/view
///
/// The count is bumped in the background so a slow store never holds up
/// page rendering.
async fn record_view(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Json<SuccessResponse> {
    let blog = state.blog.clone();
    tokio::spawn(async move {
        blog.increment_view_count(&slug).await;
    });
    Json(SuccessResponse { success: true })
}

/// GET /api/v1/blog/categories
async fn list_categories(State(state): State<AppState>) -> Json<Vec<CategoryWithCount>> {
    Json(state.blog.list_categories().await)
}

/// GET /api/v1/blog/categories/{slug}
async fn category_posts(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<CategoryPage>, ApiError> {
    state
        .blog
        .category_posts(&slug)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Category {} not found", slug)))
}

/// GET /api/v1/blog/tags/{slug}
async fn tag_posts(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<TagPage>, ApiError> {
    state
        .blog
        .tag_posts(&slug)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Tag {} not found", slug)))
}
