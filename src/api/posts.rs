//! Post admin endpoints
//!
//! - GET|POST /api/v1/admin/posts
//! - GET|PUT|DELETE /api/v1/admin/posts/{slug}
//!
//! When a write carries `markdown_content` but no `content`, the HTML is
//! rendered here before the post reaches the service.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;

use super::auth::SuccessResponse;
use super::middleware::ApiError;
use super::AppState;
use crate::models::{CreatePostInput, PostWithRelations, UpdatePostInput};
use crate::services::MarkdownRenderer;

/// Request body for creating a post. `content` may be omitted when
/// `markdown_content` is given.
#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    pub date: NaiveDate,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub markdown_content: Option<String>,
    #[serde(default)]
    pub featured_image: Option<String>,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    pub tag_ids: Option<Vec<i64>>,
}

impl CreatePostRequest {
    fn into_input(self, markdown: &MarkdownRenderer) -> CreatePostInput {
        let content = match (self.content, &self.markdown_content) {
            (Some(content), _) => content,
            (None, Some(source)) => markdown.render(source),
            (None, None) => String::new(),
        };

        CreatePostInput {
            slug: self.slug,
            title: self.title,
            subtitle: self.subtitle,
            date: self.date,
            excerpt: self.excerpt,
            content,
            markdown_content: self.markdown_content,
            featured_image: self.featured_image,
            category_id: self.category_id,
            published: self.published,
            tag_ids: self.tag_ids,
        }
    }
}

/// Fill `content` from new markdown when the update doesn't set it
fn render_update(mut input: UpdatePostInput, markdown: &MarkdownRenderer) -> UpdatePostInput {
    if input.content.is_none() {
        if let Some(Some(source)) = &input.markdown_content {
            input.content = Some(markdown.render(source));
        }
    }
    input
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_posts).post(create_post))
        .route("/{slug}", get(get_post).put(update_post).delete(delete_post))
}

async fn list_posts(State(state): State<AppState>) -> Result<Json<Vec<PostWithRelations>>, ApiError> {
    Ok(Json(state.content.list_posts().await?))
}

async fn get_post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<PostWithRelations>, ApiError> {
    state
        .content
        .get_post(&slug)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Post {} not found", slug)))
}

async fn create_post(
    State(state): State<AppState>,
    Json(body): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<PostWithRelations>), ApiError> {
    let input = body.into_input(&state.markdown);
    let post = state.content.create_post(input).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

async fn update_post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(body): Json<UpdatePostInput>,
) -> Result<Json<PostWithRelations>, ApiError> {
    let input = render_update(body, &state.markdown);
    Ok(Json(state.content.update_post(&slug, input).await?))
}

async fn delete_post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<SuccessResponse>, ApiError> {
    state.content.delete_post(&slug).await?;
    Ok(Json(SuccessResponse { success: true }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{login, server};
    use serde_json::{json, Value};

    #[test]
    fn test_explicit_content_wins_over_markdown() {
        let renderer = MarkdownRenderer::new();
        let request: CreatePostRequest = serde_json::from_value(json!({
            "slug": "p", "title": "P", "date": "2024-01-01",
            "content": "<p>kept</p>", "markdown_content": "# ignored"
        }))
        .unwrap();

        let input = request.into_input(&renderer);
        assert_eq!(input.content, "<p>kept</p>");
        assert_eq!(input.markdown_content.as_deref(), Some("# ignored"));
    }

    #[test]
    fn test_update_renders_only_new_markdown() {
        let renderer = MarkdownRenderer::new();

        let input: UpdatePostInput =
            serde_json::from_value(json!({ "markdown_content": "*hi*" })).unwrap();
        let input = render_update(input, &renderer);
        assert_eq!(input.content.as_deref(), Some("<p><em>hi</em></p>\n"));

        let input: UpdatePostInput =
            serde_json::from_value(json!({ "markdown_content": null })).unwrap();
        assert!(render_update(input, &renderer).content.is_none());
    }

    #[tokio::test]
    async fn test_post_crud_with_tags() {
        let server = server().await;
        let token = login(&server).await;

        let tag: Value = server
            .post("/api/v1/admin/tags")
            .authorization_bearer(&token)
            .json(&json!({ "name": "Rust", "slug": "rust" }))
            .await
            .json();

        let response = server
            .post("/api/v1/admin/posts")
            .authorization_bearer(&token)
            .json(&json!({
                "slug": "hello-world",
                "title": "Hello",
                "date": "2024-02-01",
                "markdown_content": "# Hello\n\nFirst post.",
                "tag_ids": [tag["id"], tag["id"]],
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let post: Value = response.json();
        assert_eq!(post["slug"], "hello-world");
        assert!(post["content"].as_str().unwrap().contains("<h1>Hello</h1>"));
        assert_eq!(post["published"], false);
        assert_eq!(post["tags"].as_array().unwrap().len(), 1);

        let response = server
            .put("/api/v1/admin/posts/hello-world")
            .authorization_bearer(&token)
            .json(&json!({ "published": true, "tag_ids": [] }))
            .await;
        response.assert_status_ok();
        let post: Value = response.json();
        assert_eq!(post["published"], true);
        assert_eq!(post["title"], "Hello");
        assert!(post["tags"].as_array().unwrap().is_empty());

        let listed: Value = server
            .get("/api/v1/admin/posts")
            .authorization_bearer(&token)
            .await
            .json();
        assert_eq!(listed.as_array().unwrap().len(), 1);

        server
            .delete("/api/v1/admin/posts/hello-world")
            .authorization_bearer(&token)
            .await
            .assert_status_ok();
        server
            .get("/api/v1/admin/posts/hello-world")
            .authorization_bearer(&token)
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_post_errors() {
        let server = server().await;
        let token = login(&server).await;

        server
            .post("/api/v1/admin/posts")
            .authorization_bearer(&token)
            .json(&json!({ "slug": "p1", "title": "T", "date": "2024-01-01", "tag_ids": [77] }))
            .await
            .assert_status(StatusCode::CONFLICT);

        server
            .post("/api/v1/admin/posts")
            .authorization_bearer(&token)
            .json(&json!({ "slug": "p_1", "title": "T", "date": "2024-01-01" }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        server
            .put("/api/v1/admin/posts/ghost")
            .authorization_bearer(&token)
            .json(&json!({ "title": "Boo" }))
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }
}
