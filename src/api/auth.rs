//! Admin authentication endpoints
//!
//! - POST /api/v1/admin/login
//! - POST /api/v1/admin/logout
//! - GET|PUT /api/v1/admin/profile
//! - POST /api/v1/admin/change-password

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::middleware::{ApiError, AuthenticatedAdmin, SESSION_COOKIE};
use super::AppState;
use crate::models::{AdminProfile, UpdateProfileInput};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub success: bool,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    #[serde(default, alias = "currentPassword")]
    pub current_password: String,
    #[serde(default, alias = "newPassword")]
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Routes reachable without a session
pub fn public_router() -> Router<AppState> {
    Router::new().route("/login", post(login))
}

/// Routes behind `require_auth`
pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/logout", post(logout))
        .route("/profile", get(get_profile).put(update_profile))
        .route("/change-password", post(change_password))
}

fn session_cookie(value: &str, max_age_secs: i64, secure: bool) -> Result<HeaderValue, ApiError> {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, value, max_age_secs
    );
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
        .map_err(|e| ApiError::internal_error(format!("Invalid cookie header: {}", e)))
}

/// POST /api/v1/admin/login
async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state.auth.login(&body.username, &body.password).await?;

    let max_age = state.auth.session_ttl().num_seconds();
    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        session_cookie(&session.id, max_age, state.secure_cookie)?,
    );

    Ok((
        headers,
        Json(LoginResponse {
            success: true,
            token: session.id,
            expires_at: session.expires_at,
        }),
    ))
}

/// POST /api/v1/admin/logout
async fn logout(
    State(state): State<AppState>,
    current: AuthenticatedAdmin,
) -> Result<impl IntoResponse, ApiError> {
    state.auth.logout(&current.session_id).await?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        session_cookie("", 0, state.secure_cookie)?,
    );

    Ok((headers, Json(SuccessResponse { success: true })))
}

/// GET /api/v1/admin/profile
async fn get_profile(
    State(state): State<AppState>,
    current: AuthenticatedAdmin,
) -> Result<Json<AdminProfile>, ApiError> {
    Ok(Json(state.auth.profile(current.admin.id).await?))
}

/// PUT /api/v1/admin/profile
async fn update_profile(
    State(state): State<AppState>,
    current: AuthenticatedAdmin,
    Json(body): Json<UpdateProfileInput>,
) -> Result<Json<AdminProfile>, ApiError> {
    Ok(Json(state.auth.update_profile(current.admin.id, body).await?))
}

/// POST /api/v1/admin/change-password
async fn change_password(
    State(state): State<AppState>,
    current: AuthenticatedAdmin,
    Json(body): Json<ChangePasswordRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    state
        .auth
        .change_password(
            current.admin.id,
            &current.session_id,
            &body.current_password,
            &body.new_password,
        )
        .await?;

    Ok(Json(SuccessResponse { success: true }))
}
