//! Admin authentication
//!
//! Login issues an opaque random session id stored in `admin_sessions` with an
//! expiry. Each request resolves the id back to an admin; expired sessions are
//! deleted on sight and purged periodically.

use crate::db::repositories::{
    AdminRepository, ProfileFields, SessionRepository, SqlxAdminRepository, SqlxSessionRepository,
};
use crate::db::Store;
use crate::models::patch::non_empty;
use crate::models::{Admin, AdminProfile, AdminSession, UpdateProfileInput};
use anyhow::Context;
use chrono::{Duration, Utc};
use once_cell::sync::Lazy;
use std::sync::Arc;
use uuid::Uuid;

use super::password::{hash_password, verify_password};

/// Minimum length of a new password, in characters
pub const MIN_PASSWORD_LEN: usize = 6;

/// Session lifetimes are capped at roughly a century
const MAX_SESSION_TTL_HOURS: u64 = 24 * 365 * 100;

/// Hash checked when the username is unknown, so a miss costs the same
/// Argon2 work as a wrong password.
static UNKNOWN_ADMIN_HASH: Lazy<Option<String>> =
    Lazy::new(|| hash_password("owlblog-unknown-admin").ok());

/// Error types for authentication operations
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No backing store is configured
    #[error("Authentication store is not available")]
    StoreUnavailable,

    /// Wrong username or password
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// Current password didn't verify during a password change
    #[error("Current password is incorrect")]
    WrongPassword,

    /// Validation error (invalid input)
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Admin referenced by a session no longer exists
    #[error("Admin not found")]
    NotFound,

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

struct Repos {
    admins: Arc<dyn AdminRepository>,
    sessions: Arc<dyn SessionRepository>,
}

/// Authentication service for the admin console
#[derive(Debug, Clone)]
pub struct AuthService {
    store: Store,
    session_ttl: Duration,
}

impl AuthService {
    pub fn new(store: Store, session_ttl_hours: u64) -> Self {
        let hours = session_ttl_hours.min(MAX_SESSION_TTL_HOURS) as i64;
        Self {
            store,
            session_ttl: Duration::hours(hours),
        }
    }

    /// Lifetime of a new session
    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    fn repos(&self) -> Option<Repos> {
        self.store.pool().map(|pool| Repos {
            admins: SqlxAdminRepository::boxed(pool.clone()),
            sessions: SqlxSessionRepository::boxed(pool.clone()),
        })
    }

    /// Verify credentials and open a session
    pub async fn login(&self, username: &str, password: &str) -> Result<AdminSession, AuthError> {
        let repos = self.repos().ok_or(AuthError::StoreUnavailable)?;

        if username.trim().is_empty() || password.is_empty() {
            return Err(AuthError::ValidationError(
                "Username and password are required".to_string(),
            ));
        }

        let Some(admin) = repos
            .admins
            .get_by_username(username)
            .await
            .context("Failed to look up admin")?
        else {
            if let Some(hash) = UNKNOWN_ADMIN_HASH.as_deref() {
                let _ = verify_password(password, hash);
            }
            tracing::warn!(username, "Failed admin login");
            return Err(AuthError::InvalidCredentials);
        };

        let valid = verify_password(password, &admin.password_hash)
            .context("Failed to verify password")?;
        if !valid {
            tracing::warn!(username, "Failed admin login");
            return Err(AuthError::InvalidCredentials);
        }

        let now = Utc::now();
        let session = AdminSession {
            id: Uuid::new_v4().to_string(),
            admin_id: admin.id,
            expires_at: now + self.session_ttl,
            created_at: now,
        };
        let session = repos
            .sessions
            .create(&session)
            .await
            .context("Failed to create session")?;

        tracing::info!(admin_id = admin.id, "Admin logged in");
        Ok(session)
    }

    /// Resolve a session id to its admin. Expired sessions are deleted.
    pub async fn validate_session(&self, token: &str) -> Result<Option<Admin>, AuthError> {
        let Some(repos) = self.repos() else {
            return Ok(None);
        };

        let Some(session) = repos
            .sessions
            .get_by_id(token)
            .await
            .context("Failed to get session")?
        else {
            return Ok(None);
        };

        if session.is_expired() {
            if let Err(e) = repos.sessions.delete(token).await {
                tracing::warn!("Failed to delete expired session: {:#}", e);
            }
            return Ok(None);
        }

        let admin = repos
            .admins
            .get_by_id(session.admin_id)
            .await
            .context("Failed to get admin")?;

        Ok(admin)
    }

    /// End a session. Unknown ids are ignored.
    pub async fn logout(&self, token: &str) -> Result<(), AuthError> {
        let repos = self.repos().ok_or(AuthError::StoreUnavailable)?;
        repos
            .sessions
            .delete(token)
            .await
            .context("Failed to delete session")?;
        Ok(())
    }

    pub async fn profile(&self, admin_id: i64) -> Result<AdminProfile, AuthError> {
        let repos = self.repos().ok_or(AuthError::StoreUnavailable)?;
        let admin = repos
            .admins
            .get_by_id(admin_id)
            .await
            .context("Failed to get admin")?
            .ok_or(AuthError::NotFound)?;
        Ok(AdminProfile::from(&admin))
    }

    /// Update email, display name and avatar. Empty strings clear the field.
    pub async fn update_profile(
        &self,
        admin_id: i64,
        input: UpdateProfileInput,
    ) -> Result<AdminProfile, AuthError> {
        let repos = self.repos().ok_or(AuthError::StoreUnavailable)?;

        if input.is_empty() {
            return Err(AuthError::ValidationError("No fields to update".to_string()));
        }

        let existing = repos
            .admins
            .get_by_id(admin_id)
            .await
            .context("Failed to get admin")?
            .ok_or(AuthError::NotFound)?;

        let fields = ProfileFields {
            email: input.email.map(non_empty).unwrap_or(existing.email),
            display_name: input.display_name.map(non_empty).unwrap_or(existing.display_name),
            avatar: input.avatar.map(non_empty).unwrap_or(existing.avatar),
        };

        let admin = repos
            .admins
            .update_profile(admin_id, &fields)
            .await
            .context("Failed to update profile")?
            .ok_or(AuthError::NotFound)?;

        Ok(AdminProfile::from(&admin))
    }

    /// Change the password and revoke every other session of the admin.
    pub async fn change_password(
        &self,
        admin_id: i64,
        current_session: &str,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let repos = self.repos().ok_or(AuthError::StoreUnavailable)?;

        if current_password.is_empty() || new_password.is_empty() {
            return Err(AuthError::ValidationError(
                "Current and new password are required".to_string(),
            ));
        }
        if new_password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::ValidationError(format!(
                "New password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        let admin = repos
            .admins
            .get_by_id(admin_id)
            .await
            .context("Failed to get admin")?
            .ok_or(AuthError::NotFound)?;

        let valid = verify_password(current_password, &admin.password_hash)
            .context("Failed to verify password")?;
        if !valid {
            return Err(AuthError::WrongPassword);
        }

        let hash = hash_password(new_password)?;
        repos
            .admins
            .update_password(admin_id, &hash)
            .await
            .context("Failed to update password")?;

        let revoked = repos
            .sessions
            .delete_by_admin_except(admin_id, current_session)
            .await
            .context("Failed to revoke sessions")?;

        tracing::info!(admin_id, revoked, "Admin password changed");
        Ok(())
    }

    /// Create the first admin when none exists. Returns whether one was created.
    pub async fn ensure_initial_admin(&self, username: &str, password: &str) -> Result<bool, AuthError> {
        let repos = self.repos().ok_or(AuthError::StoreUnavailable)?;

        if username.trim().is_empty() || password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::ValidationError(format!(
                "Initial admin needs a username and a password of at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        let count = repos.admins.count().await.context("Failed to count admins")?;
        if count > 0 {
            return Ok(false);
        }

        let hash = hash_password(password)?;
        let admin = repos
            .admins
            .create(username, &hash)
            .await
            .context("Failed to create initial admin")?;

        tracing::info!(admin_id = admin.id, username, "Initial admin created");
        Ok(true)
    }

    /// Delete every expired session. Returns the number removed.
    pub async fn purge_expired_sessions(&self) -> Result<u64, AuthError> {
        let repos = self.repos().ok_or(AuthError::StoreUnavailable)?;
        let removed = repos
            .sessions
            .delete_expired(Utc::now())
            .await
            .context("Failed to purge sessions")?;
        Ok(removed)
    }
}
