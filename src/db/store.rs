//! Store availability gate
//!
//! The blog can run without a database, serving sample content on the public
//! side and refusing admin writes. `Store` is built once at startup and cloned
//! into every service; each service asks it for the pool on every call.

use anyhow::{Context, Result};

use super::{create_pool, DynDatabasePool};
use crate::config::DatabaseConfig;

/// Optional handle to the relational store.
#[derive(Clone, Default)]
pub struct Store {
    pool: Option<DynDatabasePool>,
}

impl Store {
    /// A store backed by an open pool
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool: Some(pool) }
    }

    /// A store with nothing behind it
    pub fn unavailable() -> Self {
        Self { pool: None }
    }

    /// Connect according to configuration, or stay unavailable when
    /// `database.enabled` is false.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        if !config.enabled {
            tracing::warn!("Database disabled by configuration, serving sample content only");
            return Ok(Self::unavailable());
        }
        let pool = create_pool(config).await?;
        pool.ping().await.context("Database is not responding")?;
        Ok(Self::new(pool))
    }

    /// The pool, when one is configured
    pub fn pool(&self) -> Option<&DynDatabasePool> {
        self.pool.as_ref()
    }

    pub fn is_available(&self) -> bool {
        self.pool.is_some()
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("driver", &self.pool.as_ref().map(|p| p.driver()))
            .finish()
    }
}
