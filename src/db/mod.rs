//! Database layer
//!
//! Supports:
//! - SQLite (default, for single-binary deployment)
//! - MySQL (for larger deployments)
//!
//! # Architecture
//!
//! The `DatabasePool` trait hides the backend from services. Repositories
//! call `DatabasePool::backend()` and run the matching per-driver query.
//! `Store` wraps an optional pool so the blog can run without a database.
//!
//! # Usage
//!
//! ```ignore
//! use owlblog::config::DatabaseConfig;
//! use owlblog::db::{migrations, Store};
//!
//! let store = Store::connect(&DatabaseConfig::default()).await?;
//! if let Some(pool) = store.pool() {
//!     migrations::run_migrations(pool).await?;
//! }
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;
pub mod store;

pub use pool::{
    create_pool, create_test_pool, Backend, DatabasePool, DynDatabasePool, MysqlDatabase,
    SqliteDatabase,
};
pub use store::Store;
