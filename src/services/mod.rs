//! Services layer - Business logic
//!
//! Services sit between the HTTP handlers and the repositories. They check
//! the store gate, validate input and map store errors into typed errors.

pub mod auth;
pub mod blog;
pub mod content;
pub mod markdown;
pub mod password;
pub mod samples;

pub use auth::{AuthError, AuthService};
pub use blog::{BlogService, CategoryPage, TagPage};
pub use content::{is_valid_slug, ContentError, ContentService};
pub use markdown::MarkdownRenderer;
pub use password::{hash_password, verify_password};
pub use samples::{SampleContent, StaticSamples};
