//! Data models
//!
//! Database entities (Post, Category, Tag, Admin, AdminSession), the shapes
//! returned by the public read paths, and the create/update inputs.

mod admin;
mod category;
pub mod patch;
mod post;
mod session;
mod tag;

pub use admin::{Admin, AdminProfile, UpdateProfileInput};
pub use category::{Category, CategoryWithCount, CreateCategoryInput, UpdateCategoryInput};
pub use post::{
    AdjacentPosts, CreatePostInput, DashboardStats, Post, PostLink, PostSummary,
    PostWithRelations, UpdatePostInput,
};
pub use session::AdminSession;
pub use tag::{CreateTagInput, Tag, UpdateTagInput};
