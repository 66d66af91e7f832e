//! Category model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::patch::double_option;

/// Category entity. Each post belongs to at most one category.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    /// Unique identifier
    pub id: i64,
    /// Display name
    pub name: String,
    /// URL-friendly slug (unique)
    pub slug: String,
    /// Optional description
    pub description: Option<String>,
    /// Sort order for display (lower first)
    pub sort_order: i32,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

/// Category with the number of published posts filed under it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryWithCount {
    #[serde(flatten)]
    pub category: Category,
    pub post_count: i64,
}

/// Input for creating a new category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCategoryInput {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
}

impl CreateCategoryInput {
    pub fn new(name: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slug: slug.into(),
            description: None,
            sort_order: 0,
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the sort order
    pub fn with_sort_order(mut self, sort_order: i32) -> Self {
        self.sort_order = sort_order;
        self
    }
}

/// Partial update for a category. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateCategoryInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    /// `Some(None)` clears the description
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub sort_order: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_input_defaults() {
        let input: CreateCategoryInput =
            serde_json::from_str(r#"{"name": "Tech", "slug": "tech"}"#).unwrap();

        assert_eq!(input.sort_order, 0);
        assert!(input.description.is_none());
    }

    #[test]
    fn test_update_input_explicit_null_description() {
        let input: UpdateCategoryInput =
            serde_json::from_str(r#"{"description": null}"#).unwrap();

        assert_eq!(input.description, Some(None));
        assert!(input.name.is_none());
        assert!(input.sort_order.is_none());
    }

    #[test]
    fn test_category_with_count_flattens() {
        let now = Utc::now();
        let value = serde_json::to_value(CategoryWithCount {
            category: Category {
                id: 1,
                name: "Tech".to_string(),
                slug: "tech".to_string(),
                description: None,
                sort_order: 0,
                created_at: now,
                updated_at: now,
            },
            post_count: 3,
        })
        .unwrap();

        assert_eq!(value["slug"], "tech");
        assert_eq!(value["post_count"], 3);
    }
}
