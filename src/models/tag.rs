//! Tag model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::patch::double_option;

/// Tag entity. Posts and tags are linked many-to-many through `post_tags`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    /// URL-friendly slug (unique)
    pub slug: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTagInput {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl CreateTagInput {
    pub fn new(name: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slug: slug.into(),
            description: None,
        }
    }
}

/// Partial update for a tag
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTagInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_input_absent_fields() {
        let input: UpdateTagInput = serde_json::from_str(r#"{"name": "Rust"}"#).unwrap();

        assert_eq!(input.name.as_deref(), Some("Rust"));
        assert!(input.slug.is_none());
        assert!(input.description.is_none());
    }
}
