//! Admin account model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::patch::double_option;

/// Admin account. There is no public registration; accounts come from
/// configuration or the `init-admin` helper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Admin {
    pub id: i64,
    pub username: String,
    /// Password hash (argon2)
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public view of an admin, without credentials
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdminProfile {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub avatar: Option<String>,
}

impl From<&Admin> for AdminProfile {
    fn from(admin: &Admin) -> Self {
        Self {
            id: admin.id,
            username: admin.username.clone(),
            email: admin.email.clone(),
            display_name: admin.display_name.clone(),
            avatar: admin.avatar.clone(),
        }
    }
}

/// Partial profile update. Empty strings are stored as NULL.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProfileInput {
    #[serde(default, deserialize_with = "double_option")]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub display_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub avatar: Option<Option<String>>,
}

impl UpdateProfileInput {
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.display_name.is_none() && self.avatar.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_not_serialized() {
        let now = Utc::now();
        let admin = Admin {
            id: 1,
            username: "owner".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            email: None,
            display_name: Some("Owner".to_string()),
            avatar: None,
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_string(&admin).unwrap();
        assert!(!json.contains("argon2"));
        assert_eq!(AdminProfile::from(&admin).display_name.as_deref(), Some("Owner"));
    }
}
