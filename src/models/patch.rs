//! Helpers for partial-update payloads
//!
//! A nullable column in an update needs three states: leave it alone, set it
//! to NULL, or set it to a value. JSON carries these as an absent key, an
//! explicit `null`, and a value. Fields typed `Option<Option<T>>` with
//! [`double_option`] keep the distinction through deserialization.

use serde::{Deserialize, Deserializer};

/// Deserialize a present key as `Some(..)`, including an explicit `null`.
///
/// Use together with `#[serde(default)]` so an absent key stays `None`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Turn an empty or whitespace-only string into `None`.
pub fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
