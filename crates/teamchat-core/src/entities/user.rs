//! User profile - the public face of a user inside real-time payloads

use serde::{Deserialize, Serialize};

use crate::value_objects::UserId;

/// Public user profile attached to presence, typing and huddle payloads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: UserId,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl UserProfile {
    /// Create a profile with only the required fields
    pub fn new(id: UserId, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            full_name: None,
            avatar_url: None,
        }
    }

    /// Set the display name
    #[must_use]
    pub fn with_full_name(mut self, full_name: impl Into<String>) -> Self {
        self.full_name = Some(full_name.into());
        self
    }

    /// Set the avatar URL
    #[must_use]
    pub fn with_avatar_url(mut self, url: impl Into<String>) -> Self {
        self.avatar_url = Some(url.into());
        self
    }

    /// Name to show in UI: full name when present, otherwise username
    pub fn display_name(&self) -> &str {
        self.full_name.as_deref().unwrap_or(&self.username)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_display_name_prefers_full_name() {
        let id = UserId::new(Uuid::from_u128(1));
        let bare = UserProfile::new(id, "ada");
        assert_eq!(bare.display_name(), "ada");

        let named = bare.with_full_name("Ada Lovelace");
        assert_eq!(named.display_name(), "Ada Lovelace");
    }

    #[test]
    fn test_optional_fields_are_omitted() {
        let profile = UserProfile::new(UserId::new(Uuid::from_u128(1)), "ada");
        let json = serde_json::to_value(&profile).unwrap();
        assert!(json.get("fullName").is_none());
        assert!(json.get("avatarUrl").is_none());
        assert_eq!(json["username"], "ada");
    }
}
