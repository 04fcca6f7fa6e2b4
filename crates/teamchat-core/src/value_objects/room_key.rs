//! Room keys
//!
//! A room is a named broadcast group of connections. Its key is typed by the
//! entity it fans out for and renders as `<kind>:<id>`.

use super::ids::{ChannelId, HuddleId, IdParseError, UserId, WorkspaceId};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Key of a broadcast room
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RoomKey {
    /// Every member connection of a workspace (presence fan-out)
    Workspace(WorkspaceId),
    /// Subscribers of a channel (messages, reactions, typing)
    Channel(ChannelId),
    /// Participants of a huddle
    Huddle(HuddleId),
    /// All connections of one user (unicast: signaling, replies)
    User(UserId),
}

impl RoomKey {
    /// The `<kind>` prefix of the key
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Workspace(_) => "workspace",
            Self::Channel(_) => "channel",
            Self::Huddle(_) => "huddle",
            Self::User(_) => "user",
        }
    }
}

impl fmt::Display for RoomKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Workspace(id) => write!(f, "workspace:{id}"),
            Self::Channel(id) => write!(f, "channel:{id}"),
            Self::Huddle(id) => write!(f, "huddle:{id}"),
            Self::User(id) => write!(f, "user:{id}"),
        }
    }
}

/// Error when parsing a room key
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomKeyParseError {
    #[error("room key is missing the ':' separator: {0}")]
    MissingSeparator(String),

    #[error("unknown room kind: {0}")]
    UnknownKind(String),

    #[error(transparent)]
    InvalidId(#[from] IdParseError),
}

impl FromStr for RoomKey {
    type Err = RoomKeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, id) = s
            .split_once(':')
            .ok_or_else(|| RoomKeyParseError::MissingSeparator(s.to_string()))?;

        match kind {
            "workspace" => Ok(Self::Workspace(id.parse()?)),
            "channel" => Ok(Self::Channel(id.parse()?)),
            "huddle" => Ok(Self::Huddle(id.parse()?)),
            "user" => Ok(Self::User(id.parse()?)),
            other => Err(RoomKeyParseError::UnknownKind(other.to_string())),
        }
    }
}

impl From<WorkspaceId> for RoomKey {
    fn from(id: WorkspaceId) -> Self {
        Self::Workspace(id)
    }
}

impl From<ChannelId> for RoomKey {
    fn from(id: ChannelId) -> Self {
        Self::Channel(id)
    }
}

impl From<HuddleId> for RoomKey {
    fn from(id: HuddleId) -> Self {
        Self::Huddle(id)
    }
}

impl From<UserId> for RoomKey {
    fn from(id: UserId) -> Self {
        Self::User(id)
    }
}

impl Serialize for RoomKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RoomKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_display_uses_kind_prefix() {
        let channel = ChannelId::new(Uuid::from_u128(1));
        let key = RoomKey::from(channel);
        assert_eq!(key.to_string(), format!("channel:{channel}"));
        assert_eq!(key.kind(), "channel");
    }

    #[test]
    fn test_parse_each_kind() {
        let id = Uuid::from_u128(42);
        for (text, expected) in [
            (format!("workspace:{id}"), RoomKey::Workspace(id.into())),
            (format!("channel:{id}"), RoomKey::Channel(id.into())),
            (format!("huddle:{id}"), RoomKey::Huddle(id.into())),
            (format!("user:{id}"), RoomKey::User(id.into())),
        ] {
            assert_eq!(text.parse::<RoomKey>().unwrap(), expected);
        }
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            "channel".parse::<RoomKey>(),
            Err(RoomKeyParseError::MissingSeparator(_))
        ));
        assert!(matches!(
            "team:abc".parse::<RoomKey>(),
            Err(RoomKeyParseError::UnknownKind(kind)) if kind == "team"
        ));
        assert!(matches!(
            "user:not-a-uuid".parse::<RoomKey>(),
            Err(RoomKeyParseError::InvalidId(_))
        ));
    }

    #[test]
    fn test_serde_as_string() {
        let key = RoomKey::Huddle(HuddleId::new(Uuid::from_u128(9)));
        let json = serde_json::to_value(key).unwrap();
        assert_eq!(json, serde_json::json!(key.to_string()));
        let back: RoomKey = serde_json::from_value(json).unwrap();
        assert_eq!(back, key);
    }
}
