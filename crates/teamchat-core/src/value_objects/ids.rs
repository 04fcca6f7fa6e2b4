//! Typed identifiers
//!
//! Every entity the real-time core deals with is keyed by a UUID. Wrapping each
//! one in its own newtype keeps a channel id from ever being passed where a
//! workspace id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Error when parsing an identifier from a string
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind} id: {value}")]
pub struct IdParseError {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Create an identifier from a raw UUID
            #[inline]
            pub const fn new(id: Uuid) -> Self {
                Self(id)
            }

            /// Generate a fresh random identifier
            #[must_use]
            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }

            /// Get the inner UUID
            #[inline]
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = IdParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self).map_err(|_| IdParseError {
                    kind: $kind,
                    value: s.to_string(),
                })
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(
    /// A registered user
    UserId,
    "user"
);
define_id!(
    /// A workspace (team)
    WorkspaceId,
    "workspace"
);
define_id!(
    /// A channel inside a workspace
    ChannelId,
    "channel"
);
define_id!(
    /// A voice/video huddle attached to a channel
    HuddleId,
    "huddle"
);
define_id!(
    /// A chat message
    MessageId,
    "message"
);
define_id!(
    /// One live transport-level session (a browser tab or device)
    ///
    /// Unique per process; never reused after disconnect.
    ConnectionId,
    "connection"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_unique() {
        assert_ne!(ConnectionId::generate(), ConnectionId::generate());
    }

    #[test]
    fn test_parse_and_display() {
        let raw = "4f1c2b9a-0d5e-4c57-9a7e-2a3b4c5d6e7f";
        let id: ChannelId = raw.parse().unwrap();
        assert_eq!(id.to_string(), raw);
    }

    #[test]
    fn test_parse_error_names_kind() {
        let err = "nope".parse::<WorkspaceId>().unwrap_err();
        assert_eq!(err.kind, "workspace");
        assert_eq!(err.to_string(), "invalid workspace id: nope");
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let id = UserId::new(Uuid::from_u128(7));
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"00000000-0000-0000-0000-000000000007\"");

        let back: UserId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
