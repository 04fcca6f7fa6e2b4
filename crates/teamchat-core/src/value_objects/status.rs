//! Presence status values

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Presence status of a user as seen by other workspace members
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceStatus {
    /// Connected and available
    Online,
    /// Connected, away from keyboard
    Away,
    /// Connected, do not disturb
    Busy,
    /// Last connection dropped, waiting out the reconnect grace period
    OfflinePending,
    /// No live connection
    #[default]
    Offline,
}

impl PresenceStatus {
    /// Whether the user has at least one live connection in this status
    #[must_use]
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Online | Self::Away | Self::Busy)
    }

    /// Whether a user may pick this status explicitly
    ///
    /// The pending and offline states are driven by connectivity only.
    #[must_use]
    pub const fn is_user_selectable(self) -> bool {
        self.is_connected()
    }

    /// Wire name of the status
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Away => "away",
            Self::Busy => "busy",
            Self::OfflinePending => "offline_pending",
            Self::Offline => "offline",
        }
    }
}

impl fmt::Display for PresenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error when parsing a presence status
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid status: {0}")]
pub struct StatusParseError(pub String);

impl FromStr for PresenceStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "online" | "active" => Ok(Self::Online),
            "away" | "idle" => Ok(Self::Away),
            "busy" | "dnd" => Ok(Self::Busy),
            "offline_pending" => Ok(Self::OfflinePending),
            "offline" => Ok(Self::Offline),
            _ => Err(StatusParseError(s.to_string())),
        }
    }
}
