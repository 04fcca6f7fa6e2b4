//! Gateway frame format
//!
//! Every frame in both directions is a JSON object `{"event": <name>, "data": <payload>}`.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use teamchat_common::ErrorResponse;
use teamchat_core::{ChannelId, ConnectionId, DomainEvent, UserProfile, WorkspaceId};

use super::CloseCode;

/// Frame sent from the gateway to a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerFrame {
    /// Event name
    pub event: String,

    /// Event data payload
    #[serde(default)]
    pub data: Value,
}

impl ServerFrame {
    #[must_use]
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    /// Frame for a routed domain event
    pub fn from_event(event: &DomainEvent) -> Result<Self, serde_json::Error> {
        Ok(Self::new(event.event_name(), event.payload()?))
    }

    // === Server Messages ===

    /// First frame on every connection
    #[must_use]
    pub fn hello(connection_id: ConnectionId, idle_timeout: Duration) -> Self {
        Self::new(
            "hello",
            json!({
                "connectionId": connection_id,
                "idleTimeoutMs": idle_timeout.as_millis() as u64,
            }),
        )
    }

    #[must_use]
    pub fn authenticated(
        user: &UserProfile,
        workspaces: &[WorkspaceId],
        channels: &[ChannelId],
    ) -> Self {
        Self::new(
            "authenticated",
            json!({ "user": user, "workspaces": workspaces, "channels": channels }),
        )
    }

    #[must_use]
    pub fn auth_error(body: &ErrorResponse) -> Self {
        Self::new("auth_error", json!(body))
    }

    /// Rejection of a client action, sent to the initiating connection only
    #[must_use]
    pub fn error(body: &ErrorResponse) -> Self {
        Self::new("error", json!(body))
    }

    #[must_use]
    pub fn pong() -> Self {
        Self::new("pong", json!({ "ts": chrono::Utc::now().timestamp_millis() }))
    }

    #[must_use]
    pub fn joined_workspace(workspace_id: WorkspaceId) -> Self {
        Self::new("joined_workspace", json!({ "workspaceId": workspace_id }))
    }

    #[must_use]
    pub fn joined_channel(channel_id: ChannelId) -> Self {
        Self::new("joined_channel", json!({ "channelId": channel_id }))
    }

    #[must_use]
    pub fn left_channel(channel_id: ChannelId) -> Self {
        Self::new("left_channel", json!({ "channelId": channel_id }))
    }

    /// Serialize once so the same bytes can be queued to many connections
    pub fn encode(&self) -> Result<EncodedFrame, serde_json::Error> {
        serde_json::to_string(self).map(|text| EncodedFrame(Arc::from(text)))
    }
}

/// A serialized server frame, shared between all recipients of one dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedFrame(Arc<str>);

impl EncodedFrame {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse back into a frame
    pub fn decode(&self) -> Result<ServerFrame, serde_json::Error> {
        serde_json::from_str(&self.0)
    }
}

/// Frame received from a client
#[derive(Debug, Clone, Deserialize)]
pub struct ClientFrame {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

impl ClientFrame {
    /// Parse a text frame
    pub fn from_json(text: &str) -> Result<Self, FrameError> {
        serde_json::from_str(text).map_err(|e| FrameError::Malformed(e.to_string()))
    }
}

/// Frame-level protocol violations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("Malformed frame: {0}")]
    Malformed(String),

    #[error("Unknown event: {0}")]
    UnknownEvent(String),

    #[error("Invalid payload for {event}: {reason}")]
    InvalidPayload { event: &'static str, reason: String },
}

impl FrameError {
    /// Close code when the violation terminates the transport
    ///
    /// A payload that does not match its event is reported, not fatal.
    pub fn close_code(&self) -> Option<CloseCode> {
        match self {
            Self::Malformed(_) => Some(CloseCode::DecodeError),
            Self::UnknownEvent(_) => Some(CloseCode::UnknownEvent),
            Self::InvalidPayload { .. } => None,
        }
    }
}
