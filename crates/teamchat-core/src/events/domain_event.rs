//! Domain events - things that happened and must reach live connections
//!
//! Events are immutable values. They are built by the inbound action handlers,
//! by the presence tracker, or by out-of-core producers (the REST layer), and
//! consumed by a single dispatch in the gateway's event router.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::entities::{ReactionSummary, UserProfile};
use crate::value_objects::{ChannelId, HuddleId, MessageId, PresenceStatus, UserId, WorkspaceId};

/// All events the real-time core fans out
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DomainEvent {
    // =========================================================================
    // Message Events
    // =========================================================================
    MessageCreated(MessageCreatedEvent),
    ReplyCreated(ReplyCreatedEvent),
    MessageEdited(MessageEditedEvent),
    MessageDeleted(MessageDeletedEvent),

    // =========================================================================
    // Reaction Events
    // =========================================================================
    ReactionAdded(ReactionChangedEvent),
    ReactionRemoved(ReactionChangedEvent),

    // =========================================================================
    // Typing Events
    // =========================================================================
    TypingStarted(TypingEvent),
    TypingStopped(TypingEvent),

    // =========================================================================
    // Presence Events
    // =========================================================================
    PresenceChanged(PresenceChangedEvent),

    // =========================================================================
    // Huddle Events
    // =========================================================================
    HuddleStarted(HuddleLifecycleEvent),
    HuddleEnded(HuddleLifecycleEvent),
    HuddleParticipantJoined(HuddleParticipantEvent),
    HuddleParticipantLeft(HuddleParticipantEvent),
    HuddleSettingsUpdated(HuddleSettingsEvent),

    // =========================================================================
    // WebRTC Signaling
    // =========================================================================
    Signal(SignalEvent),
}

impl DomainEvent {
    /// Event name as clients see it on the wire
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::MessageCreated(_) => "new_message",
            Self::ReplyCreated(_) => "new_reply",
            Self::MessageEdited(_) => "message_edited",
            Self::MessageDeleted(_) => "message_deleted",
            Self::ReactionAdded(_) => "reaction_added",
            Self::ReactionRemoved(_) => "reaction_removed",
            Self::TypingStarted(_) => "user_typing",
            Self::TypingStopped(_) => "user_stopped_typing",
            Self::PresenceChanged(e) => e.change.event_name(),
            Self::HuddleStarted(_) => "huddle_started",
            Self::HuddleEnded(_) => "huddle_ended",
            Self::HuddleParticipantJoined(_) => "huddle_participant_joined",
            Self::HuddleParticipantLeft(_) => "huddle_participant_left",
            Self::HuddleSettingsUpdated(_) => "huddle_participant_settings",
            Self::Signal(e) => e.kind.event_name(),
        }
    }

    /// Client-facing payload
    ///
    /// Routing-only fields (workspace lists, reply targets) are not part of it.
    pub fn payload(&self) -> Result<Value, serde_json::Error> {
        match self {
            Self::MessageCreated(e) => serde_json::to_value(e),
            Self::ReplyCreated(e) => serde_json::to_value(e),
            Self::MessageEdited(e) => serde_json::to_value(e),
            Self::MessageDeleted(e) => serde_json::to_value(e),
            Self::ReactionAdded(e) | Self::ReactionRemoved(e) => serde_json::to_value(e),
            Self::TypingStarted(e) | Self::TypingStopped(e) => serde_json::to_value(e),
            Self::PresenceChanged(e) => serde_json::to_value(e),
            Self::HuddleStarted(e) | Self::HuddleEnded(e) => serde_json::to_value(e),
            Self::HuddleParticipantJoined(e) | Self::HuddleParticipantLeft(e) => {
                serde_json::to_value(e)
            }
            Self::HuddleSettingsUpdated(e) => serde_json::to_value(e),
            Self::Signal(e) => Ok(e.wire_payload()),
        }
    }
}

// ============================================================================
// Event Structs
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageCreatedEvent {
    pub channel_id: ChannelId,
    pub message: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyCreatedEvent {
    pub channel_id: ChannelId,
    pub parent_message_id: MessageId,
    /// Recipient of the notification
    #[serde(skip_serializing)]
    pub parent_author_id: UserId,
    pub reply: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEditedEvent {
    pub channel_id: ChannelId,
    pub message_id: MessageId,
    pub content: String,
    pub edited_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDeletedEvent {
    pub channel_id: ChannelId,
    pub message_id: MessageId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionChangedEvent {
    pub channel_id: ChannelId,
    pub message_id: MessageId,
    pub reactions: Vec<ReactionSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingEvent {
    pub channel_id: ChannelId,
    pub user_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}

impl TypingEvent {
    /// Build a typing payload, copying display fields from the profile if known
    pub fn new(channel_id: ChannelId, user_id: UserId, profile: Option<&UserProfile>) -> Self {
        Self {
            channel_id,
            user_id,
            username: profile.map(|p| p.username.clone()),
            full_name: profile.and_then(|p| p.full_name.clone()),
        }
    }
}

/// Which presence transition a `PresenceChanged` event reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceChange {
    /// First connection attached (offline -> online)
    CameOnline,
    /// Grace period elapsed with no connection (offline-pending -> offline)
    WentOffline,
    /// Explicit status change by the user
    StatusChanged,
}

impl PresenceChange {
    pub const fn event_name(self) -> &'static str {
        match self {
            Self::CameOnline => "user_online",
            Self::WentOffline => "user_offline",
            Self::StatusChanged => "user_status_changed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceChangedEvent {
    pub user_id: UserId,
    pub change: PresenceChange,
    pub status: PresenceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserProfile>,
    /// Workspaces whose members must see the change
    #[serde(default, skip_serializing)]
    pub workspaces: Vec<WorkspaceId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HuddleLifecycleEvent {
    pub huddle_id: HuddleId,
    pub channel_id: ChannelId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_by: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HuddleParticipantEvent {
    pub huddle_id: HuddleId,
    pub user_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserProfile>,
    /// Everyone in the huddle after a join, the joiner included
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub participants: Vec<UserProfile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HuddleSettingsEvent {
    pub huddle_id: HuddleId,
    pub user_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_video_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_audio_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_screen_sharing: Option<bool>,
}

/// WebRTC signaling message kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    Offer,
    Answer,
    IceCandidate,
}

impl SignalKind {
    pub const fn event_name(self) -> &'static str {
        match self {
            Self::Offer => "webrtc_offer",
            Self::Answer => "webrtc_answer",
            Self::IceCandidate => "webrtc_ice_candidate",
        }
    }

    /// Key under which the opaque SDP/candidate blob travels
    pub const fn payload_key(self) -> &'static str {
        match self {
            Self::Offer => "offer",
            Self::Answer => "answer",
            Self::IceCandidate => "candidate",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalEvent {
    pub kind: SignalKind,
    pub from: UserId,
    pub to: UserId,
    /// Opaque SDP offer/answer or ICE candidate, relayed untouched
    pub payload: Value,
}

impl SignalEvent {
    fn wire_payload(&self) -> Value {
        let mut body = json!({ "from": self.from, "to": self.to });
        body[self.kind.payload_key()] = self.payload.clone();
        body
    }
}
