//! Client events
//!
//! Typed view of every event a client may send. Events whose only argument is
//! an id accept either the bare id or an object carrying it
//! (`"data": "<uuid>"` or `"data": {"channelId": "<uuid>"}`).

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use teamchat_core::{ChannelId, HuddleId, MessageId, SignalKind, UserId, WorkspaceId};

use super::{ClientFrame, FrameError};

macro_rules! bare_or_keyed {
    ($name:ident, $field:ident: $ty:ty, $key:literal) => {
        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                #[derive(Deserialize)]
                #[serde(untagged)]
                enum Repr {
                    Bare($ty),
                    Keyed {
                        #[serde(rename = $key)]
                        $field: $ty,
                    },
                }

                Ok(match Repr::deserialize(deserializer)? {
                    Repr::Bare(value) | Repr::Keyed { $field: value } => Self { $field: value },
                })
            }
        }
    };
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatePayload {
    pub token: String,
}
bare_or_keyed!(AuthenticatePayload, token: String, "token");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkspaceRef {
    pub workspace_id: WorkspaceId,
}
bare_or_keyed!(WorkspaceRef, workspace_id: WorkspaceId, "workspaceId");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelRef {
    pub channel_id: ChannelId,
}
bare_or_keyed!(ChannelRef, channel_id: ChannelId, "channelId");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageRef {
    pub message_id: MessageId,
}
bare_or_keyed!(MessageRef, message_id: MessageId, "messageId");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HuddleRef {
    pub huddle_id: HuddleId,
}
bare_or_keyed!(HuddleRef, huddle_id: HuddleId, "huddleId");

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessagePayload {
    pub channel_id: ChannelId,
    pub content: String,
    #[serde(default)]
    pub parent_message_id: Option<MessageId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditMessagePayload {
    pub message_id: MessageId,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionPayload {
    pub message_id: MessageId,
    pub emoji: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HuddleSettingsPayload {
    pub huddle_id: HuddleId,
    #[serde(default)]
    pub is_video_enabled: Option<bool>,
    #[serde(default)]
    pub is_audio_enabled: Option<bool>,
    #[serde(default)]
    pub is_screen_sharing: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusPayload {
    pub status: String,
    #[serde(default)]
    pub status_message: Option<String>,
}

/// WebRTC signal addressed to one user
#[derive(Debug, Clone, PartialEq)]
pub struct SignalPayload {
    pub kind: SignalKind,
    pub to: UserId,
    /// SDP offer/answer or ICE candidate, relayed untouched
    pub payload: Value,
}

impl SignalPayload {
    fn parse(kind: SignalKind, data: Value) -> Result<Self, FrameError> {
        #[derive(Deserialize)]
        struct Target {
            to: UserId,
        }

        let event = kind.event_name();
        let payload = data
            .get(kind.payload_key())
            .filter(|v| !v.is_null())
            .cloned()
            .ok_or_else(|| FrameError::InvalidPayload {
                event,
                reason: format!("missing field `{}`", kind.payload_key()),
            })?;
        let Target { to } = decode(event, data)?;

        Ok(Self { kind, to, payload })
    }
}

/// An event sent by a client
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    Authenticate(AuthenticatePayload),
    JoinWorkspace(WorkspaceRef),
    JoinChannel(ChannelRef),
    LeaveChannel(ChannelRef),
    SendMessage(SendMessagePayload),
    EditMessage(EditMessagePayload),
    DeleteMessage(MessageRef),
    AddReaction(ReactionPayload),
    RemoveReaction(ReactionPayload),
    TypingStart(ChannelRef),
    TypingStop(ChannelRef),
    HuddleJoin(HuddleRef),
    HuddleLeave(HuddleRef),
    HuddleSettingsUpdate(HuddleSettingsPayload),
    Signal(SignalPayload),
    UpdateStatus(StatusPayload),
    Ping,
}

impl ClientEvent {
    /// Interpret a parsed frame
    pub fn from_frame(frame: ClientFrame) -> Result<Self, FrameError> {
        let ClientFrame { event, data } = frame;

        let parsed = match event.as_str() {
            "authenticate" => Self::Authenticate(decode("authenticate", data)?),
            "join_workspace" => Self::JoinWorkspace(decode("join_workspace", data)?),
            "join_channel" => Self::JoinChannel(decode("join_channel", data)?),
            "leave_channel" => Self::LeaveChannel(decode("leave_channel", data)?),
            "send_message" => Self::SendMessage(decode("send_message", data)?),
            "edit_message" => Self::EditMessage(decode("edit_message", data)?),
            "delete_message" => Self::DeleteMessage(decode("delete_message", data)?),
            "add_reaction" => Self::AddReaction(decode("add_reaction", data)?),
            "remove_reaction" => Self::RemoveReaction(decode("remove_reaction", data)?),
            "typing_start" => Self::TypingStart(decode("typing_start", data)?),
            "typing_stop" => Self::TypingStop(decode("typing_stop", data)?),
            "huddle_join" => Self::HuddleJoin(decode("huddle_join", data)?),
            "huddle_leave" => Self::HuddleLeave(decode("huddle_leave", data)?),
            "huddle_settings_update" => {
                Self::HuddleSettingsUpdate(decode("huddle_settings_update", data)?)
            }
            "webrtc_offer" => Self::Signal(SignalPayload::parse(SignalKind::Offer, data)?),
            "webrtc_answer" => Self::Signal(SignalPayload::parse(SignalKind::Answer, data)?),
            "webrtc_ice_candidate" => {
                Self::Signal(SignalPayload::parse(SignalKind::IceCandidate, data)?)
            }
            "update_status" => Self::UpdateStatus(decode("update_status", data)?),
            "ping" => Self::Ping,
            _ => return Err(FrameError::UnknownEvent(event)),
        };

        Ok(parsed)
    }

    /// Parse a raw text frame
    pub fn from_json(text: &str) -> Result<Self, FrameError> {
        Self::from_frame(ClientFrame::from_json(text)?)
    }

    /// Wire name of the event
    pub fn name(&self) -> &'static str {
        match self {
            Self::Authenticate(_) => "authenticate",
            Self::JoinWorkspace(_) => "join_workspace",
            Self::JoinChannel(_) => "join_channel",
            Self::LeaveChannel(_) => "leave_channel",
            Self::SendMessage(_) => "send_message",
            Self::EditMessage(_) => "edit_message",
            Self::DeleteMessage(_) => "delete_message",
            Self::AddReaction(_) => "add_reaction",
            Self::RemoveReaction(_) => "remove_reaction",
            Self::TypingStart(_) => "typing_start",
            Self::TypingStop(_) => "typing_stop",
            Self::HuddleJoin(_) => "huddle_join",
            Self::HuddleLeave(_) => "huddle_leave",
            Self::HuddleSettingsUpdate(_) => "huddle_settings_update",
            Self::Signal(s) => s.kind.event_name(),
            Self::UpdateStatus(_) => "update_status",
            Self::Ping => "ping",
        }
    }

    /// Events accepted before `authenticate` succeeds
    pub fn allowed_anonymous(&self) -> bool {
        matches!(self, Self::Authenticate(_) | Self::Ping)
    }
}

fn decode<T: DeserializeOwned>(event: &'static str, data: Value) -> Result<T, FrameError> {
    serde_json::from_value(data).map_err(|e| FrameError::InvalidPayload {
        event,
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    fn parse(value: Value) -> Result<ClientEvent, FrameError> {
        ClientEvent::from_json(&value.to_string())
    }

    #[test]
    fn test_bare_and_keyed_ids() {
        let id = ChannelId::new(Uuid::from_u128(1));

        let bare = parse(json!({"event": "join_channel", "data": id})).unwrap();
        let keyed = parse(json!({"event": "join_channel", "data": {"channelId": id}})).unwrap();

        assert_eq!(bare, ClientEvent::JoinChannel(ChannelRef { channel_id: id }));
        assert_eq!(bare, keyed);
    }

    #[test]
    fn test_authenticate_token_forms() {
        let bare = parse(json!({"event": "authenticate", "data": "abc"})).unwrap();
        let keyed = parse(json!({"event": "authenticate", "data": {"token": "abc"}})).unwrap();
        assert_eq!(bare, keyed);
        assert_eq!(bare.name(), "authenticate");
        assert!(bare.allowed_anonymous());
    }

    #[test]
    fn test_send_message_payload() {
        let channel = ChannelId::new(Uuid::from_u128(1));
        let parent = MessageId::new(Uuid::from_u128(2));

        let event = parse(json!({
            "event": "send_message",
            "data": {"channelId": channel, "content": "hi", "parentMessageId": parent}
        }))
        .unwrap();

        match event {
            ClientEvent::SendMessage(p) => {
                assert_eq!(p.channel_id, channel);
                assert_eq!(p.content, "hi");
                assert_eq!(p.parent_message_id, Some(parent));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_signal_payload() {
        let to = UserId::new(Uuid::from_u128(9));
        let event = parse(json!({
            "event": "webrtc_offer",
            "data": {"to": to, "offer": {"sdp": "v=0"}}
        }))
        .unwrap();

        assert_eq!(event.name(), "webrtc_offer");
        match event {
            ClientEvent::Signal(s) => {
                assert_eq!(s.kind, SignalKind::Offer);
                assert_eq!(s.to, to);
                assert_eq!(s.payload, json!({"sdp": "v=0"}));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_signal_missing_blob() {
        let err = parse(json!({
            "event": "webrtc_answer",
            "data": {"to": UserId::new(Uuid::from_u128(9))}
        }))
        .unwrap_err();

        assert!(matches!(err, FrameError::InvalidPayload { event: "webrtc_answer", .. }));
    }

    #[test]
    fn test_unknown_event() {
        let err = parse(json!({"event": "teleport", "data": {}})).unwrap_err();
        assert_eq!(err, FrameError::UnknownEvent("teleport".to_string()));
    }

    #[test]
    fn test_invalid_payload() {
        let err = parse(json!({"event": "join_channel", "data": "not-a-uuid"})).unwrap_err();
        assert!(matches!(err, FrameError::InvalidPayload { event: "join_channel", .. }));
    }

    #[test]
    fn test_ping_needs_no_data() {
        assert_eq!(parse(json!({"event": "ping"})).unwrap(), ClientEvent::Ping);
    }
}
