//! Hub commands
//!
//! Everything that mutates gateway state or reaches a connection travels as a
//! `HubCommand` through the hub's queue, and is applied in queue order.

use serde::Serialize;
use teamchat_core::{ChannelId, ConnectionId, HuddleId, PresenceStatus, RoomKey, WorkspaceId};
use tokio::sync::oneshot;

use crate::auth::UserIdentity;
use crate::broadcast::Envelope;
use crate::connection::ConnectionLink;
use crate::protocol::{HuddleSettingsPayload, ServerFrame};

/// Rooms a user belongs to, fetched from the membership collaborator
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Memberships {
    pub workspaces: Vec<WorkspaceId>,
    pub channels: Vec<ChannelId>,
}

/// Point-in-time counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HubStats {
    pub connections: usize,
    pub users: usize,
    pub online_users: usize,
    pub rooms: usize,
    pub timers: usize,
}

#[derive(Debug)]
pub enum HubCommand {
    /// A transport opened
    Connect {
        connection_id: ConnectionId,
        link: ConnectionLink,
    },
    /// Authentication succeeded; bind identity and seed subscriptions
    Identify {
        connection_id: ConnectionId,
        identity: UserIdentity,
        memberships: Memberships,
    },
    /// Subscribe to an already authorized room
    Join {
        connection_id: ConnectionId,
        room: RoomKey,
        ack: Option<ServerFrame>,
    },
    Leave {
        connection_id: ConnectionId,
        room: RoomKey,
        ack: Option<ServerFrame>,
    },
    Typing {
        connection_id: ConnectionId,
        channel_id: ChannelId,
        active: bool,
    },
    SetStatus {
        connection_id: ConnectionId,
        status: PresenceStatus,
        message: Option<String>,
    },
    HuddleJoin {
        connection_id: ConnectionId,
        huddle_id: HuddleId,
    },
    HuddleLeave {
        connection_id: ConnectionId,
        huddle_id: HuddleId,
    },
    HuddleSettings {
        connection_id: ConnectionId,
        settings: HuddleSettingsPayload,
    },
    /// Fan out an event; `origin` is the connection whose action produced it
    Publish {
        origin: Option<ConnectionId>,
        envelope: Envelope,
    },
    /// Send one frame to one connection
    Reply {
        connection_id: ConnectionId,
        frame: ServerFrame,
    },
    /// Inbound activity with nothing else to do
    Touch { connection_id: ConnectionId },
    /// The transport closed
    Disconnect { connection_id: ConnectionId },
    Stats { reply: oneshot::Sender<HubStats> },
}

impl HubCommand {
    /// Connection whose inbound activity produced the command
    pub fn origin(&self) -> Option<ConnectionId> {
        match self {
            Self::Identify { connection_id, .. }
            | Self::Join { connection_id, .. }
            | Self::Leave { connection_id, .. }
            | Self::Typing { connection_id, .. }
            | Self::SetStatus { connection_id, .. }
            | Self::HuddleJoin { connection_id, .. }
            | Self::HuddleLeave { connection_id, .. }
            | Self::HuddleSettings { connection_id, .. }
            | Self::Reply { connection_id, .. }
            | Self::Touch { connection_id } => Some(*connection_id),
            Self::Publish { origin, .. } => *origin,
            Self::Connect { .. } | Self::Disconnect { .. } | Self::Stats { .. } => None,
        }
    }

    /// Client event a rejection of this command is reported against
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Connect { .. } => "connect",
            Self::Identify { .. } => "authenticate",
            Self::Join { room, .. } => match room {
                RoomKey::Workspace(_) => "join_workspace",
                RoomKey::Huddle(_) => "huddle_join",
                _ => "join_channel",
            },
            Self::Leave { room, .. } => match room {
                RoomKey::Huddle(_) => "huddle_leave",
                _ => "leave_channel",
            },
            Self::Typing { active: true, .. } => "typing_start",
            Self::Typing { active: false, .. } => "typing_stop",
            Self::SetStatus { .. } => "update_status",
            Self::HuddleJoin { .. } => "huddle_join",
            Self::HuddleLeave { .. } => "huddle_leave",
            Self::HuddleSettings { .. } => "huddle_settings_update",
            Self::Publish { envelope, .. } => envelope.event.event_name(),
            Self::Reply { .. } => "reply",
            Self::Touch { .. } => "touch",
            Self::Disconnect { .. } => "disconnect",
            Self::Stats { .. } => "stats",
        }
    }
}
