//! Room handlers
//!
//! Explicit joins on top of the subscriptions seeded at authentication.

use teamchat_core::RoomKey;

use super::ClientSession;
use crate::error::{GatewayError, GatewayResult};
use crate::hub::HubCommand;
use crate::protocol::{ChannelRef, ServerFrame, WorkspaceRef};

/// Handler for `join_workspace`, `join_channel` and `leave_channel`
pub struct RoomHandler;

impl RoomHandler {
    pub async fn join_workspace(session: &ClientSession, payload: WorkspaceRef) -> GatewayResult<()> {
        let user_id = session.user_id()?;
        let workspace_id = payload.workspace_id;

        let access = &session.state().collaborators().access;
        if !session
            .call("access", access.is_workspace_member(user_id, workspace_id))
            .await?
        {
            return Err(GatewayError::forbidden("Not a member of this workspace"));
        }

        session
            .send(HubCommand::Join {
                connection_id: session.connection_id(),
                room: RoomKey::Workspace(workspace_id),
                ack: Some(ServerFrame::joined_workspace(workspace_id)),
            })
            .await
    }

    pub async fn join_channel(session: &ClientSession, payload: ChannelRef) -> GatewayResult<()> {
        let user_id = session.user_id()?;
        let channel_id = payload.channel_id;

        let access = &session.state().collaborators().access;
        if !session
            .call("access", access.can_access_channel(user_id, channel_id))
            .await?
        {
            return Err(GatewayError::forbidden("Cannot access this channel"));
        }

        session
            .send(HubCommand::Join {
                connection_id: session.connection_id(),
                room: RoomKey::Channel(channel_id),
                ack: Some(ServerFrame::joined_channel(channel_id)),
            })
            .await
    }

    /// Leaving needs no authorization
    pub async fn leave_channel(session: &ClientSession, payload: ChannelRef) -> GatewayResult<()> {
        session.user_id()?;

        session
            .send(HubCommand::Leave {
                connection_id: session.connection_id(),
                room: RoomKey::Channel(payload.channel_id),
                ack: Some(ServerFrame::left_channel(payload.channel_id)),
            })
            .await
    }
}
