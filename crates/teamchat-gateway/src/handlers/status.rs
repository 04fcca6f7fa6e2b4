//! Status handler

use teamchat_core::{PresenceStatus, StatusParseError};

use super::ClientSession;
use crate::error::GatewayResult;
use crate::hub::HubCommand;
use crate::protocol::StatusPayload;

/// Handler for `update_status`
///
/// The hub applies the change, persists it and announces it to the user's
/// workspaces.
pub struct StatusHandler;

impl StatusHandler {
    pub async fn handle(session: &ClientSession, payload: StatusPayload) -> GatewayResult<()> {
        session.user_id()?;

        let status: PresenceStatus = payload.status.parse()?;
        if !status.is_user_selectable() {
            return Err(StatusParseError(payload.status).into());
        }

        let message = payload
            .status_message
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty());

        session
            .send(HubCommand::SetStatus {
                connection_id: session.connection_id(),
                status,
                message,
            })
            .await
    }
}
