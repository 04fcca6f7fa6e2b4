//! Typing indicator handler

use super::ClientSession;
use crate::error::GatewayResult;
use crate::hub::HubCommand;
use crate::protocol::ChannelRef;

/// Handler for `typing_start` and `typing_stop`
///
/// Membership is not re-checked here: the hub only honours typing in channels
/// the connection is subscribed to, and owns the auto-clear timer.
pub struct TypingHandler;

impl TypingHandler {
    pub async fn handle(session: &ClientSession, payload: ChannelRef, active: bool) -> GatewayResult<()> {
        session.user_id()?;

        session
            .send(HubCommand::Typing {
                connection_id: session.connection_id(),
                channel_id: payload.channel_id,
                active,
            })
            .await
    }
}
