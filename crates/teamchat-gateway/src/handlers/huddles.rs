//! Huddle handlers

use super::ClientSession;
use crate::error::{GatewayError, GatewayResult};
use crate::hub::HubCommand;
use crate::protocol::{HuddleRef, HuddleSettingsPayload};

/// Handler for `huddle_join`, `huddle_leave` and `huddle_settings_update`
pub struct HuddleHandler;

impl HuddleHandler {
    pub async fn join(session: &ClientSession, payload: HuddleRef) -> GatewayResult<()> {
        let user_id = session.user_id()?;

        let access = &session.state().collaborators().access;
        if !session
            .call("access", access.can_join_huddle(user_id, payload.huddle_id))
            .await?
        {
            return Err(GatewayError::forbidden("Cannot join this huddle"));
        }

        session
            .send(HubCommand::HuddleJoin {
                connection_id: session.connection_id(),
                huddle_id: payload.huddle_id,
            })
            .await
    }

    pub async fn leave(session: &ClientSession, payload: HuddleRef) -> GatewayResult<()> {
        session.user_id()?;

        session
            .send(HubCommand::HuddleLeave {
                connection_id: session.connection_id(),
                huddle_id: payload.huddle_id,
            })
            .await
    }

    pub async fn update_settings(
        session: &ClientSession,
        payload: HuddleSettingsPayload,
    ) -> GatewayResult<()> {
        session.user_id()?;

        session
            .send(HubCommand::HuddleSettings {
                connection_id: session.connection_id(),
                settings: payload,
            })
            .await
    }
}
