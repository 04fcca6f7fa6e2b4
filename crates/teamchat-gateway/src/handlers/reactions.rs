//! Reaction handler

use teamchat_core::{DomainEvent, ReactionChangedEvent};

use super::messages::{message_meta, non_empty};
use super::ClientSession;
use crate::error::{GatewayError, GatewayResult};
use crate::protocol::ReactionPayload;

/// Handler for `add_reaction` and `remove_reaction`
pub struct ReactionHandler;

impl ReactionHandler {
    pub async fn add(session: &ClientSession, payload: ReactionPayload) -> GatewayResult<()> {
        Self::apply(session, payload, true).await
    }

    pub async fn remove(session: &ClientSession, payload: ReactionPayload) -> GatewayResult<()> {
        Self::apply(session, payload, false).await
    }

    async fn apply(session: &ClientSession, payload: ReactionPayload, added: bool) -> GatewayResult<()> {
        let user_id = session.user_id()?;
        let emoji = non_empty(&payload.emoji, "emoji")?;
        let collaborators = session.state().collaborators();

        let meta = message_meta(session, payload.message_id).await?;
        if !session
            .call("access", collaborators.access.can_access_channel(user_id, meta.channel_id))
            .await?
        {
            return Err(GatewayError::forbidden("Not a member of this channel"));
        }

        let store = &collaborators.messages;
        let reactions = if added {
            session
                .call("message store", store.add_reaction(user_id, meta.id, emoji))
                .await?
        } else {
            session
                .call("message store", store.remove_reaction(user_id, meta.id, emoji))
                .await?
        };

        let event = ReactionChangedEvent {
            channel_id: meta.channel_id,
            message_id: meta.id,
            reactions,
        };
        session
            .publish(if added {
                DomainEvent::ReactionAdded(event)
            } else {
                DomainEvent::ReactionRemoved(event)
            })
            .await
    }
}
