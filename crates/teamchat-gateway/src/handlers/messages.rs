//! Message handlers
//!
//! Persist through the message store, then fan out to the channel room.

use teamchat_core::{
    CollaboratorError, DomainEvent, MessageCreatedEvent, MessageDeletedEvent, MessageEditedEvent,
    MessageId, MessageMeta, ReplyCreatedEvent,
};

use super::ClientSession;
use crate::error::{GatewayError, GatewayResult};
use crate::protocol::{EditMessagePayload, MessageRef, SendMessagePayload};

/// Handler for `send_message`, `edit_message` and `delete_message`
pub struct MessageHandler;

impl MessageHandler {
    pub async fn send(session: &ClientSession, payload: SendMessagePayload) -> GatewayResult<()> {
        let user_id = session.user_id()?;
        let content = non_empty(&payload.content, "content")?;
        let channel_id = payload.channel_id;

        let collaborators = session.state().collaborators();
        if !session
            .call("access", collaborators.access.can_access_channel(user_id, channel_id))
            .await?
        {
            return Err(GatewayError::forbidden("Not a member of this channel"));
        }

        let stored = session
            .call(
                "message store",
                collaborators.messages.create_message(
                    user_id,
                    channel_id,
                    content,
                    payload.parent_message_id,
                ),
            )
            .await?;

        tracing::debug!(
            user_id = %user_id,
            channel_id = %channel_id,
            message_id = %stored.id,
            "Message created"
        );

        session
            .publish(DomainEvent::MessageCreated(MessageCreatedEvent {
                channel_id: stored.channel_id,
                message: stored.body.clone(),
            }))
            .await?;

        // Thread replies also notify the parent's author directly
        if let (Some(parent_message_id), Some(parent_author_id)) =
            (payload.parent_message_id, stored.parent_author_id)
        {
            if parent_author_id != user_id {
                session
                    .publish(DomainEvent::ReplyCreated(ReplyCreatedEvent {
                        channel_id: stored.channel_id,
                        parent_message_id,
                        parent_author_id,
                        reply: stored.body,
                    }))
                    .await?;
            }
        }

        Ok(())
    }

    pub async fn edit(session: &ClientSession, payload: EditMessagePayload) -> GatewayResult<()> {
        let user_id = session.user_id()?;
        let content = non_empty(&payload.content, "content")?;

        let meta = message_meta(session, payload.message_id).await?;
        if meta.author_id != user_id {
            return Err(GatewayError::forbidden("Only the author can edit this message"));
        }

        let edited = session
            .call(
                "message store",
                session
                    .state()
                    .collaborators()
                    .messages
                    .update_message(meta.id, content),
            )
            .await?;

        session
            .publish(DomainEvent::MessageEdited(MessageEditedEvent {
                channel_id: edited.channel_id,
                message_id: edited.id,
                content: edited.content,
                edited_at: edited.edited_at,
            }))
            .await
    }

    /// Authors delete their own messages; channel admins delete anyone's
    pub async fn delete(session: &ClientSession, payload: MessageRef) -> GatewayResult<()> {
        let user_id = session.user_id()?;
        let collaborators = session.state().collaborators();

        let meta = message_meta(session, payload.message_id).await?;
        if meta.author_id != user_id
            && !session
                .call("access", collaborators.access.is_channel_admin(user_id, meta.channel_id))
                .await?
        {
            return Err(GatewayError::forbidden("Cannot delete this message"));
        }

        session
            .call("message store", collaborators.messages.delete_message(meta.id))
            .await?;

        session
            .publish(DomainEvent::MessageDeleted(MessageDeletedEvent {
                channel_id: meta.channel_id,
                message_id: meta.id,
            }))
            .await
    }
}

/// Look up a live message or fail with `NOT_FOUND`
pub(super) async fn message_meta(
    session: &ClientSession,
    message_id: MessageId,
) -> GatewayResult<MessageMeta> {
    session
        .call(
            "message store",
            session.state().collaborators().messages.message_meta(message_id),
        )
        .await?
        .ok_or_else(|| CollaboratorError::not_found("Message", message_id).into())
}

pub(super) fn non_empty<'a>(value: &'a str, field: &str) -> GatewayResult<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(GatewayError::InvalidPayload(format!("{field} must not be empty")));
    }
    Ok(trimmed)
}
