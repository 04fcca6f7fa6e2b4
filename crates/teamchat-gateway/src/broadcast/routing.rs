//! Room resolution rules
//!
//! One table deciding, per event kind, which rooms receive it and whose
//! connections are excluded.

use teamchat_core::{DomainEvent, RoomKey, UserId};

/// Rooms an event is delivered to
///
/// Duplicates are possible when an event names overlapping rooms; the router
/// delivers once per connection regardless.
pub fn target_rooms(event: &DomainEvent) -> Vec<RoomKey> {
    match event {
        DomainEvent::MessageCreated(e) => vec![RoomKey::Channel(e.channel_id)],
        DomainEvent::ReplyCreated(e) => vec![RoomKey::User(e.parent_author_id)],
        DomainEvent::MessageEdited(e) => vec![RoomKey::Channel(e.channel_id)],
        DomainEvent::MessageDeleted(e) => vec![RoomKey::Channel(e.channel_id)],
        DomainEvent::ReactionAdded(e) | DomainEvent::ReactionRemoved(e) => {
            vec![RoomKey::Channel(e.channel_id)]
        }
        DomainEvent::TypingStarted(e) | DomainEvent::TypingStopped(e) => {
            vec![RoomKey::Channel(e.channel_id)]
        }
        DomainEvent::PresenceChanged(e) => {
            e.workspaces.iter().copied().map(RoomKey::Workspace).collect()
        }
        DomainEvent::HuddleStarted(e) => vec![RoomKey::Channel(e.channel_id)],
        DomainEvent::HuddleEnded(e) => {
            vec![RoomKey::Channel(e.channel_id), RoomKey::Huddle(e.huddle_id)]
        }
        DomainEvent::HuddleParticipantJoined(e) | DomainEvent::HuddleParticipantLeft(e) => {
            vec![RoomKey::Huddle(e.huddle_id)]
        }
        DomainEvent::HuddleSettingsUpdated(e) => vec![RoomKey::Huddle(e.huddle_id)],
        DomainEvent::Signal(e) => vec![RoomKey::User(e.to)],
    }
}

/// User whose connections never receive the event
pub fn excluded_user(event: &DomainEvent) -> Option<UserId> {
    match event {
        DomainEvent::TypingStarted(e) | DomainEvent::TypingStopped(e) => Some(e.user_id),
        _ => None,
    }
}
