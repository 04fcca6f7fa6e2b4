//! Domain events

mod domain_event;

pub use domain_event::{
    DomainEvent, HuddleLifecycleEvent, HuddleParticipantEvent, HuddleSettingsEvent,
    MessageCreatedEvent, MessageDeletedEvent, MessageEditedEvent, PresenceChange,
    PresenceChangedEvent, ReactionChangedEvent, ReplyCreatedEvent, SignalEvent, SignalKind,
    TypingEvent,
};
