//! # teamchat-core
//!
//! Domain layer containing identifiers, room keys, domain events, and the
//! collaborator traits the real-time core consumes.
//! This crate has zero dependencies on infrastructure (database, web framework, etc.).

pub mod entities;
pub mod error;
pub mod events;
pub mod traits;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use entities::{EditedMessage, MessageMeta, ReactionSummary, StoredMessage, UserProfile};
pub use error::{CollaboratorError, CredentialError};
pub use events::{
    DomainEvent, HuddleLifecycleEvent, HuddleParticipantEvent, HuddleSettingsEvent,
    MessageCreatedEvent, MessageDeletedEvent, MessageEditedEvent, PresenceChange,
    PresenceChangedEvent, ReactionChangedEvent, ReplyCreatedEvent, SignalEvent, SignalKind,
    TypingEvent,
};
pub use traits::{
    AccessPolicy, CollabResult, CredentialVerifier, MembershipLookup, MessageStore,
    PresenceStore, UserDirectory, VerifiedCredential,
};
pub use value_objects::{
    ChannelId, ConnectionId, HuddleId, IdParseError, MessageId, PresenceStatus, RoomKey,
    RoomKeyParseError, StatusParseError, UserId, WorkspaceId,
};
