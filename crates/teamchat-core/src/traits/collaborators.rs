//! Collaborator traits (ports) - the narrow interfaces the real-time core
//! consumes from the rest of the application
//!
//! The core defines what it needs; the persistence and auth layers provide
//! the implementation. Every async call made through these ports is bounded by
//! a timeout on the caller's side.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::entities::{EditedMessage, MessageMeta, ReactionSummary, StoredMessage, UserProfile};
use crate::error::{CollaboratorError, CredentialError};
use crate::value_objects::{ChannelId, HuddleId, MessageId, PresenceStatus, UserId, WorkspaceId};

/// Result type for collaborator calls
pub type CollabResult<T> = Result<T, CollaboratorError>;

// ============================================================================
// Membership Lookup
// ============================================================================

/// Seeds room subscriptions at connect time
#[async_trait]
pub trait MembershipLookup: Send + Sync {
    /// Workspaces the user is an active member of
    async fn workspaces_of(&self, user_id: UserId) -> CollabResult<HashSet<WorkspaceId>>;

    /// Channels the user is a member of
    async fn channels_of(&self, user_id: UserId) -> CollabResult<HashSet<ChannelId>>;
}

// ============================================================================
// Authorization
// ============================================================================

/// Consulted before honoring join/leave and admin-only actions
#[async_trait]
pub trait AccessPolicy: Send + Sync {
    /// Public channels are open to workspace members; private ones need membership
    async fn can_access_channel(&self, user_id: UserId, channel_id: ChannelId) -> CollabResult<bool>;

    async fn is_channel_admin(&self, user_id: UserId, channel_id: ChannelId) -> CollabResult<bool>;

    async fn is_workspace_member(
        &self,
        user_id: UserId,
        workspace_id: WorkspaceId,
    ) -> CollabResult<bool>;

    async fn can_join_huddle(&self, user_id: UserId, huddle_id: HuddleId) -> CollabResult<bool>;
}

// ============================================================================
// Presence Persistence
// ============================================================================

/// Durable presence fields (best-effort, never transactional with memory)
#[async_trait]
pub trait PresenceStore: Send + Sync {
    async fn set_online(&self, user_id: UserId, online: bool) -> CollabResult<()>;

    async fn set_last_seen(&self, user_id: UserId, at: DateTime<Utc>) -> CollabResult<()>;

    async fn set_status(
        &self,
        user_id: UserId,
        status: PresenceStatus,
        message: Option<&str>,
    ) -> CollabResult<()>;
}

// ============================================================================
// Credentials and Users
// ============================================================================

/// Identity extracted from a verified bearer credential
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifiedCredential {
    pub user_id: UserId,
    pub expires_at: DateTime<Utc>,
}

/// Verifies signature and expiry of a bearer token
pub trait CredentialVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<VerifiedCredential, CredentialError>;
}

/// Resolves user profiles
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// `None` when the user no longer exists
    async fn find_user(&self, user_id: UserId) -> CollabResult<Option<UserProfile>>;
}

// ============================================================================
// Message Store
// ============================================================================

/// Durable message log; the system of record clients resync against
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn message_meta(&self, message_id: MessageId) -> CollabResult<Option<MessageMeta>>;

    async fn create_message(
        &self,
        author_id: UserId,
        channel_id: ChannelId,
        content: &str,
        parent_message_id: Option<MessageId>,
    ) -> CollabResult<StoredMessage>;

    async fn update_message(&self, message_id: MessageId, content: &str)
        -> CollabResult<EditedMessage>;

    /// Soft delete
    async fn delete_message(&self, message_id: MessageId) -> CollabResult<()>;

    /// Idempotent; returns the message's reactions after the change
    async fn add_reaction(
        &self,
        user_id: UserId,
        message_id: MessageId,
        emoji: &str,
    ) -> CollabResult<Vec<ReactionSummary>>;

    async fn remove_reaction(
        &self,
        user_id: UserId,
        message_id: MessageId,
        emoji: &str,
    ) -> CollabResult<Vec<ReactionSummary>>;
}
