//! External collaborators
//!
//! The gateway consumes membership, authorization, persistence, credential
//! and message-store services only through the traits in `teamchat_core`.
//! Every call is bounded by the configured collaborator timeout.

mod memory;

pub use memory::{
    ChannelSeed, DirectorySeed, HuddleSeed, InMemoryDirectory, PersistedPresence, WorkspaceSeed,
};

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use teamchat_core::{
    AccessPolicy, CollabResult, CredentialVerifier, MembershipLookup, MessageStore,
    PresenceStore, UserDirectory,
};

use crate::error::{GatewayError, GatewayResult};

/// The set of collaborators the gateway depends on
#[derive(Clone)]
pub struct Collaborators {
    pub membership: Arc<dyn MembershipLookup>,
    pub access: Arc<dyn AccessPolicy>,
    pub presence: Arc<dyn PresenceStore>,
    pub credentials: Arc<dyn CredentialVerifier>,
    pub users: Arc<dyn UserDirectory>,
    pub messages: Arc<dyn MessageStore>,
}

impl Collaborators {
    /// Back every port except credentials with one in-memory directory
    pub fn in_memory(
        directory: Arc<InMemoryDirectory>,
        credentials: Arc<dyn CredentialVerifier>,
    ) -> Self {
        Self {
            membership: directory.clone(),
            access: directory.clone(),
            presence: directory.clone(),
            credentials,
            users: directory.clone(),
            messages: directory,
        }
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

/// Await a collaborator call, failing with `CollaboratorTimeout` past `limit`
pub async fn bounded<T, F>(limit: Duration, collaborator: &'static str, call: F) -> GatewayResult<T>
where
    F: Future<Output = CollabResult<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result.map_err(GatewayError::from),
        Err(_) => {
            tracing::warn!(
                collaborator,
                timeout_ms = limit.as_millis() as u64,
                "Collaborator call timed out"
            );
            Err(GatewayError::CollaboratorTimeout(collaborator))
        }
    }
}
