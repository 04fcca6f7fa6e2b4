//! Connection registry
//!
//! All live connections keyed by id, with a reverse index from user to the
//! user's connections. Owned by the hub task, so plain maps suffice.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use teamchat_core::{ConnectionId, UserId};
use tokio::time::Instant;

use super::{Connection, ConnectionLink};
use crate::error::{GatewayError, GatewayResult};

#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: HashMap<ConnectionId, Connection>,
    by_user: HashMap<UserId, HashSet<ConnectionId>>,
}

impl ConnectionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fresh, anonymous connection
    pub fn register(&mut self, id: ConnectionId, link: ConnectionLink) -> GatewayResult<()> {
        if self.connections.contains_key(&id) {
            return Err(GatewayError::DuplicateConnection(id));
        }
        self.connections.insert(id, Connection::new(id, link));

        tracing::debug!(connection_id = %id, "Connection registered");
        Ok(())
    }

    /// Bind a connection to a user
    ///
    /// Re-authentication overwrites the previous identity; the previous user is
    /// returned so the caller can release what it held.
    pub fn attach_identity(
        &mut self,
        id: ConnectionId,
        user_id: UserId,
    ) -> GatewayResult<Option<UserId>> {
        let connection = self
            .connections
            .get_mut(&id)
            .ok_or(GatewayError::UnknownConnection(id))?;

        let previous = connection.user_id();
        if let Some(previous) = previous {
            remove_from_user(&mut self.by_user, previous, id);
        }
        connection.set_user_id(user_id);
        self.by_user.entry(user_id).or_default().insert(id);

        tracing::debug!(connection_id = %id, user_id = %user_id, "Connection authenticated");
        Ok(previous)
    }

    /// Remove a connection and return its user, if it had one
    ///
    /// A no-op for unknown ids: transports may report a close more than once.
    pub fn remove(&mut self, id: ConnectionId) -> Option<UserId> {
        let connection = self.connections.remove(&id)?;
        let user_id = connection.user_id();
        if let Some(user_id) = user_id {
            remove_from_user(&mut self.by_user, user_id, id);
        }

        tracing::debug!(connection_id = %id, "Connection removed");
        user_id
    }

    pub fn get(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&id)
    }

    pub fn get_mut(&mut self, id: ConnectionId) -> Option<&mut Connection> {
        self.connections.get_mut(&id)
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.connections.contains_key(&id)
    }

    /// Authenticated user of a connection
    pub fn user_of(&self, id: ConnectionId) -> Option<UserId> {
        self.connections.get(&id).and_then(Connection::user_id)
    }

    /// Every connection the user currently holds
    pub fn connections_for(&self, user_id: UserId) -> Vec<ConnectionId> {
        self.by_user
            .get(&user_id)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn is_user_connected(&self, user_id: UserId) -> bool {
        self.by_user.contains_key(&user_id)
    }

    /// Connections with no inbound activity for at least `idle`
    pub fn idle_connections(&self, now: Instant, idle: Duration) -> Vec<ConnectionId> {
        self.connections
            .values()
            .filter(|c| now.saturating_duration_since(c.last_activity()) >= idle)
            .map(Connection::id)
            .collect()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn user_count(&self) -> usize {
        self.by_user.len()
    }
}

fn remove_from_user(
    by_user: &mut HashMap<UserId, HashSet<ConnectionId>>,
    user_id: UserId,
    id: ConnectionId,
) {
    if let Some(ids) = by_user.get_mut(&user_id) {
        ids.remove(&id);
        if ids.is_empty() {
            by_user.remove(&user_id);
        }
    }
}
