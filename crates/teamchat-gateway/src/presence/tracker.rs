//! Presence tracker
//!
//! Per-user state machine driven by connection attach/detach:
//!
//! ```text
//! offline ──attach──▶ online ◀──attach── offline-pending
//!                       │                     │
//!                       └──last detach──▶ ────┘──grace expired──▶ offline
//! ```
//!
//! The grace timer itself is owned by the hub; the tracker only reports when
//! one must be armed or cancelled.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use teamchat_core::{
    ConnectionId, PresenceChange, PresenceChangedEvent, PresenceStatus, StatusParseError, UserId,
    UserProfile, WorkspaceId,
};

use crate::error::{GatewayError, GatewayResult};

/// Presence record of one known user
#[derive(Debug, Clone)]
pub struct UserPresence {
    pub user_id: UserId,
    pub connections: HashSet<ConnectionId>,
    pub status: PresenceStatus,
    /// Status the user picked; restored when a pending offline is cancelled
    pub selected: PresenceStatus,
    pub status_message: Option<String>,
    pub last_transition: DateTime<Utc>,
    /// Workspaces whose members see this user's presence
    pub workspaces: Vec<WorkspaceId>,
    pub profile: Option<UserProfile>,
}

impl UserPresence {
    fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            connections: HashSet::new(),
            status: PresenceStatus::Online,
            selected: PresenceStatus::Online,
            status_message: None,
            last_transition: Utc::now(),
            workspaces: Vec::new(),
            profile: None,
        }
    }

    fn add_workspace(&mut self, workspace_id: WorkspaceId) -> bool {
        if self.workspaces.contains(&workspace_id) {
            return false;
        }
        self.workspaces.push(workspace_id);
        true
    }

    fn event(&self, change: PresenceChange) -> PresenceChangedEvent {
        PresenceChangedEvent {
            user_id: self.user_id,
            change,
            status: self.status,
            status_message: self.status_message.clone(),
            last_seen: (change == PresenceChange::WentOffline).then_some(self.last_transition),
            user: self.profile.clone(),
            workspaces: self.workspaces.clone(),
        }
    }
}

/// What an attach or detach did
#[derive(Debug, Clone)]
pub enum PresenceUpdate {
    /// Visible transition; broadcast and persist it
    Changed(PresenceChangedEvent),
    /// Last connection left; arm the grace timer
    GraceStarted,
    /// A connection came back during the grace window; cancel the timer
    GraceCancelled,
    Unchanged,
}

/// Context captured when a connection is attached
#[derive(Debug, Clone, Default)]
pub struct AttachContext {
    pub profile: Option<UserProfile>,
    pub workspaces: Vec<WorkspaceId>,
}

#[derive(Debug, Default)]
pub struct PresenceTracker {
    users: HashMap<UserId, UserPresence>,
}

impl PresenceTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_connection_attached(
        &mut self,
        user_id: UserId,
        connection_id: ConnectionId,
        context: AttachContext,
    ) -> PresenceUpdate {
        let mut created = false;
        let record = self.users.entry(user_id).or_insert_with(|| {
            created = true;
            UserPresence::new(user_id)
        });

        record.connections.insert(connection_id);
        if context.profile.is_some() {
            record.profile = context.profile;
        }
        for workspace_id in context.workspaces {
            record.add_workspace(workspace_id);
        }

        if created {
            tracing::debug!(user_id = %user_id, "Presence: offline -> online");
            return PresenceUpdate::Changed(record.event(PresenceChange::CameOnline));
        }

        if record.status == PresenceStatus::OfflinePending {
            record.status = record.selected;
            record.last_transition = Utc::now();
            tracing::debug!(user_id = %user_id, "Presence: reconnected within grace period");
            return PresenceUpdate::GraceCancelled;
        }

        PresenceUpdate::Unchanged
    }

    pub fn on_connection_detached(
        &mut self,
        user_id: UserId,
        connection_id: ConnectionId,
    ) -> PresenceUpdate {
        let Some(record) = self.users.get_mut(&user_id) else {
            return PresenceUpdate::Unchanged;
        };
        if !record.connections.remove(&connection_id) || !record.connections.is_empty() {
            return PresenceUpdate::Unchanged;
        }

        record.status = PresenceStatus::OfflinePending;
        record.last_transition = Utc::now();
        tracing::debug!(user_id = %user_id, "Presence: online -> offline-pending");
        PresenceUpdate::GraceStarted
    }

    /// The grace timer fired
    ///
    /// Emits the offline transition only if the user is still without
    /// connections; the record is dropped.
    pub fn grace_expired(&mut self, user_id: UserId) -> Option<PresenceChangedEvent> {
        let record = self.users.get(&user_id)?;
        if record.status != PresenceStatus::OfflinePending || !record.connections.is_empty() {
            return None;
        }

        let mut record = self.users.remove(&user_id)?;
        record.status = PresenceStatus::Offline;
        record.last_transition = Utc::now();

        tracing::debug!(user_id = %user_id, "Presence: offline-pending -> offline");
        Some(record.event(PresenceChange::WentOffline))
    }

    /// Explicit status change by a connected user
    pub fn set_status(
        &mut self,
        user_id: UserId,
        status: PresenceStatus,
        message: Option<String>,
    ) -> GatewayResult<PresenceChangedEvent> {
        if !status.is_user_selectable() {
            return Err(StatusParseError(status.to_string()).into());
        }
        let record = self
            .users
            .get_mut(&user_id)
            .filter(|r| r.status.is_connected())
            .ok_or(GatewayError::UnknownUser(user_id))?;

        record.status = status;
        record.selected = status;
        record.status_message = message;
        record.last_transition = Utc::now();

        tracing::debug!(user_id = %user_id, status = %status, "Presence: status changed");
        Ok(record.event(PresenceChange::StatusChanged))
    }

    /// Widen the rooms that see this user's presence after an explicit join
    ///
    /// Returns `false` for unknown users and already-known workspaces.
    pub fn add_workspace(&mut self, user_id: UserId, workspace_id: WorkspaceId) -> bool {
        self.users
            .get_mut(&user_id)
            .is_some_and(|record| record.add_workspace(workspace_id))
    }

    /// Effective status; `Offline` for unknown users
    pub fn status_of(&self, user_id: UserId) -> PresenceStatus {
        self.users
            .get(&user_id)
            .map_or(PresenceStatus::Offline, |r| r.status)
    }

    pub fn get(&self, user_id: UserId) -> Option<&UserPresence> {
        self.users.get(&user_id)
    }

    pub fn profile_of(&self, user_id: UserId) -> Option<&UserProfile> {
        self.users.get(&user_id).and_then(|r| r.profile.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = &UserPresence> {
        self.users.values()
    }

    /// Users with at least one live connection
    pub fn online_count(&self) -> usize {
        self.users
            .values()
            .filter(|r| !r.connections.is_empty())
            .count()
    }
}
