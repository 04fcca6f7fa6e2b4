//! The hub
//!
//! Single owner of the connection registry, the room index and the presence
//! tracker. Every mutation and every dispatch is one synchronous step on
//! `&mut Hub`, so a disconnect (registry removal, `unsubscribe_all`, presence
//! detach) can never interleave with a subscribe or a dispatch touching the
//! same connection.

use std::time::Duration;

use chrono::Utc;
use teamchat_common::RealtimeConfig;
use teamchat_core::{
    ChannelId, ConnectionId, DomainEvent, HuddleId, HuddleParticipantEvent, HuddleSettingsEvent,
    PresenceChangedEvent, PresenceStatus, RoomKey, TypingEvent, UserId, UserProfile,
};
use tokio::time::Instant;

use super::command::{HubCommand, HubStats, Memberships};
use super::persistence::PresenceWriter;
use super::timers::{TimerFired, TimerKey, Timers};
use crate::auth::UserIdentity;
use crate::broadcast::{DispatchReport, Envelope, EventRouter};
use crate::connection::{ConnectionLink, ConnectionRegistry};
use crate::error::{GatewayError, GatewayResult};
use crate::presence::{AttachContext, PresenceTracker, PresenceUpdate};
use crate::protocol::{CloseCode, HuddleSettingsPayload, ServerFrame};
use crate::rooms::RoomIndex;

/// Timing knobs the hub needs
#[derive(Debug, Clone, Copy)]
pub struct HubSettings {
    pub presence_grace: Duration,
    pub typing_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_dropped_events: u32,
}

impl From<&RealtimeConfig> for HubSettings {
    fn from(config: &RealtimeConfig) -> Self {
        Self {
            presence_grace: config.presence_grace,
            typing_timeout: config.typing_timeout,
            idle_timeout: config.idle_timeout,
            max_dropped_events: config.max_dropped_events,
        }
    }
}

pub struct Hub {
    settings: HubSettings,
    registry: ConnectionRegistry,
    rooms: RoomIndex,
    presence: PresenceTracker,
    router: EventRouter,
    timers: Timers,
    writer: PresenceWriter,
}

impl Hub {
    pub fn new(settings: HubSettings, timers: Timers, writer: PresenceWriter) -> Self {
        Self {
            settings,
            registry: ConnectionRegistry::new(),
            rooms: RoomIndex::new(),
            presence: PresenceTracker::new(),
            router: EventRouter::new(settings.max_dropped_events),
            timers,
            writer,
        }
    }

    pub fn settings(&self) -> &HubSettings {
        &self.settings
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn rooms(&self) -> &RoomIndex {
        &self.rooms
    }

    pub fn presence(&self) -> &PresenceTracker {
        &self.presence
    }

    pub fn stats(&self) -> HubStats {
        HubStats {
            connections: self.registry.connection_count(),
            users: self.registry.user_count(),
            online_users: self.presence.online_count(),
            rooms: self.rooms.room_count(),
            timers: self.timers.armed_count(),
        }
    }

    /// Apply one command
    pub fn handle(&mut self, command: HubCommand) {
        let origin = command.origin();
        if let Some(connection) = origin.and_then(|id| self.registry.get_mut(id)) {
            connection.touch();
        }

        let event = command.event_name();
        let result = match command {
            HubCommand::Connect {
                connection_id,
                link,
            } => {
                self.connect(connection_id, link);
                Ok(())
            }
            HubCommand::Identify {
                connection_id,
                identity,
                memberships,
            } => self.identify(connection_id, identity, memberships),
            HubCommand::Join {
                connection_id,
                room,
                ack,
            } => self.join(connection_id, room, ack),
            HubCommand::Leave {
                connection_id,
                room,
                ack,
            } => self.leave(connection_id, room, ack),
            HubCommand::Typing {
                connection_id,
                channel_id,
                active,
            } => self.typing(connection_id, channel_id, active),
            HubCommand::SetStatus {
                connection_id,
                status,
                message,
            } => self.set_status(connection_id, status, message),
            HubCommand::HuddleJoin {
                connection_id,
                huddle_id,
            } => self.huddle_join(connection_id, huddle_id),
            HubCommand::HuddleLeave {
                connection_id,
                huddle_id,
            } => self.huddle_leave(connection_id, huddle_id),
            HubCommand::HuddleSettings {
                connection_id,
                settings,
            } => self.huddle_settings(connection_id, settings),
            HubCommand::Publish { envelope, .. } => {
                self.publish(&envelope);
                Ok(())
            }
            HubCommand::Reply {
                connection_id,
                frame,
            } => {
                self.send_to(connection_id, &frame);
                Ok(())
            }
            HubCommand::Touch { .. } => Ok(()),
            HubCommand::Disconnect { connection_id } => {
                self.disconnect(connection_id);
                Ok(())
            }
            HubCommand::Stats { reply } => {
                let _ = reply.send(self.stats());
                Ok(())
            }
        };

        if let Err(e) = result {
            self.reject(origin, event, &e);
        }
    }

    /// A timer elapsed
    pub fn on_timer(&mut self, fired: TimerFired) {
        if !self.timers.take_if_current(fired) {
            tracing::trace!(key = ?fired.key, "Stale timer ignored");
            return;
        }

        match fired.key {
            TimerKey::PresenceGrace(user_id) => {
                if let Some(event) = self.presence.grace_expired(user_id) {
                    self.announce_presence(event);
                }
            }
            TimerKey::Typing {
                channel_id,
                user_id,
            } => {
                let profile = self.presence.profile_of(user_id);
                let event = TypingEvent::new(channel_id, user_id, profile);
                self.publish(&Envelope::new(DomainEvent::TypingStopped(event)));
            }
        }
    }

    /// Close connections without inbound activity for the idle timeout
    pub fn sweep_idle(&mut self, now: Instant) {
        for connection_id in self
            .registry
            .idle_connections(now, self.settings.idle_timeout)
        {
            tracing::info!(connection_id = %connection_id, "Closing idle connection");
            self.evict(connection_id, CloseCode::IdleTimeout);
        }
    }

    // ------------------------------------------------------------------------
    // Connection lifecycle
    // ------------------------------------------------------------------------

    fn connect(&mut self, connection_id: ConnectionId, link: ConnectionLink) {
        let closer = link.closer();
        if let Err(e) = self.registry.register(connection_id, link) {
            tracing::error!(connection_id = %connection_id, error = %e, "Failed to register connection");
            let _ = closer.try_send(CloseCode::UnknownError);
            return;
        }

        tracing::info!(connection_id = %connection_id, "Connection opened");
        self.send_to(
            connection_id,
            &ServerFrame::hello(connection_id, self.settings.idle_timeout),
        );
    }

    fn identify(
        &mut self,
        connection_id: ConnectionId,
        identity: UserIdentity,
        memberships: Memberships,
    ) -> GatewayResult<()> {
        let user_id = identity.user_id;
        let previous = self.registry.attach_identity(connection_id, user_id)?;

        // Another identity's rooms go; the same identity keeps what it joined
        if let Some(previous) = previous.filter(|p| *p != user_id) {
            let released = self.rooms.unsubscribe_all(connection_id);
            self.leave_huddles(previous, &released);
            let update = self.presence.on_connection_detached(previous, connection_id);
            self.apply_presence(previous, update);
        }

        let Memberships {
            workspaces,
            channels,
        } = memberships;
        self.rooms.subscribe(connection_id, RoomKey::User(user_id));
        for workspace_id in &workspaces {
            self.rooms.subscribe(connection_id, RoomKey::Workspace(*workspace_id));
        }
        for channel_id in &channels {
            self.rooms.subscribe(connection_id, RoomKey::Channel(*channel_id));
        }

        self.send_to(
            connection_id,
            &ServerFrame::authenticated(&identity.profile, &workspaces, &channels),
        );
        if !self.registry.contains(connection_id) {
            // Evicted while queueing the acknowledgement
            return Ok(());
        }

        tracing::info!(
            connection_id = %connection_id,
            user_id = %user_id,
            workspaces = workspaces.len(),
            channels = channels.len(),
            "Connection identified"
        );

        let update = self.presence.on_connection_attached(
            user_id,
            connection_id,
            AttachContext {
                profile: Some(identity.profile),
                workspaces,
            },
        );
        self.apply_presence(user_id, update);
        Ok(())
    }

    /// Registry removal, room release and presence detach as one step
    ///
    /// A no-op for connections already gone.
    pub fn disconnect(&mut self, connection_id: ConnectionId) {
        if !self.registry.contains(connection_id) {
            return;
        }

        let lifetime = self
            .registry
            .get(connection_id)
            .map(|c| (Utc::now() - c.created_at()).num_seconds());
        let user_id = self.registry.remove(connection_id);
        let rooms = self.rooms.unsubscribe_all(connection_id);
        tracing::info!(
            connection_id = %connection_id,
            user_id = ?user_id,
            rooms = rooms.len(),
            lifetime_secs = ?lifetime,
            "Connection closed"
        );

        if let Some(user_id) = user_id {
            let update = self.presence.on_connection_detached(user_id, connection_id);
            self.apply_presence(user_id, update);
        }
    }

    fn evict(&mut self, connection_id: ConnectionId, code: CloseCode) {
        if let Some(connection) = self.registry.get(connection_id) {
            connection.close(code);
        }
        self.disconnect(connection_id);
    }

    // ------------------------------------------------------------------------
    // Rooms
    // ------------------------------------------------------------------------

    fn require_user(&self, connection_id: ConnectionId) -> GatewayResult<UserId> {
        if !self.registry.contains(connection_id) {
            return Err(GatewayError::UnknownConnection(connection_id));
        }
        self.registry
            .user_of(connection_id)
            .ok_or(GatewayError::NotAuthenticated)
    }

    fn require_subscribed(&self, connection_id: ConnectionId, room: RoomKey) -> GatewayResult<()> {
        if self.rooms.is_subscribed(connection_id, &room) {
            Ok(())
        } else {
            Err(GatewayError::UnknownRoom(room))
        }
    }

    fn join(
        &mut self,
        connection_id: ConnectionId,
        room: RoomKey,
        ack: Option<ServerFrame>,
    ) -> GatewayResult<()> {
        let user_id = self.require_user(connection_id)?;
        self.rooms.subscribe(connection_id, room);
        if let RoomKey::Workspace(workspace_id) = room {
            self.presence.add_workspace(user_id, workspace_id);
        }
        if let Some(ack) = ack {
            self.send_to(connection_id, &ack);
        }
        Ok(())
    }

    fn leave(
        &mut self,
        connection_id: ConnectionId,
        room: RoomKey,
        ack: Option<ServerFrame>,
    ) -> GatewayResult<()> {
        self.require_user(connection_id)?;
        self.rooms.unsubscribe(connection_id, room);
        if let Some(ack) = ack {
            self.send_to(connection_id, &ack);
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Typing and status
    // ------------------------------------------------------------------------

    fn typing(
        &mut self,
        connection_id: ConnectionId,
        channel_id: ChannelId,
        active: bool,
    ) -> GatewayResult<()> {
        let user_id = self.require_user(connection_id)?;
        self.require_subscribed(connection_id, RoomKey::Channel(channel_id))?;

        let key = TimerKey::Typing {
            channel_id,
            user_id,
        };
        let event = TypingEvent::new(channel_id, user_id, self.presence.profile_of(user_id));
        let event = if active {
            self.timers.arm(key, self.settings.typing_timeout);
            DomainEvent::TypingStarted(event)
        } else {
            self.timers.cancel(key);
            DomainEvent::TypingStopped(event)
        };

        self.publish(&Envelope::new(event));
        Ok(())
    }

    fn set_status(
        &mut self,
        connection_id: ConnectionId,
        status: PresenceStatus,
        message: Option<String>,
    ) -> GatewayResult<()> {
        let user_id = self.require_user(connection_id)?;
        let event = self.presence.set_status(user_id, status, message)?;
        self.announce_presence(event);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Huddles
    // ------------------------------------------------------------------------

    fn huddle_join(&mut self, connection_id: ConnectionId, huddle_id: HuddleId) -> GatewayResult<()> {
        let user_id = self.require_user(connection_id)?;
        if !self.rooms.subscribe(connection_id, RoomKey::Huddle(huddle_id)) {
            return Ok(());
        }

        let event = HuddleParticipantEvent {
            huddle_id,
            user_id,
            user: self.presence.profile_of(user_id).cloned(),
            participants: self.huddle_roster(huddle_id),
        };
        self.publish(&Envelope::new(DomainEvent::HuddleParticipantJoined(event)));
        Ok(())
    }

    fn huddle_leave(&mut self, connection_id: ConnectionId, huddle_id: HuddleId) -> GatewayResult<()> {
        let user_id = self.require_user(connection_id)?;
        let room = RoomKey::Huddle(huddle_id);
        self.require_subscribed(connection_id, room)?;

        self.rooms.unsubscribe(connection_id, room);
        self.announce_huddle_left(huddle_id, user_id);
        Ok(())
    }

    fn announce_huddle_left(&mut self, huddle_id: HuddleId, user_id: UserId) {
        let event = HuddleParticipantEvent {
            huddle_id,
            user_id,
            user: None,
            participants: Vec::new(),
        };
        self.publish(&Envelope::new(DomainEvent::HuddleParticipantLeft(event)));
    }

    /// Announce departures from the huddles among `released`
    fn leave_huddles(&mut self, user_id: UserId, released: &[RoomKey]) {
        for room in released {
            if let RoomKey::Huddle(huddle_id) = *room {
                self.announce_huddle_left(huddle_id, user_id);
            }
        }
    }

    /// Profiles of the distinct users subscribed to a huddle, ordered by id
    fn huddle_roster(&self, huddle_id: HuddleId) -> Vec<UserProfile> {
        let mut users: Vec<UserId> = self
            .rooms
            .subscribers_of(&RoomKey::Huddle(huddle_id))
            .filter_map(|id| self.registry.user_of(id))
            .collect();
        users.sort_unstable();
        users.dedup();
        users
            .into_iter()
            .map(|user_id| {
                self.presence
                    .profile_of(user_id)
                    .cloned()
                    .unwrap_or_else(|| UserProfile::new(user_id, user_id.to_string()))
            })
            .collect()
    }

    fn huddle_settings(
        &mut self,
        connection_id: ConnectionId,
        settings: HuddleSettingsPayload,
    ) -> GatewayResult<()> {
        let user_id = self.require_user(connection_id)?;
        self.require_subscribed(connection_id, RoomKey::Huddle(settings.huddle_id))?;

        let event = HuddleSettingsEvent {
            huddle_id: settings.huddle_id,
            user_id,
            is_video_enabled: settings.is_video_enabled,
            is_audio_enabled: settings.is_audio_enabled,
            is_screen_sharing: settings.is_screen_sharing,
        };
        self.publish(&Envelope::new(DomainEvent::HuddleSettingsUpdated(event)));
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Presence
    // ------------------------------------------------------------------------

    fn apply_presence(&mut self, user_id: UserId, update: PresenceUpdate) {
        match update {
            PresenceUpdate::Changed(event) => self.announce_presence(event),
            PresenceUpdate::GraceStarted => {
                self.timers
                    .arm(TimerKey::PresenceGrace(user_id), self.settings.presence_grace);
            }
            PresenceUpdate::GraceCancelled => {
                self.timers.cancel(TimerKey::PresenceGrace(user_id));
            }
            PresenceUpdate::Unchanged => {}
        }
    }

    fn announce_presence(&mut self, event: PresenceChangedEvent) {
        self.writer.record(&event);
        self.publish(&Envelope::new(DomainEvent::PresenceChanged(event)));
    }

    // ------------------------------------------------------------------------
    // Delivery
    // ------------------------------------------------------------------------

    /// Fan an event out to its rooms
    pub fn publish(&mut self, envelope: &Envelope) {
        match self.router.dispatch(envelope, &mut self.registry, &self.rooms) {
            Ok(report) => self.settle(report),
            Err(e) => {
                tracing::error!(event = envelope.event.event_name(), error = %e, "Dispatch failed");
            }
        }
    }

    /// Send one frame to one connection through the same queue as broadcasts
    fn send_to(&mut self, connection_id: ConnectionId, frame: &ServerFrame) {
        let encoded = match frame.encode() {
            Ok(encoded) => encoded,
            Err(e) => {
                tracing::error!(event = %frame.event, error = %e, "Failed to encode frame");
                return;
            }
        };
        let report = self
            .router
            .deliver(&mut self.registry, [connection_id], &encoded);
        self.settle(report);
    }

    fn settle(&mut self, report: DispatchReport) {
        for connection_id in report.evict {
            tracing::warn!(connection_id = %connection_id, "Evicting slow consumer");
            self.evict(connection_id, CloseCode::SlowConsumer);
        }
    }

    /// Report a failed command to the connection that issued it
    fn reject(&mut self, origin: Option<ConnectionId>, event: &str, error: &GatewayError) {
        if error.is_race_guard() {
            tracing::debug!(connection_id = ?origin, event, error = %error, "Ignored stale command");
            return;
        }

        tracing::debug!(connection_id = ?origin, event, error = %error, "Command rejected");
        if let Some(connection_id) = origin {
            self.send_to(connection_id, &ServerFrame::error(&error.to_response(event)));
        }
    }
}

impl std::fmt::Debug for Hub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hub")
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}
