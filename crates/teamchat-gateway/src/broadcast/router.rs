//! Event router
//!
//! Resolves an event's rooms to a deduplicated recipient set and queues one
//! shared encoding of the frame to each recipient.

use std::collections::HashSet;

use teamchat_core::{ConnectionId, DomainEvent};

use super::routing::{excluded_user, target_rooms};
use crate::connection::{ConnectionRegistry, DeliveryOutcome};
use crate::error::{GatewayError, GatewayResult};
use crate::protocol::{EncodedFrame, ServerFrame};
use crate::rooms::RoomIndex;

/// A domain event plus connections that must not receive it
#[derive(Debug, Clone)]
pub struct Envelope {
    pub event: DomainEvent,
    pub excluded: HashSet<ConnectionId>,
}

impl Envelope {
    pub fn new(event: DomainEvent) -> Self {
        Self {
            event,
            excluded: HashSet::new(),
        }
    }

    #[must_use]
    pub fn excluding(mut self, connection_id: ConnectionId) -> Self {
        self.excluded.insert(connection_id);
        self
    }
}

impl From<DomainEvent> for Envelope {
    fn from(event: DomainEvent) -> Self {
        Self::new(event)
    }
}

/// Outcome of one dispatch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,
    pub dropped: usize,
    /// Connections that crossed the drop limit and must be evicted
    pub evict: Vec<ConnectionId>,
}

impl DispatchReport {
    fn record(&mut self, id: ConnectionId, outcome: DeliveryOutcome, max_dropped: u32) {
        match outcome {
            DeliveryOutcome::Delivered => self.delivered += 1,
            DeliveryOutcome::Dropped { total } => {
                self.dropped += 1;
                if total >= max_dropped {
                    self.evict.push(id);
                }
            }
            // Transport already closing; its disconnect is on the way
            DeliveryOutcome::Closed => {}
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EventRouter {
    max_dropped_events: u32,
}

impl EventRouter {
    pub fn new(max_dropped_events: u32) -> Self {
        Self { max_dropped_events }
    }

    /// Deliver an event to every subscriber of its rooms
    pub fn dispatch(
        &self,
        envelope: &Envelope,
        registry: &mut ConnectionRegistry,
        rooms: &RoomIndex,
    ) -> GatewayResult<DispatchReport> {
        let event = &envelope.event;
        let mut recipients: HashSet<ConnectionId> = target_rooms(event)
            .iter()
            .flat_map(|room| rooms.subscribers_of(room))
            .collect();

        recipients.retain(|id| !envelope.excluded.contains(id));
        if let Some(user_id) = excluded_user(event) {
            for id in registry.connections_for(user_id) {
                recipients.remove(&id);
            }
        }

        if recipients.is_empty() {
            tracing::trace!(event = event.event_name(), "No recipients");
            return Ok(DispatchReport::default());
        }

        let frame = ServerFrame::from_event(event)
            .and_then(|f| f.encode())
            .map_err(|e| GatewayError::Internal(format!("encode {}: {e}", event.event_name())))?;

        let report = self.deliver(registry, recipients, &frame);
        tracing::trace!(
            event = event.event_name(),
            delivered = report.delivered,
            dropped = report.dropped,
            "Event dispatched"
        );
        Ok(report)
    }

    /// Queue an already-encoded frame to specific connections
    pub fn deliver(
        &self,
        registry: &mut ConnectionRegistry,
        recipients: impl IntoIterator<Item = ConnectionId>,
        frame: &EncodedFrame,
    ) -> DispatchReport {
        let mut report = DispatchReport::default();
        for id in recipients {
            let Some(connection) = registry.get_mut(id) else {
                continue;
            };
            let outcome = connection.deliver(frame.clone());
            if let DeliveryOutcome::Dropped { total } = outcome {
                tracing::warn!(connection_id = %id, dropped = total, "Outbound queue full, event dropped");
            }
            report.record(id, outcome, self.max_dropped_events);
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{channel, TransportEnd};
    use teamchat_core::{ChannelId, MessageDeletedEvent, MessageId, RoomKey, TypingEvent, UserId};

    struct Harness {
        registry: ConnectionRegistry,
        rooms: RoomIndex,
        router: EventRouter,
    }

    impl Harness {
        fn new(max_dropped: u32) -> Self {
            Self {
                registry: ConnectionRegistry::new(),
                rooms: RoomIndex::new(),
                router: EventRouter::new(max_dropped),
            }
        }

        fn connect(&mut self, user: UserId, buffer: usize) -> (ConnectionId, TransportEnd) {
            let id = ConnectionId::generate();
            let (link, end) = channel(buffer);
            self.registry.register(id, link).unwrap();
            self.registry.attach_identity(id, user).unwrap();
            (id, end)
        }
    }

    fn deleted(channel_id: ChannelId) -> DomainEvent {
        DomainEvent::MessageDeleted(MessageDeletedEvent {
            channel_id,
            message_id: MessageId::generate(),
        })
    }

    #[tokio::test]
    async fn test_dispatch_reaches_room_once() {
        let mut h = Harness::new(10);
        let channel_id = ChannelId::generate();
        let (conn, mut end) = h.connect(UserId::generate(), 8);
        h.rooms.subscribe(conn, RoomKey::Channel(channel_id));
        h.rooms.subscribe(conn, RoomKey::Channel(channel_id));

        let report = h
            .router
            .dispatch(&deleted(channel_id).into(), &mut h.registry, &h.rooms)
            .unwrap();

        assert_eq!(report.delivered, 1);
        let frame = end.frames.recv().await.unwrap().decode().unwrap();
        assert_eq!(frame.event, "message_deleted");
        assert!(end.frames.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_typing_skips_all_sender_tabs() {
        let mut h = Harness::new(10);
        let channel_id = ChannelId::generate();
        let room = RoomKey::Channel(channel_id);
        let typist = UserId::generate();

        let (tab_a, mut end_a) = h.connect(typist, 8);
        let (tab_b, mut end_b) = h.connect(typist, 8);
        let (other, mut end_other) = h.connect(UserId::generate(), 8);
        for id in [tab_a, tab_b, other] {
            h.rooms.subscribe(id, room);
        }

        let event = DomainEvent::TypingStarted(TypingEvent::new(channel_id, typist, None));
        let report = h.router.dispatch(&event.into(), &mut h.registry, &h.rooms).unwrap();

        assert_eq!(report.delivered, 1);
        assert!(end_other.frames.recv().await.is_some());
        assert!(end_a.frames.try_recv().is_err());
        assert!(end_b.frames.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_explicit_exclusion() {
        let mut h = Harness::new(10);
        let channel_id = ChannelId::generate();
        let (sender, mut sender_end) = h.connect(UserId::generate(), 8);
        h.rooms.subscribe(sender, RoomKey::Channel(channel_id));

        let envelope = Envelope::new(deleted(channel_id)).excluding(sender);
        let report = h.router.dispatch(&envelope, &mut h.registry, &h.rooms).unwrap();

        assert_eq!(report, DispatchReport::default());
        assert!(sender_end.frames.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_slow_consumer_is_flagged() {
        let mut h = Harness::new(2);
        let channel_id = ChannelId::generate();
        let (slow, _end) = h.connect(UserId::generate(), 1);
        h.rooms.subscribe(slow, RoomKey::Channel(channel_id));

        let mut reports = Vec::new();
        for _ in 0..3 {
            let envelope = deleted(channel_id).into();
            reports.push(h.router.dispatch(&envelope, &mut h.registry, &h.rooms).unwrap());
        }

        assert_eq!(reports[0].delivered, 1);
        assert_eq!(reports[1].dropped, 1);
        assert!(reports[1].evict.is_empty());
        assert_eq!(reports[2].evict, vec![slow]);
    }
}
