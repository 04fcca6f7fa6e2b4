//! Registry / room index consistency under arbitrary interleavings
//!
//! Run with: cargo test -p teamchat-gateway --test consistency

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use proptest::prelude::*;
use teamchat_common::RealtimeConfig;
use teamchat_core::{
    ChannelId, ConnectionId, DomainEvent, HuddleId, MessageCreatedEvent, RoomKey, UserId,
    UserProfile, WorkspaceId,
};
use teamchat_gateway::auth::UserIdentity;
use teamchat_gateway::broadcast::Envelope;
use teamchat_gateway::collaborators::InMemoryDirectory;
use teamchat_gateway::connection::{channel, TransportEnd};
use teamchat_gateway::hub::{Hub, HubCommand, HubSettings, Memberships, PresenceWriter, Timers};
use tokio::sync::mpsc;
use uuid::Uuid;

const CONNECTIONS: usize = 5;
const USERS: usize = 3;

#[derive(Debug, Clone)]
enum Op {
    Connect(usize),
    Disconnect(usize),
    Identify(usize, usize),
    Join(usize, usize),
    Leave(usize, usize),
    Publish(usize),
    /// Transport dropped without a disconnect; the next delivery notices
    DropTransport(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0..CONNECTIONS).prop_map(Op::Connect),
        2 => (0..CONNECTIONS).prop_map(Op::Disconnect),
        3 => (0..CONNECTIONS, 0..USERS).prop_map(|(c, u)| Op::Identify(c, u)),
        3 => (0..CONNECTIONS, 0..4usize).prop_map(|(c, r)| Op::Join(c, r)),
        2 => (0..CONNECTIONS, 0..4usize).prop_map(|(c, r)| Op::Leave(c, r)),
        2 => (0..2usize).prop_map(Op::Publish),
        1 => (0..CONNECTIONS).prop_map(Op::DropTransport),
    ]
}

struct World {
    connections: Vec<ConnectionId>,
    users: Vec<UserId>,
    workspace: WorkspaceId,
    channels: [ChannelId; 2],
    huddle: HuddleId,
    transports: HashMap<usize, TransportEnd>,
}

impl World {
    fn new() -> Self {
        Self {
            connections: (0..CONNECTIONS)
                .map(|i| ConnectionId::new(Uuid::from_u128(100 + i as u128)))
                .collect(),
            users: (0..USERS)
                .map(|i| UserId::new(Uuid::from_u128(200 + i as u128)))
                .collect(),
            workspace: WorkspaceId::new(Uuid::from_u128(300)),
            channels: [
                ChannelId::new(Uuid::from_u128(400)),
                ChannelId::new(Uuid::from_u128(401)),
            ],
            huddle: HuddleId::new(Uuid::from_u128(500)),
            transports: HashMap::new(),
        }
    }

    fn room(&self, index: usize) -> RoomKey {
        match index {
            0 => RoomKey::Workspace(self.workspace),
            1 => RoomKey::Channel(self.channels[0]),
            2 => RoomKey::Channel(self.channels[1]),
            _ => RoomKey::Huddle(self.huddle),
        }
    }

    fn command(&mut self, op: &Op) -> HubCommand {
        match *op {
            Op::Connect(c) => {
                let (link, end) = channel(8);
                self.transports.insert(c, end);
                HubCommand::Connect {
                    connection_id: self.connections[c],
                    link,
                }
            }
            Op::Disconnect(c) | Op::DropTransport(c) => {
                self.transports.remove(&c);
                if matches!(op, Op::DropTransport(_)) {
                    // Nudge a delivery so the closed queue is observed
                    return self.publish(0);
                }
                HubCommand::Disconnect {
                    connection_id: self.connections[c],
                }
            }
            Op::Identify(c, u) => {
                let user_id = self.users[u];
                HubCommand::Identify {
                    connection_id: self.connections[c],
                    identity: UserIdentity {
                        user_id,
                        profile: UserProfile::new(user_id, format!("user{u}")),
                        expires_at: Utc::now(),
                    },
                    memberships: Memberships {
                        workspaces: vec![self.workspace],
                        channels: vec![self.channels[u % 2]],
                    },
                }
            }
            Op::Join(c, r) => HubCommand::Join {
                connection_id: self.connections[c],
                room: self.room(r),
                ack: None,
            },
            Op::Leave(c, r) => HubCommand::Leave {
                connection_id: self.connections[c],
                room: self.room(r),
                ack: None,
            },
            Op::Publish(ch) => self.publish(ch),
        }
    }

    fn publish(&self, ch: usize) -> HubCommand {
        HubCommand::Publish {
            origin: None,
            envelope: Envelope::new(DomainEvent::MessageCreated(MessageCreatedEvent {
                channel_id: self.channels[ch],
                message: serde_json::json!({ "content": "x" }),
            })),
        }
    }
}

fn check(hub: &Hub, world: &World) -> Result<(), TestCaseError> {
    for (room, subscribers) in hub.rooms().iter() {
        prop_assert!(!subscribers.is_empty(), "empty room {room} kept");
        for connection in subscribers {
            prop_assert!(
                hub.registry().contains(*connection),
                "{connection} subscribed to {room} but not registered"
            );
        }
    }

    for user in &world.users {
        prop_assert_eq!(
            hub.presence().status_of(*user).is_connected(),
            hub.registry().is_user_connected(*user)
        );
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_no_dangling_subscriptions(ops in prop::collection::vec(op(), 1..80)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        runtime.block_on(async {
            let (fired_tx, _fired_rx) = mpsc::unbounded_channel();
            let (writer, _writer_task) =
                PresenceWriter::spawn(Arc::new(InMemoryDirectory::new()), Duration::from_secs(1));
            let settings = HubSettings {
                max_dropped_events: 2,
                ..HubSettings::from(&RealtimeConfig::default())
            };
            let mut hub = Hub::new(settings, Timers::new(fired_tx), writer);
            let mut world = World::new();

            for op in &ops {
                let command = world.command(op);
                hub.handle(command);
                check(&hub, &world)?;
            }

            // Tear everything down: nothing may be left behind
            for connection in world.connections.clone() {
                hub.handle(HubCommand::Disconnect { connection_id: connection });
            }
            prop_assert_eq!(hub.registry().connection_count(), 0);
            prop_assert_eq!(hub.rooms().room_count(), 0);
            Ok(())
        })?;
    }
}
