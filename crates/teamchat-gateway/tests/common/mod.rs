//! Shared helpers for the gateway integration tests
//!
//! `TestGateway` runs a real hub over the in-memory directory; `TestClient`
//! drives one `ClientSession` and reads what the hub queued for it.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use teamchat_common::{JwtService, RealtimeConfig};
use teamchat_core::{ChannelId, HuddleId, UserId, UserProfile, WorkspaceId};
use teamchat_gateway::collaborators::{ChannelSeed, Collaborators, InMemoryDirectory};
use teamchat_gateway::connection::{channel, TransportEnd};
use teamchat_gateway::handlers::ClientSession;
use teamchat_gateway::hub::{spawn_hub, GatewayHandle, HubStats};
use teamchat_gateway::protocol::{CloseCode, ServerFrame};
use teamchat_gateway::GatewayState;

pub const JWT_SECRET: &str = "integration-test-secret";

/// How long a test waits for an expected frame
const RECV_TIMEOUT: Duration = Duration::from_secs(2);

/// Short timers so grace and typing expiry are quick to observe
pub fn test_realtime() -> RealtimeConfig {
    RealtimeConfig {
        presence_grace: Duration::from_millis(200),
        typing_timeout: Duration::from_millis(300),
        ..RealtimeConfig::default()
    }
}

pub struct TestGateway {
    pub state: GatewayState,
    pub directory: Arc<InMemoryDirectory>,
    pub jwt: JwtService,
}

impl TestGateway {
    pub fn start() -> Self {
        Self::with_config(test_realtime())
    }

    pub fn with_config(config: RealtimeConfig) -> Self {
        let directory = Arc::new(InMemoryDirectory::new());
        let jwt = JwtService::new(JWT_SECRET, 3600);
        let (handle, _task) = spawn_hub(&config, directory.clone());
        let collaborators = Collaborators::in_memory(directory.clone(), Arc::new(jwt.clone()));

        Self {
            state: GatewayState::new(handle, collaborators, config),
            directory,
            jwt,
        }
    }

    pub fn handle(&self) -> &GatewayHandle {
        self.state.handle()
    }

    pub async fn user(&self, name: &str) -> UserProfile {
        let mut profile = UserProfile::new(UserId::generate(), name);
        profile.full_name = Some(format!("{name} tester"));
        self.directory.add_user(profile.clone()).await;
        profile
    }

    pub async fn workspace(&self, members: &[&UserProfile]) -> WorkspaceId {
        let id = WorkspaceId::generate();
        self.directory
            .add_workspace(id, members.iter().map(|m| m.id))
            .await;
        id
    }

    /// Public channel whose listed members are auto-subscribed on login
    pub async fn channel(&self, workspace: WorkspaceId, members: &[&UserProfile]) -> ChannelId {
        let id = ChannelId::generate();
        self.directory
            .add_channel(ChannelSeed::public(id, workspace).with_members(members.iter().map(|m| m.id)))
            .await;
        id
    }

    pub async fn private_channel(
        &self,
        workspace: WorkspaceId,
        members: &[&UserProfile],
    ) -> ChannelId {
        let id = ChannelId::generate();
        self.directory
            .add_channel(
                ChannelSeed::public(id, workspace)
                    .private()
                    .with_members(members.iter().map(|m| m.id)),
            )
            .await;
        id
    }

    pub async fn huddle(&self, channel_id: ChannelId) -> HuddleId {
        let id = HuddleId::generate();
        self.directory.add_huddle(id, channel_id).await;
        id
    }

    pub fn token(&self, user: &UserProfile) -> String {
        self.jwt.issue(user.id).expect("token")
    }

    /// Open an anonymous connection; `hello` is consumed
    pub async fn connect(&self) -> TestClient {
        let (link, end) = channel(64);
        let session = ClientSession::open(self.state.clone(), link)
            .await
            .expect("hub running");
        let mut client = TestClient {
            session,
            end,
            handle: self.handle().clone(),
        };
        client.expect("hello").await;
        client
    }

    /// Open and authenticate; `hello` and `authenticated` are consumed
    pub async fn login(&self, user: &UserProfile) -> TestClient {
        let mut client = self.connect().await;
        client
            .send("authenticate", json!({ "token": self.token(user) }))
            .await;
        client.expect("authenticated").await;
        client
    }

    pub async fn stats(&self) -> HubStats {
        self.handle().stats().await.expect("hub running")
    }
}

pub struct TestClient {
    pub session: ClientSession,
    pub end: TransportEnd,
    handle: GatewayHandle,
}

impl TestClient {
    pub async fn send(&mut self, event: &str, data: Value) -> Option<CloseCode> {
        self.session
            .handle_text(&json!({ "event": event, "data": data }).to_string())
            .await
    }

    pub async fn recv(&mut self) -> ServerFrame {
        tokio::time::timeout(RECV_TIMEOUT, self.end.frames.recv())
            .await
            .expect("timed out waiting for a frame")
            .expect("frame queue closed")
            .decode()
            .expect("valid frame")
    }

    /// Next frame, which must be `event`
    pub async fn expect(&mut self, event: &str) -> ServerFrame {
        let frame = self.recv().await;
        assert_eq!(frame.event, event, "unexpected frame: {frame:?}");
        frame
    }

    /// Skip frames until one named `event` arrives
    pub async fn recv_event(&mut self, event: &str) -> ServerFrame {
        loop {
            let frame = self.recv().await;
            if frame.event == event {
                return frame;
            }
        }
    }

    /// Wait until the hub has applied everything queued so far
    pub async fn settle(&self) {
        self.handle.stats().await.expect("hub running");
    }

    /// Everything already queued for this connection
    pub async fn drain(&mut self) -> Vec<ServerFrame> {
        self.settle().await;
        let mut frames = Vec::new();
        while let Ok(frame) = self.end.frames.try_recv() {
            frames.push(frame.decode().expect("valid frame"));
        }
        frames
    }

    pub async fn expect_silence(&mut self) {
        let frames = self.drain().await;
        assert!(frames.is_empty(), "unexpected frames: {frames:?}");
    }

    pub async fn close(self) {
        self.session.close().await;
    }
}
