//! Client event handlers
//!
//! Handles inbound client events by name. Each handler authorizes the action
//! against the collaborators, then hands the result to the hub.

mod authenticate;
mod huddles;
mod messages;
mod reactions;
mod rooms;
mod session;
mod signaling;
mod status;
mod typing;

pub use authenticate::AuthenticateHandler;
pub use huddles::HuddleHandler;
pub use messages::MessageHandler;
pub use reactions::ReactionHandler;
pub use rooms::RoomHandler;
pub use session::ClientSession;
pub use signaling::SignalHandler;
pub use status::StatusHandler;
pub use typing::TypingHandler;

use crate::error::GatewayResult;
use crate::protocol::{ClientEvent, ServerFrame};

/// Dispatch incoming client events to the appropriate handlers
pub struct MessageDispatcher;

impl MessageDispatcher {
    /// Handle one client event on behalf of `session`
    pub async fn dispatch(session: &mut ClientSession, event: ClientEvent) -> GatewayResult<()> {
        match event {
            ClientEvent::Authenticate(payload) => AuthenticateHandler::handle(session, payload).await,
            ClientEvent::JoinWorkspace(payload) => RoomHandler::join_workspace(session, payload).await,
            ClientEvent::JoinChannel(payload) => RoomHandler::join_channel(session, payload).await,
            ClientEvent::LeaveChannel(payload) => RoomHandler::leave_channel(session, payload).await,
            ClientEvent::SendMessage(payload) => MessageHandler::send(session, payload).await,
            ClientEvent::EditMessage(payload) => MessageHandler::edit(session, payload).await,
            ClientEvent::DeleteMessage(payload) => MessageHandler::delete(session, payload).await,
            ClientEvent::AddReaction(payload) => ReactionHandler::add(session, payload).await,
            ClientEvent::RemoveReaction(payload) => ReactionHandler::remove(session, payload).await,
            ClientEvent::TypingStart(payload) => TypingHandler::handle(session, payload, true).await,
            ClientEvent::TypingStop(payload) => TypingHandler::handle(session, payload, false).await,
            ClientEvent::HuddleJoin(payload) => HuddleHandler::join(session, payload).await,
            ClientEvent::HuddleLeave(payload) => HuddleHandler::leave(session, payload).await,
            ClientEvent::HuddleSettingsUpdate(payload) => {
                HuddleHandler::update_settings(session, payload).await
            }
            ClientEvent::Signal(payload) => SignalHandler::relay(session, payload).await,
            ClientEvent::UpdateStatus(payload) => StatusHandler::handle(session, payload).await,
            ClientEvent::Ping => session.reply(ServerFrame::pong()).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use serde_json::{json, Value};
    use teamchat_common::{JwtService, RealtimeConfig};
    use teamchat_core::{ChannelId, UserId, UserProfile, WorkspaceId};

    use crate::collaborators::{ChannelSeed, Collaborators, InMemoryDirectory};
    use crate::connection::{channel, TransportEnd};
    use crate::hub::spawn_hub;
    use crate::protocol::CloseCode;
    use crate::server::GatewayState;

    struct Fixture {
        state: GatewayState,
        directory: Arc<InMemoryDirectory>,
        jwt: JwtService,
        workspace: WorkspaceId,
        general: ChannelId,
        secret: ChannelId,
    }

    async fn fixture() -> Fixture {
        let directory = Arc::new(InMemoryDirectory::new());
        let jwt = JwtService::new("handlers-test-secret", 3600);
        let config = RealtimeConfig::default();
        let (handle, _task) = spawn_hub(&config, directory.clone());
        let collaborators = Collaborators::in_memory(directory.clone(), Arc::new(jwt.clone()));

        let workspace = WorkspaceId::generate();
        let general = ChannelId::generate();
        let secret = ChannelId::generate();
        directory.add_workspace(workspace, Vec::new()).await;
        directory.add_channel(ChannelSeed::public(general, workspace)).await;
        directory
            .add_channel(ChannelSeed::public(secret, workspace).private())
            .await;

        Fixture {
            state: GatewayState::new(handle, collaborators, config),
            directory,
            jwt,
            workspace,
            general,
            secret,
        }
    }

    impl Fixture {
        async fn user(&self, name: &str) -> UserProfile {
            let profile = UserProfile::new(UserId::generate(), name);
            self.directory.add_user(profile.clone()).await;
            self.directory
                .add_workspace(self.workspace, vec![profile.id])
                .await;
            profile
        }

        async fn open(&self) -> (ClientSession, TransportEnd) {
            let (link, mut end) = channel(32);
            let session = ClientSession::open(self.state.clone(), link).await.unwrap();
            assert_eq!(next(&mut end).await.event, "hello");
            (session, end)
        }

        async fn login(&self, profile: &UserProfile) -> (ClientSession, TransportEnd) {
            let (mut session, mut end) = self.open().await;
            let token = self.jwt.issue(profile.id).unwrap();
            let frame = json!({"event": "authenticate", "data": {"token": token}});
            assert_eq!(session.handle_text(&frame.to_string()).await, None);
            assert_eq!(next(&mut end).await.event, "authenticated");
            (session, end)
        }
    }

    async fn next(end: &mut TransportEnd) -> ServerFrame {
        tokio::time::timeout(Duration::from_secs(1), end.frames.recv())
            .await
            .expect("no frame within a second")
            .expect("frame queue closed")
            .decode()
            .unwrap()
    }

    async fn send(session: &mut ClientSession, event: &str, data: Value) -> Option<CloseCode> {
        session
            .handle_text(&json!({"event": event, "data": data}).to_string())
            .await
    }

    #[tokio::test]
    async fn test_ping_is_answered_anonymously() {
        let fx = fixture().await;
        let (mut session, mut end) = fx.open().await;

        assert_eq!(send(&mut session, "ping", Value::Null).await, None);
        assert_eq!(next(&mut end).await.event, "pong");
    }

    #[tokio::test]
    async fn test_anonymous_actions_are_rejected() {
        let fx = fixture().await;
        let (mut session, mut end) = fx.open().await;

        send(&mut session, "join_channel", json!(fx.general)).await;

        let frame = next(&mut end).await;
        assert_eq!(frame.event, "error");
        assert_eq!(frame.data["code"], "NOT_AUTHENTICATED");
        assert_eq!(frame.data["details"]["event"], "join_channel");
    }

    #[tokio::test]
    async fn test_bad_token_leaves_session_anonymous() {
        let fx = fixture().await;
        let (mut session, mut end) = fx.open().await;

        send(&mut session, "authenticate", json!("not-a-token")).await;

        let frame = next(&mut end).await;
        assert_eq!(frame.event, "auth_error");
        assert_eq!(frame.data["code"], "INVALID_TOKEN");
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn test_malformed_and_unknown_frames_close() {
        let fx = fixture().await;
        let (mut session, _end) = fx.open().await;

        assert_eq!(session.handle_text("{not json").await, Some(CloseCode::DecodeError));
        assert_eq!(
            send(&mut session, "teleport", json!({})).await,
            Some(CloseCode::UnknownEvent)
        );
    }

    #[tokio::test]
    async fn test_invalid_payload_is_a_rejection() {
        let fx = fixture().await;
        let ada = fx.user("ada").await;
        let (mut session, mut end) = fx.login(&ada).await;
        let _ = next(&mut end).await; // user_online

        assert_eq!(send(&mut session, "join_channel", json!(42)).await, None);

        let frame = next(&mut end).await;
        assert_eq!(frame.event, "error");
        assert_eq!(frame.data["code"], "INVALID_PAYLOAD");
    }

    #[tokio::test]
    async fn test_join_private_channel_requires_membership() {
        let fx = fixture().await;
        let ada = fx.user("ada").await;
        let (mut session, mut end) = fx.login(&ada).await;
        let _ = next(&mut end).await;

        send(&mut session, "join_channel", json!({"channelId": fx.secret})).await;
        let frame = next(&mut end).await;
        assert_eq!(frame.event, "error");
        assert_eq!(frame.data["code"], "FORBIDDEN");

        send(&mut session, "join_channel", json!({"channelId": fx.general})).await;
        let frame = next(&mut end).await;
        assert_eq!(frame.event, "joined_channel");
        assert_eq!(frame.data["channelId"], json!(fx.general));
    }

    #[tokio::test]
    async fn test_edit_requires_authorship() {
        let fx = fixture().await;
        let ada = fx.user("ada").await;
        let bob = fx.user("bob").await;
        let (mut ada_session, mut ada_end) = fx.login(&ada).await;
        let (mut bob_session, mut bob_end) = fx.login(&bob).await;

        // Drain presence announcements
        let _ = next(&mut ada_end).await;
        let _ = next(&mut ada_end).await;
        let _ = next(&mut bob_end).await;

        send(&mut ada_session, "join_channel", json!(fx.general)).await;
        send(&mut bob_session, "join_channel", json!(fx.general)).await;
        assert_eq!(next(&mut ada_end).await.event, "joined_channel");
        assert_eq!(next(&mut bob_end).await.event, "joined_channel");

        send(
            &mut ada_session,
            "send_message",
            json!({"channelId": fx.general, "content": "hello"}),
        )
        .await;
        let created = next(&mut ada_end).await;
        assert_eq!(created.event, "new_message");
        let message_id = created.data["message"]["id"].clone();
        assert_eq!(next(&mut bob_end).await.event, "new_message");

        send(
            &mut bob_session,
            "edit_message",
            json!({"messageId": message_id, "content": "hijacked"}),
        )
        .await;
        let frame = next(&mut bob_end).await;
        assert_eq!(frame.event, "error");
        assert_eq!(frame.data["code"], "FORBIDDEN");

        send(
            &mut ada_session,
            "edit_message",
            json!({"messageId": message_id, "content": "hello again"}),
        )
        .await;
        let edited = next(&mut bob_end).await;
        assert_eq!(edited.event, "message_edited");
        assert_eq!(edited.data["content"], "hello again");
    }

    #[tokio::test]
    async fn test_unknown_status_is_rejected() {
        let fx = fixture().await;
        let ada = fx.user("ada").await;
        let (mut session, mut end) = fx.login(&ada).await;
        let _ = next(&mut end).await;

        send(&mut session, "update_status", json!({"status": "offline"})).await;
        let frame = next(&mut end).await;
        assert_eq!(frame.event, "error");
        assert_eq!(frame.data["code"], "INVALID_STATUS");

        send(
            &mut session,
            "update_status",
            json!({"status": "busy", "statusMessage": "  heads down  "}),
        )
        .await;
        let frame = next(&mut end).await;
        assert_eq!(frame.event, "user_status_changed");
        assert_eq!(frame.data["statusMessage"], "heads down");
    }
}
