//! Client session
//!
//! One `ClientSession` per transport. It parses inbound frames, gates them on
//! authentication, runs the collaborator calls an action needs, and queues the
//! resulting command on the hub. Nothing here touches the registry, the room
//! index or presence directly.

use std::future::Future;

use teamchat_core::{CollabResult, ConnectionId, DomainEvent, UserId};

use super::MessageDispatcher;
use crate::auth::UserIdentity;
use crate::broadcast::Envelope;
use crate::collaborators::bounded;
use crate::connection::ConnectionLink;
use crate::error::{GatewayError, GatewayResult};
use crate::hub::HubCommand;
use crate::protocol::{ClientEvent, CloseCode, FrameError, ServerFrame};
use crate::server::GatewayState;

pub struct ClientSession {
    state: GatewayState,
    connection_id: ConnectionId,
    identity: Option<UserIdentity>,
}

impl ClientSession {
    /// Register a freshly opened transport with the hub
    ///
    /// The hub answers with `hello` on the link's frame queue.
    pub async fn open(state: GatewayState, link: ConnectionLink) -> GatewayResult<Self> {
        let connection_id = ConnectionId::generate();
        state
            .handle()
            .send(HubCommand::Connect {
                connection_id,
                link,
            })
            .await?;

        Ok(Self {
            state,
            connection_id,
            identity: None,
        })
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    pub fn identity(&self) -> Option<&UserIdentity> {
        self.identity.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    /// Handle one inbound text frame
    ///
    /// Returns the close code when the frame must terminate the transport.
    pub async fn handle_text(&mut self, text: &str) -> Option<CloseCode> {
        let event = match ClientEvent::from_json(text) {
            Ok(event) => event,
            Err(e) => return self.on_frame_error(e).await,
        };

        tracing::trace!(
            connection_id = %self.connection_id,
            event = event.name(),
            "Received client event"
        );

        let name = event.name();
        match self.handle_event(event).await {
            Ok(()) => None,
            Err(e) => match e.to_close_code() {
                Some(code) => {
                    tracing::warn!(
                        connection_id = %self.connection_id,
                        event = name,
                        error = %e,
                        "Closing connection"
                    );
                    Some(code)
                }
                None => {
                    self.reject(name, &e).await;
                    None
                }
            },
        }
    }

    /// Handle one parsed client event
    pub async fn handle_event(&mut self, event: ClientEvent) -> GatewayResult<()> {
        if !event.allowed_anonymous() && self.identity.is_none() {
            return Err(GatewayError::NotAuthenticated);
        }

        MessageDispatcher::dispatch(self, event).await
    }

    /// Record transport-level activity (protocol pings) that carries no event
    pub async fn touch(&self) -> GatewayResult<()> {
        self.send(HubCommand::Touch {
            connection_id: self.connection_id,
        })
        .await
    }

    /// The transport closed; release everything the connection held
    pub async fn close(self) {
        if let Err(e) = self.state.handle().disconnect(self.connection_id).await {
            tracing::debug!(
                connection_id = %self.connection_id,
                error = %e,
                "Disconnect not delivered"
            );
        }
    }

    async fn on_frame_error(&self, err: FrameError) -> Option<CloseCode> {
        if let Some(code) = err.close_code() {
            tracing::warn!(
                connection_id = %self.connection_id,
                error = %err,
                close_code = %code,
                "Rejected frame"
            );
            return Some(code);
        }

        let event = match &err {
            FrameError::InvalidPayload { event, .. } => *event,
            _ => "unknown",
        };
        self.reject(event, &GatewayError::from(err)).await;
        None
    }

    /// Report a failed action to this connection only
    async fn reject(&self, event: &str, err: &GatewayError) {
        if err.is_race_guard() {
            tracing::debug!(
                connection_id = %self.connection_id,
                event,
                error = %err,
                "Ignoring stale action"
            );
            return;
        }

        tracing::debug!(
            connection_id = %self.connection_id,
            event,
            code = err.code(),
            error = %err,
            "Client action rejected"
        );

        let frame = ServerFrame::error(&err.to_response(event));
        if let Err(e) = self.reply(frame).await {
            tracing::debug!(error = %e, "Rejection not delivered");
        }
    }

    // === Helpers for the action handlers ===

    pub(crate) fn state(&self) -> &GatewayState {
        &self.state
    }

    pub(crate) fn user(&self) -> GatewayResult<&UserIdentity> {
        self.identity.as_ref().ok_or(GatewayError::NotAuthenticated)
    }

    pub(crate) fn user_id(&self) -> GatewayResult<UserId> {
        self.user().map(|identity| identity.user_id)
    }

    pub(crate) fn set_identity(&mut self, identity: UserIdentity) {
        self.identity = Some(identity);
    }

    pub(crate) async fn send(&self, command: HubCommand) -> GatewayResult<()> {
        self.state.handle().send(command).await
    }

    pub(crate) async fn reply(&self, frame: ServerFrame) -> GatewayResult<()> {
        self.send(HubCommand::Reply {
            connection_id: self.connection_id,
            frame,
        })
        .await
    }

    /// Fan out an event produced by this connection's action
    pub(crate) async fn publish(&self, event: DomainEvent) -> GatewayResult<()> {
        self.send(HubCommand::Publish {
            origin: Some(self.connection_id),
            envelope: Envelope::new(event),
        })
        .await
    }

    /// Await a collaborator call under the configured timeout
    pub(crate) async fn call<T, F>(&self, collaborator: &'static str, call: F) -> GatewayResult<T>
    where
        F: Future<Output = CollabResult<T>>,
    {
        bounded(self.state.collaborator_timeout(), collaborator, call).await
    }
}

impl std::fmt::Debug for ClientSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSession")
            .field("connection_id", &self.connection_id)
            .field("user_id", &self.identity.as_ref().map(|i| i.user_id))
            .finish()
    }
}
