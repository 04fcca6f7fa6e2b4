//! Authenticate handler
//!
//! Verifies the client's credential, looks up its memberships and binds the
//! identity to the connection.

use futures::future::try_join;
use teamchat_common::ErrorResponse;
use teamchat_core::UserId;

use super::ClientSession;
use crate::error::GatewayResult;
use crate::hub::{HubCommand, Memberships};
use crate::protocol::{AuthenticatePayload, ServerFrame};

/// Handler for `authenticate` events
pub struct AuthenticateHandler;

impl AuthenticateHandler {
    /// Failures are answered with `auth_error` and leave the connection
    /// anonymous; the transport stays open so the client may retry.
    pub async fn handle(session: &mut ClientSession, payload: AuthenticatePayload) -> GatewayResult<()> {
        let identity = match session.state().authenticator().authenticate(&payload.token).await {
            Ok(identity) => identity,
            Err(e) => {
                tracing::info!(
                    connection_id = %session.connection_id(),
                    code = e.code(),
                    "Authentication failed"
                );
                let body = ErrorResponse::new(e.code(), e.to_string());
                return session.reply(ServerFrame::auth_error(&body)).await;
            }
        };

        let memberships = match Self::memberships(session, identity.user_id).await {
            Ok(memberships) => memberships,
            Err(e) => {
                tracing::warn!(
                    connection_id = %session.connection_id(),
                    user_id = %identity.user_id,
                    error = %e,
                    "Membership lookup failed"
                );
                let body = e.to_response("authenticate");
                return session.reply(ServerFrame::auth_error(&body)).await;
            }
        };

        tracing::info!(
            connection_id = %session.connection_id(),
            user_id = %identity.user_id,
            workspaces = memberships.workspaces.len(),
            channels = memberships.channels.len(),
            "Client authenticated"
        );

        session
            .send(HubCommand::Identify {
                connection_id: session.connection_id(),
                identity: identity.clone(),
                memberships,
            })
            .await?;
        session.set_identity(identity);

        Ok(())
    }

    async fn memberships(session: &ClientSession, user_id: UserId) -> GatewayResult<Memberships> {
        let membership = &session.state().collaborators().membership;
        let (workspaces, channels) = try_join(
            session.call("membership", membership.workspaces_of(user_id)),
            session.call("membership", membership.channels_of(user_id)),
        )
        .await?;

        let mut workspaces: Vec<_> = workspaces.into_iter().collect();
        let mut channels: Vec<_> = channels.into_iter().collect();
        workspaces.sort_unstable();
        channels.sort_unstable();

        Ok(Memberships {
            workspaces,
            channels,
        })
    }
}
