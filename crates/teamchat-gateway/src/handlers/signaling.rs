//! WebRTC signaling relay

use teamchat_core::{DomainEvent, SignalEvent};

use super::ClientSession;
use crate::error::GatewayResult;
use crate::protocol::SignalPayload;

/// Relays offers, answers and ICE candidates to every connection of the
/// target user. Payloads are opaque to the gateway.
pub struct SignalHandler;

impl SignalHandler {
    pub async fn relay(session: &ClientSession, payload: SignalPayload) -> GatewayResult<()> {
        let from = session.user_id()?;

        tracing::trace!(
            from = %from,
            to = %payload.to,
            kind = payload.kind.event_name(),
            "Relaying signal"
        );

        session
            .publish(DomainEvent::Signal(SignalEvent {
                kind: payload.kind,
                from,
                to: payload.to,
                payload: payload.payload,
            }))
            .await
    }
}
