//! WebSocket handler
//!
//! Bridges one WebSocket to one [`ClientSession`]: inbound frames go through
//! the session, outbound frames and close requests come from the hub.

use std::borrow::Cow;
use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use teamchat_core::ConnectionId;

use crate::connection::{channel, TransportEnd};
use crate::handlers::ClientSession;
use crate::protocol::{CloseCode, EncodedFrame};
use crate::server::GatewayState;

/// How long the writer may take to flush the close frame after disconnect
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// WebSocket gateway handler
pub async fn gateway_handler(
    State(state): State<GatewayState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(state, socket))
}

/// Handle an upgraded WebSocket connection
async fn handle_socket(state: GatewayState, socket: WebSocket) {
    let (link, transport) = channel(state.realtime().outbound_buffer);
    let closer = link.closer();

    let mut session = match ClientSession::open(state, link).await {
        Ok(session) => session,
        Err(e) => {
            tracing::error!(error = %e, "Failed to register connection");
            return;
        }
    };
    let connection_id = session.connection_id();
    tracing::info!(connection_id = %connection_id, "WebSocket connection established");

    let (ws_sink, mut ws_stream) = socket.split();
    let mut send_task = tokio::spawn(write_frames(ws_sink, transport, connection_id));
    let mut writer_done = false;

    loop {
        tokio::select! {
            _ = &mut send_task => {
                // Evicted by the hub or the socket stopped accepting writes
                writer_done = true;
                break;
            }
            msg = ws_stream.next() => {
                let close = match msg {
                    Some(Ok(Message::Text(text))) => session.handle_text(&text).await,
                    Some(Ok(Message::Binary(_))) => {
                        tracing::debug!(
                            connection_id = %connection_id,
                            "Binary frames not supported"
                        );
                        Some(CloseCode::DecodeError)
                    }
                    Some(Ok(Message::Ping(_) | Message::Pong(_))) => {
                        // Pong replies are handled by axum
                        if session.touch().await.is_err() {
                            Some(CloseCode::UnknownError)
                        } else {
                            None
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::info!(connection_id = %connection_id, "Client closed connection");
                        break;
                    }
                    Some(Err(e)) => {
                        tracing::warn!(
                            connection_id = %connection_id,
                            error = %e,
                            "WebSocket error"
                        );
                        break;
                    }
                };

                if let Some(code) = close {
                    // The hub may already have queued a close; first one wins
                    let _ = closer.try_send(code);
                    break;
                }
            }
        }
    }

    session.close().await;

    if !writer_done && tokio::time::timeout(WRITER_DRAIN_TIMEOUT, send_task).await.is_err() {
        tracing::debug!(connection_id = %connection_id, "Writer did not drain in time");
    }

    tracing::info!(connection_id = %connection_id, "WebSocket connection closed");
}

/// Forward queued frames to the socket until the hub closes the queue or asks
/// for a close
async fn write_frames(
    mut sink: SplitSink<WebSocket, Message>,
    transport: TransportEnd,
    connection_id: ConnectionId,
) {
    let TransportEnd {
        mut frames,
        mut close,
    } = transport;

    let code = loop {
        tokio::select! {
            biased;
            code = close.recv() => break code,
            frame = frames.recv() => match frame {
                Some(frame) => {
                    if let Err(e) = sink.send(text(&frame)).await {
                        tracing::debug!(
                            connection_id = %connection_id,
                            error = %e,
                            "Failed to write frame"
                        );
                        return;
                    }
                }
                None => break None,
            },
        }
    };

    let frame = code.map(|code| {
        tracing::debug!(connection_id = %connection_id, close_code = %code, "Closing transport");
        CloseFrame {
            code: code.as_u16(),
            reason: Cow::Borrowed(code.description()),
        }
    });
    let _ = sink.send(Message::Close(frame)).await;
    let _ = sink.close().await;
}

fn text(frame: &EncodedFrame) -> Message {
    Message::Text(frame.as_str().to_owned())
}
