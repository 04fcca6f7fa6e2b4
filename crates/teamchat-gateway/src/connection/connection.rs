//! Individual connection
//!
//! The hub's view of one live transport: its identity, its outbound queue and
//! the bookkeeping needed for backpressure and idle detection.

use chrono::{DateTime, Utc};
use teamchat_core::{ConnectionId, UserId};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::Instant;

use crate::protocol::{CloseCode, EncodedFrame};

/// Create the two halves of a connection's outbound path
///
/// The hub keeps the [`ConnectionLink`]; the transport drains the [`TransportEnd`].
pub fn channel(buffer: usize) -> (ConnectionLink, TransportEnd) {
    let (frames_tx, frames_rx) = mpsc::channel(buffer);
    let (close_tx, close_rx) = mpsc::channel(1);

    (
        ConnectionLink {
            frames: frames_tx,
            close: close_tx,
        },
        TransportEnd {
            frames: frames_rx,
            close: close_rx,
        },
    )
}

/// Sending half: bounded frame queue plus a close signal
#[derive(Debug, Clone)]
pub struct ConnectionLink {
    frames: mpsc::Sender<EncodedFrame>,
    close: mpsc::Sender<CloseCode>,
}

impl ConnectionLink {
    /// Handle the transport keeps to close itself
    pub fn closer(&self) -> mpsc::Sender<CloseCode> {
        self.close.clone()
    }
}

/// Receiving half, owned by the transport's send task
#[derive(Debug)]
pub struct TransportEnd {
    pub frames: mpsc::Receiver<EncodedFrame>,
    pub close: mpsc::Receiver<CloseCode>,
}

/// Result of queueing one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    /// Queue full; `total` is the running drop count for the connection
    Dropped { total: u32 },
    /// Transport already gone
    Closed,
}

/// A registered connection
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    user_id: Option<UserId>,
    created_at: DateTime<Utc>,
    last_activity: Instant,
    link: ConnectionLink,
    dropped: u32,
}

impl Connection {
    pub fn new(id: ConnectionId, link: ConnectionLink) -> Self {
        Self {
            id,
            user_id: None,
            created_at: Utc::now(),
            last_activity: Instant::now(),
            link,
            dropped: 0,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Authenticated user, `None` while anonymous
    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    pub(crate) fn set_user_id(&mut self, user_id: UserId) {
        self.user_id = Some(user_id);
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_activity(&self) -> Instant {
        self.last_activity
    }

    /// Record inbound activity
    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    /// Queue a frame without waiting
    pub fn deliver(&mut self, frame: EncodedFrame) -> DeliveryOutcome {
        match self.link.frames.try_send(frame) {
            Ok(()) => DeliveryOutcome::Delivered,
            Err(TrySendError::Full(_)) => {
                self.dropped = self.dropped.saturating_add(1);
                DeliveryOutcome::Dropped {
                    total: self.dropped,
                }
            }
            Err(TrySendError::Closed(_)) => DeliveryOutcome::Closed,
        }
    }

    /// Ask the transport to close with `code`
    ///
    /// Returns false if a close was already requested or the transport is gone.
    pub fn close(&self, code: CloseCode) -> bool {
        self.link.close.try_send(code).is_ok()
    }
}
