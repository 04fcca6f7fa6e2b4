//! Presence persistence writer
//!
//! Presence transitions are written through the `PresenceStore` port by a
//! dedicated task, one write at a time, in the order the hub produced them.
//! Writes are best-effort: a failure or timeout is logged and the in-memory
//! state stands.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use teamchat_core::{PresenceChange, PresenceChangedEvent, PresenceStatus, PresenceStore, UserId};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::collaborators::bounded;

/// One durable presence write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenceWrite {
    Online { user_id: UserId, online: bool },
    LastSeen { user_id: UserId, at: DateTime<Utc> },
    Status {
        user_id: UserId,
        status: PresenceStatus,
        message: Option<String>,
    },
}

impl PresenceWrite {
    /// Durable fields touched by a presence transition
    pub fn for_event(event: &PresenceChangedEvent) -> Vec<Self> {
        let user_id = event.user_id;
        match event.change {
            PresenceChange::CameOnline => vec![Self::Online {
                user_id,
                online: true,
            }],
            PresenceChange::WentOffline => {
                let mut writes = vec![Self::Online {
                    user_id,
                    online: false,
                }];
                if let Some(at) = event.last_seen {
                    writes.push(Self::LastSeen { user_id, at });
                }
                writes
            }
            PresenceChange::StatusChanged => vec![Self::Status {
                user_id,
                status: event.status,
                message: event.status_message.clone(),
            }],
        }
    }

    async fn apply(self, store: &dyn PresenceStore, limit: Duration) {
        let (user_id, result) = match self {
            Self::Online { user_id, online } => (
                user_id,
                bounded(limit, "presence store", store.set_online(user_id, online)).await,
            ),
            Self::LastSeen { user_id, at } => (
                user_id,
                bounded(limit, "presence store", store.set_last_seen(user_id, at)).await,
            ),
            Self::Status {
                user_id,
                status,
                message,
            } => (
                user_id,
                bounded(
                    limit,
                    "presence store",
                    store.set_status(user_id, status, message.as_deref()),
                )
                .await,
            ),
        };

        if let Err(e) = result {
            tracing::warn!(user_id = %user_id, error = %e, "Failed to persist presence");
        }
    }
}

/// Queue into the writer task
#[derive(Debug, Clone)]
pub struct PresenceWriter {
    queue: mpsc::UnboundedSender<PresenceWrite>,
}

impl PresenceWriter {
    /// Spawn the writer task; it ends once every `PresenceWriter` is dropped
    pub fn spawn(store: Arc<dyn PresenceStore>, limit: Duration) -> (Self, JoinHandle<()>) {
        let (queue, mut rx) = mpsc::unbounded_channel::<PresenceWrite>();

        let task = tokio::spawn(async move {
            while let Some(write) = rx.recv().await {
                write.apply(store.as_ref(), limit).await;
            }
            tracing::debug!("Presence writer stopped");
        });

        (Self { queue }, task)
    }

    /// Queue the writes for a presence transition
    pub fn record(&self, event: &PresenceChangedEvent) {
        for write in PresenceWrite::for_event(event) {
            if self.queue.send(write).is_err() {
                tracing::warn!(user_id = %event.user_id, "Presence writer is gone");
                return;
            }
        }
    }
}
