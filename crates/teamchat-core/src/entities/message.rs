//! Message records as returned by the message store
//!
//! The real-time core never owns message rows; it only needs enough of them to
//! authorize an action and to build the fan-out payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::value_objects::{ChannelId, MessageId, UserId};

/// Ownership information used for authorization checks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageMeta {
    pub id: MessageId,
    pub channel_id: ChannelId,
    pub author_id: UserId,
}

/// A message that was just persisted
#[derive(Debug, Clone, PartialEq)]
pub struct StoredMessage {
    pub id: MessageId,
    pub channel_id: ChannelId,
    pub author_id: UserId,
    /// Author of the parent message, when this is a thread reply
    pub parent_author_id: Option<UserId>,
    /// Full message row (with author info) as clients render it
    pub body: Value,
}

/// Result of an edit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditedMessage {
    pub id: MessageId,
    pub channel_id: ChannelId,
    pub content: String,
    pub edited_at: DateTime<Utc>,
}

/// Reaction summary for a message after a reaction change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionSummary {
    pub emoji: String,
    pub count: u32,
    pub users: Vec<UserId>,
}
