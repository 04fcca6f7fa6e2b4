//! Value objects - immutable types that represent domain concepts

mod ids;
mod room_key;
mod status;

pub use ids::{ChannelId, ConnectionId, HuddleId, IdParseError, MessageId, UserId, WorkspaceId};
pub use room_key::{RoomKey, RoomKeyParseError};
pub use status::{PresenceStatus, StatusParseError};
