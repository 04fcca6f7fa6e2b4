//! Domain entities - the slices of persisted records the real-time core reads

mod message;
mod user;

pub use message::{EditedMessage, MessageMeta, ReactionSummary, StoredMessage};
pub use user::UserProfile;
