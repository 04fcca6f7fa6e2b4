//! Presence
//!
//! Online/offline/status state per user, derived from connection lifecycle.

mod tracker;

pub use tracker::{AttachContext, PresenceTracker, PresenceUpdate, UserPresence};
