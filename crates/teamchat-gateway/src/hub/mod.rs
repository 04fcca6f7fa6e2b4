//! Gateway hub
//!
//! The single-writer core: one task owns all real-time state and applies
//! queued commands, timer firings and idle sweeps in order.

mod command;
mod hub;
mod persistence;
mod runtime;
mod timers;

pub use command::{HubCommand, HubStats, Memberships};
pub use hub::{Hub, HubSettings};
pub use persistence::{PresenceWrite, PresenceWriter};
pub use runtime::{spawn_hub, GatewayHandle};
pub use timers::{TimerFired, TimerKey, Timers};
