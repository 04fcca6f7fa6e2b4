//! Event broadcasting
//!
//! Routes domain events to the live connections subscribed to their rooms.

mod router;
mod routing;

pub use router::{DispatchReport, Envelope, EventRouter};
pub use routing::{excluded_user, target_rooms};
