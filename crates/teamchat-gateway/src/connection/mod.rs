//! Connection management
//!
//! Live connections, their outbound queues, and the user index.

mod connection;
mod registry;

pub use connection::{channel, Connection, ConnectionLink, DeliveryOutcome, TransportEnd};
pub use registry::ConnectionRegistry;
