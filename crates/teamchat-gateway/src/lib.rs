//! # teamchat-gateway
//!
//! Real-time core of the team chat service: connection registry, room
//! membership index, presence tracking and event fan-out, served over
//! WebSocket.
//!
//! All real-time state is owned by a single hub task ([`hub`]); sessions
//! ([`handlers::ClientSession`]) authorize client actions against the
//! collaborators and queue the results on it.

pub mod auth;
pub mod broadcast;
pub mod collaborators;
pub mod connection;
pub mod error;
pub mod handlers;
pub mod hub;
pub mod presence;
pub mod protocol;
pub mod rooms;
pub mod server;

pub use error::{GatewayError, GatewayResult};
pub use hub::{spawn_hub, GatewayHandle};
pub use server::{create_app, create_gateway_state, run, GatewayState};
