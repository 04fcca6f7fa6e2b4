//! Gateway wire protocol
//!
//! JSON frames, client event parsing and close codes.

mod client_events;
mod close_codes;
mod messages;

pub use client_events::{
    AuthenticatePayload, ChannelRef, ClientEvent, EditMessagePayload, HuddleRef,
    HuddleSettingsPayload, MessageRef, ReactionPayload, SendMessagePayload, SignalPayload,
    StatusPayload, WorkspaceRef,
};
pub use close_codes::CloseCode;
pub use messages::{ClientFrame, EncodedFrame, FrameError, ServerFrame};
