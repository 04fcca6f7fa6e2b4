//! Gateway error types

use teamchat_common::ErrorResponse;
use teamchat_core::{CollaboratorError, ConnectionId, RoomKey, StatusParseError, UserId};
use thiserror::Error;

use crate::auth::AuthError;
use crate::protocol::{CloseCode, FrameError};

/// Errors raised by the real-time core and its action handlers
#[derive(Debug, Error)]
pub enum GatewayError {
    /// A connection id was registered twice
    #[error("Connection already registered: {0}")]
    DuplicateConnection(ConnectionId),

    /// Connection is not (or no longer) in the registry
    #[error("Unknown connection: {0}")]
    UnknownConnection(ConnectionId),

    /// Connection is not subscribed to the room the action targets
    #[error("Not subscribed to {0}")]
    UnknownRoom(RoomKey),

    /// User has no presence record
    #[error("Unknown user: {0}")]
    UnknownUser(UserId),

    #[error("Not authenticated")]
    NotAuthenticated,

    /// Action rejected by the authorization policy
    #[error("Forbidden: {0}")]
    Authorization(String),

    #[error("{0} did not respond in time")]
    CollaboratorTimeout(&'static str),

    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error(transparent)]
    InvalidStatus(#[from] StatusParseError),

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The hub task has stopped
    #[error("Gateway hub is not running")]
    HubClosed,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Convert to a close code when the error must terminate the transport
    ///
    /// Everything else is reported to the sender as a rejection frame.
    pub fn to_close_code(&self) -> Option<CloseCode> {
        match self {
            Self::Frame(e) => e.close_code(),
            Self::HubClosed => Some(CloseCode::UnknownError),
            _ => None,
        }
    }

    /// Race-condition guards: logged and otherwise ignored
    pub fn is_race_guard(&self) -> bool {
        matches!(self, Self::UnknownConnection(_) | Self::UnknownRoom(_))
    }

    /// Error code carried by rejection frames
    pub fn code(&self) -> &'static str {
        match self {
            Self::DuplicateConnection(_) => "DUPLICATE_CONNECTION",
            Self::UnknownConnection(_) => "UNKNOWN_CONNECTION",
            Self::UnknownRoom(_) => "UNKNOWN_ROOM",
            Self::UnknownUser(_) => "UNKNOWN_USER",
            Self::NotAuthenticated => "NOT_AUTHENTICATED",
            Self::Authorization(_) => "FORBIDDEN",
            Self::CollaboratorTimeout(_) => "TIMEOUT",
            Self::Collaborator(e) => e.code(),
            Self::InvalidPayload(_) | Self::Frame(_) => "INVALID_PAYLOAD",
            Self::InvalidStatus(_) => "INVALID_STATUS",
            Self::Auth(e) => e.code(),
            Self::HubClosed | Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Body of the rejection frame for a failed client event
    pub fn to_response(&self, event: &str) -> ErrorResponse {
        ErrorResponse::new(self.code(), self.to_string())
            .with_details(serde_json::json!({ "event": event }))
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Authorization(reason.into())
    }
}

/// Handler result type
pub type GatewayResult<T> = Result<T, GatewayError>;
