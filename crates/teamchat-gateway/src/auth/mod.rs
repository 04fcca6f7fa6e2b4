//! Session authentication

mod authenticator;

pub use authenticator::{AuthError, SessionAuthenticator, UserIdentity};
