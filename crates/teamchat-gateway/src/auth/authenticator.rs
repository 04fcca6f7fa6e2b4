//! Session authenticator
//!
//! Validates the bearer credential a client presents on `authenticate` and
//! resolves the identity every other component keys on. Failure has no side
//! effect; the session decides what to do with it.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use teamchat_core::{CredentialError, CredentialVerifier, UserDirectory, UserId, UserProfile};
use thiserror::Error;
use tokio::time::timeout;

/// Authentication failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Missing token")]
    MissingToken,

    /// Bad signature or malformed token
    #[error("Invalid token")]
    Invalid,

    #[error("Token expired")]
    Expired,

    /// Token is valid but the user no longer exists
    #[error("User not found")]
    UserNotFound,

    #[error("User directory did not respond in time")]
    Timeout,

    #[error("User directory unavailable: {0}")]
    Unavailable(String),
}

impl AuthError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingToken => "MISSING_AUTH",
            Self::Invalid => "INVALID_TOKEN",
            Self::Expired => "TOKEN_EXPIRED",
            Self::UserNotFound => "USER_NOT_FOUND",
            Self::Timeout => "TIMEOUT",
            Self::Unavailable(_) => "UNAVAILABLE",
        }
    }
}

impl From<CredentialError> for AuthError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::Expired => Self::Expired,
            CredentialError::Invalid(_) => Self::Invalid,
        }
    }
}

/// An authenticated user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    pub user_id: UserId,
    pub profile: UserProfile,
    pub expires_at: DateTime<Utc>,
}

/// Verifies credentials and resolves the user behind them
#[derive(Clone)]
pub struct SessionAuthenticator {
    verifier: Arc<dyn CredentialVerifier>,
    users: Arc<dyn UserDirectory>,
    timeout: Duration,
}

impl SessionAuthenticator {
    pub fn new(
        verifier: Arc<dyn CredentialVerifier>,
        users: Arc<dyn UserDirectory>,
        timeout: Duration,
    ) -> Self {
        Self {
            verifier,
            users,
            timeout,
        }
    }

    /// Validate a credential and return the identity it grants
    pub async fn authenticate(&self, credential: &str) -> Result<UserIdentity, AuthError> {
        // Extract token (remove "Bearer " prefix if present)
        let token = credential.trim();
        let token = token.strip_prefix("Bearer ").unwrap_or(token).trim();
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }

        let verified = self.verifier.verify(token).map_err(|e| {
            tracing::debug!(error = %e, "Token validation failed");
            AuthError::from(e)
        })?;

        let profile = timeout(self.timeout, self.users.find_user(verified.user_id))
            .await
            .map_err(|_| AuthError::Timeout)?
            .map_err(|e| AuthError::Unavailable(e.to_string()))?
            .ok_or(AuthError::UserNotFound)?;

        Ok(UserIdentity {
            user_id: verified.user_id,
            profile,
            expires_at: verified.expires_at,
        })
    }
}

impl std::fmt::Debug for SessionAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionAuthenticator")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
