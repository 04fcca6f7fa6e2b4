//! Errors reported by the external collaborators behind the core's ports

use thiserror::Error;

/// Failure of a membership, authorization, persistence or directory call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollaboratorError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Collaborator unavailable: {0}")]
    Unavailable(String),
}

impl CollaboratorError {
    /// Create a not found error for an entity
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Get an error code string for rejection frames
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::Unavailable(_) => "UNAVAILABLE",
        }
    }
}

/// Failure to verify a bearer credential
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    #[error("Invalid credential: {0}")]
    Invalid(String),

    #[error("Credential expired")]
    Expired,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = CollaboratorError::not_found("Message", 42);
        assert_eq!(err.to_string(), "Message not found: 42");
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[test]
    fn test_codes() {
        assert_eq!(CollaboratorError::Forbidden("x".into()).code(), "FORBIDDEN");
        assert_eq!(CollaboratorError::Unavailable("db".into()).code(), "UNAVAILABLE");
    }
}
