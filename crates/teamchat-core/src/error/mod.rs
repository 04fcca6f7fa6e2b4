//! Domain-level error types

mod collaborator_error;

pub use collaborator_error::{CollaboratorError, CredentialError};
