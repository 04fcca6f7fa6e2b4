//! Ports implemented outside the real-time core

mod collaborators;

pub use collaborators::{
    AccessPolicy, CollabResult, CredentialVerifier, MembershipLookup, MessageStore,
    PresenceStore, UserDirectory, VerifiedCredential,
};
