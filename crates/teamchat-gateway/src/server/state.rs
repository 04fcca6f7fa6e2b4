//! Gateway state
//!
//! Shared, cheaply cloneable state handed to every WebSocket session.

use std::sync::Arc;
use std::time::Duration;

use teamchat_common::RealtimeConfig;

use crate::auth::SessionAuthenticator;
use crate::collaborators::Collaborators;
use crate::hub::GatewayHandle;

/// Gateway application state
#[derive(Clone)]
pub struct GatewayState {
    /// Queue into the hub task
    handle: GatewayHandle,
    /// External services the session handlers consult
    collaborators: Arc<Collaborators>,
    authenticator: SessionAuthenticator,
    realtime: Arc<RealtimeConfig>,
}

impl GatewayState {
    pub fn new(handle: GatewayHandle, collaborators: Collaborators, realtime: RealtimeConfig) -> Self {
        let authenticator = SessionAuthenticator::new(
            collaborators.credentials.clone(),
            collaborators.users.clone(),
            realtime.collaborator_timeout,
        );

        Self {
            handle,
            collaborators: Arc::new(collaborators),
            authenticator,
            realtime: Arc::new(realtime),
        }
    }

    pub fn handle(&self) -> &GatewayHandle {
        &self.handle
    }

    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    pub fn authenticator(&self) -> &SessionAuthenticator {
        &self.authenticator
    }

    pub fn realtime(&self) -> &RealtimeConfig {
        &self.realtime
    }

    /// Upper bound on any single collaborator call
    pub fn collaborator_timeout(&self) -> Duration {
        self.realtime.collaborator_timeout
    }
}

impl std::fmt::Debug for GatewayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayState")
            .field("handle", &self.handle)
            .field("realtime", &self.realtime)
            .finish_non_exhaustive()
    }
}
