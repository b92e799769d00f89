//! Gateway state
//!
//! Application state for the gateway server.

use crate::broadcast::EventRouter;
use crate::connection::ConnectionRegistry;
use crate::handlers::Handshake;
use aeon_common::WebSocketConfig;
use aeon_core::MembershipRepository;
use std::sync::Arc;

/// Gateway application state
///
/// Holds all shared dependencies for the gateway server. One registry per
/// process, shared by every socket task and by the event router.
#[derive(Clone)]
pub struct GatewayState {
    router: EventRouter,
    handshake: Arc<Handshake>,
    memberships: Arc<dyn MembershipRepository>,
    settings: Arc<WebSocketConfig>,
}

impl GatewayState {
    /// Create a new gateway state with a fresh registry
    pub fn new(
        handshake: Handshake,
        memberships: Arc<dyn MembershipRepository>,
        settings: WebSocketConfig,
    ) -> Self {
        let registry = ConnectionRegistry::new_shared(settings.send_timeout());
        Self {
            router: EventRouter::new(registry),
            handshake: Arc::new(handshake),
            memberships,
            settings: Arc::new(settings),
        }
    }

    /// Get the connection registry
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        self.router.registry()
    }

    /// Get the event router
    pub fn router(&self) -> &EventRouter {
        &self.router
    }

    /// Get the handshake
    pub fn handshake(&self) -> &Handshake {
        &self.handshake
    }

    /// Get the membership directory
    pub fn memberships(&self) -> &dyn MembershipRepository {
        self.memberships.as_ref()
    }

    /// Get the socket settings
    pub fn settings(&self) -> &WebSocketConfig {
        &self.settings
    }
}

impl std::fmt::Debug for GatewayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayState")
            .field("registry", self.registry())
            .field("handshake", &self.handshake)
            .field("settings", &self.settings)
            .finish()
    }
}
