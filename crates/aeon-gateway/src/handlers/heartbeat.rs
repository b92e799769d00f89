//! Ping handler

use crate::connection::Connection;
use crate::protocol::ServerEvent;
use crate::server::GatewayState;
use std::sync::Arc;

/// Answers client keepalive pings
pub struct PingHandler;

impl PingHandler {
    /// Reply with a pong on the connection that pinged, and nowhere else
    pub async fn handle(state: &GatewayState, connection: &Arc<Connection>) {
        let sent = state
            .registry()
            .send_to_connection(&ServerEvent::Pong, connection)
            .await;

        tracing::trace!(
            connection_id = %connection.id(),
            sent,
            "Ping answered"
        );
    }
}
