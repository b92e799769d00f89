//! Client frame handlers
//!
//! Handles the identity handshake and the frames a client sends over an open
//! connection.

mod chat;
mod error;
mod handshake;
mod heartbeat;

pub use chat::ChatHandler;
pub use error::{HandlerError, HandlerResult};
pub use handshake::{ConnectParams, Handshake, HandshakeError};
pub use heartbeat::PingHandler;

use crate::connection::Connection;
use crate::protocol::ClientFrame;
use crate::server::GatewayState;
use std::sync::Arc;

/// Dispatch incoming client frames to appropriate handlers
pub struct MessageDispatcher;

impl MessageDispatcher {
    /// Handle a parsed client frame
    pub async fn dispatch(
        state: &GatewayState,
        connection: &Arc<Connection>,
        frame: ClientFrame,
    ) -> HandlerResult<()> {
        tracing::trace!(
            connection_id = %connection.id(),
            frame = ?frame,
            "Received frame"
        );

        match frame {
            ClientFrame::Typing { chat_id, is_typing } => {
                ChatHandler::typing(state, connection, chat_id, is_typing).await
            }
            ClientFrame::JoinChat { chat_id } => ChatHandler::join(state, connection, chat_id).await,
            ClientFrame::LeaveChat { chat_id } => {
                ChatHandler::leave(state, connection, chat_id);
                Ok(())
            }
            ClientFrame::Ping => {
                PingHandler::handle(state, connection).await;
                Ok(())
            }
        }
    }
}
