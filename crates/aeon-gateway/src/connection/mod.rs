//! Connection management
//!
//! Tracks live WebSocket connections and chat subscriptions, and delivers
//! frames to them.

mod connection;
mod registry;

pub use connection::{Connection, ConnectionId, ConnectionState, SendError};
pub use registry::{ConnectionRegistry, DisconnectOutcome, DEFAULT_SEND_TIMEOUT};
