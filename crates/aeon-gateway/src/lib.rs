//! # aeon-gateway
//!
//! Realtime WebSocket gateway for the Aeon messenger: tracks live
//! connections and chat subscriptions and fans events out to them.

pub mod broadcast;
pub mod connection;
pub mod handlers;
pub mod protocol;
pub mod server;

pub use broadcast::EventRouter;
pub use connection::{Connection, ConnectionRegistry, DisconnectOutcome};
pub use protocol::{ClientFrame, CloseCode, ServerEvent};
pub use server::{create_app, create_gateway_state, run, GatewayState};
