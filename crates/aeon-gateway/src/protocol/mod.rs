//! Gateway protocol definitions
//!
//! Defines the JSON envelopes exchanged over the socket and the close codes.

mod close_codes;
mod frames;
mod messages;

pub use close_codes::CloseCode;
pub use frames::ClientFrame;
pub use messages::{Frame, ServerEvent};
