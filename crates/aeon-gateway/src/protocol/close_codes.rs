//! WebSocket close codes
//!
//! Application-range codes sent when the gateway refuses or drops a socket.

use std::fmt;

/// Gateway WebSocket close codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum CloseCode {
    /// Identity could not be resolved for reasons unrelated to credentials
    ServerError = 4000,
    /// Init data missing, forged, or naming an unknown user
    AuthenticationFailed = 4001,
    /// Identity resolution did not finish in time
    HandshakeTimeout = 4008,
}

impl CloseCode {
    /// Create a `CloseCode` from a raw u16 value
    #[must_use]
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            4000 => Some(Self::ServerError),
            4001 => Some(Self::AuthenticationFailed),
            4008 => Some(Self::HandshakeTimeout),
            _ => None,
        }
    }

    /// Get the raw u16 value
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Check if the client should attempt to reconnect after this close code
    #[must_use]
    pub const fn should_reconnect(self) -> bool {
        matches!(self, Self::ServerError | Self::HandshakeTimeout)
    }

    /// Get a human-readable description
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::ServerError => "Server error",
            Self::AuthenticationFailed => "Authentication failed",
            Self::HandshakeTimeout => "Handshake timed out",
        }
    }
}

impl fmt::Display for CloseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.description(), self.as_u16())
    }
}

impl From<CloseCode> for u16 {
    fn from(code: CloseCode) -> Self {
        code.as_u16()
    }
}
