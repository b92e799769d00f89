//! Client frames
//!
//! Inbound text frames from the Mini-App. Anything that does not parse into a
//! known frame is dropped without a reply.

use aeon_core::ChatId;
use serde::{Deserialize, Serialize};

/// A frame sent by a client over an open connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    Typing {
        chat_id: ChatId,
        #[serde(default)]
        is_typing: bool,
    },
    JoinChat {
        chat_id: ChatId,
    },
    LeaveChat {
        chat_id: ChatId,
    },
    Ping,
}

impl ClientFrame {
    /// Parse a text frame, returning `None` for malformed or unknown input
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        serde_json::from_str(text).ok()
    }
}
