//! Integer identities
//!
//! Users, chats and messages are keyed by database integer IDs. Telegram
//! accounts carry their own numeric ID, resolved to a [`UserId`] at handshake.
//!
//! All IDs serialize as plain JSON numbers, matching what the Mini-App client
//! sends and expects.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error when parsing an ID from its string representation
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum IdParseError {
    #[error("invalid id format")]
    InvalidFormat,
}

macro_rules! integer_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Create from a raw i64 value
            #[inline]
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Get the inner i64 value
            #[inline]
            pub const fn into_inner(self) -> i64 {
                self.0
            }

            /// Check if the ID is zero (unset)
            #[inline]
            pub const fn is_zero(&self) -> bool {
                self.0 == 0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl std::str::FromStr for $name {
            type Err = IdParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse::<i64>().map(Self).map_err(|_| IdParseError::InvalidFormat)
            }
        }
    };
}

integer_id!(
    /// Identity of an authenticated user
    UserId
);

integer_id!(
    /// Identity of a conversation
    ChatId
);

integer_id!(
    /// Identity of a chat message
    MessageId
);

integer_id!(
    /// Telegram account ID carried in Mini-App init data
    TelegramId
);
