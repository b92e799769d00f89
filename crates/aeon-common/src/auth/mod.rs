//! Authentication utilities

mod telegram;

pub use telegram::{AuthError, InitData, TelegramAuth, TelegramUser};
