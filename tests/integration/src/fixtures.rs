//! Test fixtures and data generators
//!
//! Provides reusable users, chats and signed init data for integration tests.

use std::sync::atomic::{AtomicI64, Ordering};

use aeon_common::TelegramAuth;
use aeon_core::{ChatId, TelegramId, UserId};

/// Bot token every test gateway validates against
pub const BOT_TOKEN: &str = "7000000001:INTEGRATION-TEST-TOKEN";

/// Counter for unique test data
static COUNTER: AtomicI64 = AtomicI64::new(1);

/// Get a unique number for test data
pub fn unique_suffix() -> i64 {
    COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// A user known to the directory
#[derive(Debug, Clone, Copy)]
pub struct TestUser {
    pub telegram_id: TelegramId,
    pub user_id: UserId,
}

impl TestUser {
    pub fn unique() -> Self {
        let suffix = unique_suffix();
        Self {
            telegram_id: TelegramId::new(500_000 + suffix),
            user_id: UserId::new(suffix),
        }
    }
}

/// Get a fresh chat id
pub fn unique_chat() -> ChatId {
    ChatId::new(10_000 + unique_suffix())
}

/// Init data for `telegram_id`, signed the way Telegram signs it
pub fn init_data_for(auth: &TelegramAuth, telegram_id: TelegramId) -> String {
    let user = format!(r#"{{"id":{telegram_id},"first_name":"Test","username":"tester{telegram_id}"}}"#);
    auth.sign(&[
        ("query_id", "AAHdF6IQAAAAAN0XohDhrOrc"),
        ("user", user.as_str()),
        ("auth_date", "1700000000"),
    ])
    .unwrap_or_default()
}
