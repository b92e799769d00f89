//! Telegram Mini-App init data validation
//!
//! The Mini-App passes Telegram's signed `initData` string to the backend.
//! Validation follows Telegram's scheme:
//!
//! - the secret key is `HMAC-SHA256(key = "WebAppData", msg = bot_token)`
//! - the data-check string is every field except `hash`, formatted as
//!   `key=value`, sorted by key and joined with `\n`
//! - `hash` must equal the hex `HMAC-SHA256(secret_key, data_check_string)`

use std::collections::BTreeMap;

use aeon_core::TelegramId;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use url::form_urlencoded;

type HmacSha256 = Hmac<Sha256>;

const WEB_APP_DATA_KEY: &[u8] = b"WebAppData";

/// Telegram user object embedded in init data
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TelegramUser {
    pub id: Option<TelegramId>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub language_code: Option<String>,
    #[serde(default)]
    pub is_premium: bool,
    #[serde(default)]
    pub photo_url: Option<String>,
}

/// Validated init data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitData {
    pub user: Option<TelegramUser>,
    /// Unix timestamp of when Telegram issued the data (0 if absent)
    pub auth_date: i64,
    pub query_id: Option<String>,
    pub start_param: Option<String>,
}

impl InitData {
    /// Telegram ID of the user, if the data carries one
    #[must_use]
    pub fn telegram_id(&self) -> Option<TelegramId> {
        self.user.as_ref().and_then(|u| u.id)
    }
}

/// Init data validation errors
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Init data has no hash")]
    MissingHash,

    #[error("Init data signature mismatch")]
    InvalidSignature,

    #[error("Invalid user payload: {0}")]
    InvalidUser(String),

    #[error("Init data expired")]
    Expired,

    #[error("Invalid HMAC key")]
    InvalidKey,
}

/// Validates init data signed with a bot token
#[derive(Clone)]
pub struct TelegramAuth {
    secret_key: Vec<u8>,
    max_age_secs: Option<i64>,
}

impl TelegramAuth {
    /// Create a validator for the given bot token
    pub fn new(bot_token: &str) -> Result<Self, AuthError> {
        let secret_key = hmac_sha256(WEB_APP_DATA_KEY, bot_token.as_bytes())?;
        Ok(Self {
            secret_key,
            max_age_secs: None,
        })
    }

    /// Reject init data whose `auth_date` is older than `max_age_secs`
    ///
    /// A value of zero or less disables the check.
    pub fn with_max_age(mut self, max_age_secs: i64) -> Self {
        self.max_age_secs = (max_age_secs > 0).then_some(max_age_secs);
        self
    }

    /// Validate a raw init data query string
    pub fn validate(&self, init_data: &str) -> Result<InitData, AuthError> {
        let mut fields: BTreeMap<String, String> = form_urlencoded::parse(init_data.as_bytes())
            .into_owned()
            .collect();

        let received = fields.remove("hash").ok_or(AuthError::MissingHash)?;
        let received = hex::decode(received).map_err(|_| AuthError::InvalidSignature)?;

        let mut mac =
            HmacSha256::new_from_slice(&self.secret_key).map_err(|_| AuthError::InvalidKey)?;
        mac.update(data_check_string(&fields).as_bytes());
        mac.verify_slice(&received)
            .map_err(|_| AuthError::InvalidSignature)?;

        let user = fields
            .get("user")
            .map(|raw| serde_json::from_str::<TelegramUser>(raw))
            .transpose()
            .map_err(|e| AuthError::InvalidUser(e.to_string()))?;

        let auth_date = fields
            .get("auth_date")
            .and_then(|s| s.parse::<i64>().ok())
            .unwrap_or(0);

        if let Some(max_age) = self.max_age_secs {
            if Utc::now().timestamp() - auth_date > max_age {
                return Err(AuthError::Expired);
            }
        }

        Ok(InitData {
            user,
            auth_date,
            query_id: fields.remove("query_id"),
            start_param: fields.remove("start_param"),
        })
    }

    /// Produce a signed init data string from `fields`
    ///
    /// This is what Telegram does on the client side; it is exposed for test
    /// clients and local tooling.
    pub fn sign(&self, fields: &[(&str, &str)]) -> Result<String, AuthError> {
        let sorted: BTreeMap<String, String> = fields
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        let hash = hmac_sha256(&self.secret_key, data_check_string(&sorted).as_bytes())?;

        Ok(form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields.iter().copied())
            .append_pair("hash", &hex::encode(hash))
            .finish())
    }
}

impl std::fmt::Debug for TelegramAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramAuth")
            .field("max_age_secs", &self.max_age_secs)
            .finish()
    }
}

fn data_check_string(fields: &BTreeMap<String, String>) -> String {
    fields
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn hmac_sha256(key: &[u8], msg: &[u8]) -> Result<Vec<u8>, AuthError> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| AuthError::InvalidKey)?;
    mac.update(msg);
    Ok(mac.finalize().into_bytes().to_vec())
}
