//! Application configuration structs
//!
//! Loads configuration from environment variables (and a `.env` file if present).

use serde::Deserialize;
use std::env;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app: AppSettings,
    pub gateway: ServerConfig,
    pub database: DatabaseConfig,
    pub telegram: TelegramConfig,
    pub websocket: WebSocketConfig,
}

/// General application settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default = "default_env")]
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "production" => Some(Self::Production),
            "staging" => Some(Self::Staging),
            "development" => Some(Self::Development),
            _ => None,
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Database configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Telegram bot configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: String,
    /// Maximum age of Mini-App init data in seconds (0 disables the check)
    #[serde(default)]
    pub auth_max_age_secs: i64,
}

/// Realtime socket tuning
#[derive(Debug, Clone, Deserialize)]
pub struct WebSocketConfig {
    /// Upper bound on a single frame delivery to one connection
    #[serde(default = "default_send_timeout_ms")]
    pub send_timeout_ms: u64,
    /// Capacity of each connection's outbound queue
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer: usize,
    /// Upper bound on identity resolution before the socket is dropped
    #[serde(default = "default_handshake_timeout_ms")]
    pub handshake_timeout_ms: u64,
}

impl WebSocketConfig {
    #[must_use]
    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }

    #[must_use]
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            send_timeout_ms: default_send_timeout_ms(),
            outbound_buffer: default_outbound_buffer(),
            handshake_timeout_ms: default_handshake_timeout_ms(),
        }
    }
}

// Default value functions
fn default_app_name() -> String {
    "Aeon Messenger".to_string()
}

fn default_env() -> Environment {
    Environment::Development
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_max_connections() -> u32 {
    20
}

fn default_min_connections() -> u32 {
    1
}

fn default_send_timeout_ms() -> u64 {
    5_000
}

fn default_outbound_buffer() -> usize {
    256
}

fn default_handshake_timeout_ms() -> u64 {
    10_000
}

/// Hosted Postgres still hands out `postgres://` URLs; normalize to `postgresql://`
fn normalize_database_url(url: String) -> String {
    match url.strip_prefix("postgres://") {
        Some(rest) => format!("postgresql://{rest}"),
        None => url,
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if required environment variables are missing
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source
    pub fn from_lookup<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| var(key).filter(|s| !s.trim().is_empty());

        Ok(Self {
            app: AppSettings {
                name: var("APP_NAME").unwrap_or_else(default_app_name),
                env: var("APP_ENV")
                    .and_then(|s| Environment::parse(&s))
                    .unwrap_or_default(),
            },
            gateway: ServerConfig {
                host: var("GATEWAY_HOST")
                    .or_else(|| var("HOST"))
                    .unwrap_or_else(default_host),
                port: match var("GATEWAY_PORT").or_else(|| var("PORT")) {
                    Some(s) => s
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("GATEWAY_PORT", s))?,
                    None => default_port(),
                },
            },
            database: DatabaseConfig {
                url: non_empty("DATABASE_URL")
                    .map(normalize_database_url)
                    .ok_or(ConfigError::MissingVar("DATABASE_URL"))?,
                max_connections: var("DATABASE_MAX_CONNECTIONS")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_else(default_max_connections),
                min_connections: var("DATABASE_MIN_CONNECTIONS")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_else(default_min_connections),
            },
            telegram: TelegramConfig {
                bot_token: non_empty("TELEGRAM_BOT_TOKEN")
                    .ok_or(ConfigError::MissingVar("TELEGRAM_BOT_TOKEN"))?,
                auth_max_age_secs: var("TELEGRAM_AUTH_MAX_AGE_SECS")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(0),
            },
            websocket: WebSocketConfig {
                send_timeout_ms: var("WS_SEND_TIMEOUT_MS")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_else(default_send_timeout_ms),
                outbound_buffer: var("WS_OUTBOUND_BUFFER")
                    .and_then(|s| s.parse().ok())
                    .filter(|n: &usize| *n > 0)
                    .unwrap_or_else(default_outbound_buffer),
                handshake_timeout_ms: var("WS_HANDSHAKE_TIMEOUT_MS")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_else(default_handshake_timeout_ms),
            },
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
