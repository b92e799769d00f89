//! Connection handshake
//!
//! Resolves the user behind an upgrade request from the Mini-App init data
//! carried in the `init_data` query parameter.

use crate::protocol::CloseCode;
use aeon_common::{AuthError, TelegramAuth};
use aeon_core::{DomainError, TelegramId, UserId, UserRepository};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Query parameters of the upgrade request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConnectParams {
    #[serde(default)]
    pub init_data: Option<String>,
}

/// Why a socket was refused
#[derive(Debug, Error)]
pub enum HandshakeError {
    #[error("init data missing")]
    MissingInitData,

    #[error("init data rejected: {0}")]
    InvalidInitData(#[from] AuthError),

    #[error("init data carries no user id")]
    MissingUserId,

    #[error("no user registered for Telegram account {0}")]
    UnknownUser(TelegramId),

    #[error("user lookup failed: {0}")]
    Directory(DomainError),

    #[error("handshake timed out")]
    Timeout,
}

impl HandshakeError {
    /// Close code sent to the client
    pub fn close_code(&self) -> CloseCode {
        match self {
            Self::MissingInitData
            | Self::InvalidInitData(_)
            | Self::MissingUserId
            | Self::UnknownUser(_) => CloseCode::AuthenticationFailed,
            Self::Directory(_) => CloseCode::ServerError,
            Self::Timeout => CloseCode::HandshakeTimeout,
        }
    }

    /// Close reason sent to the client
    pub fn reason(&self) -> &'static str {
        match self {
            Self::MissingInitData => "Missing authorization data",
            Self::InvalidInitData(_) => "Invalid authorization data",
            Self::MissingUserId => "Missing user id",
            Self::UnknownUser(_) => "User not found",
            Self::Directory(_) => "Server error",
            Self::Timeout => "Handshake timed out",
        }
    }
}

/// Resolves the identity of incoming sockets
pub struct Handshake {
    auth: TelegramAuth,
    users: Arc<dyn UserRepository>,
    timeout: Duration,
}

impl Handshake {
    /// Create a handshake over a validator and a user directory
    pub fn new(auth: TelegramAuth, users: Arc<dyn UserRepository>, timeout: Duration) -> Self {
        Self {
            auth,
            users,
            timeout,
        }
    }

    /// Resolve the user for a connection attempt, bounded by the handshake timeout
    pub async fn resolve(&self, params: &ConnectParams) -> Result<UserId, HandshakeError> {
        tokio::time::timeout(self.timeout, self.resolve_identity(params))
            .await
            .map_err(|_| HandshakeError::Timeout)?
    }

    async fn resolve_identity(&self, params: &ConnectParams) -> Result<UserId, HandshakeError> {
        let raw = params
            .init_data
            .as_deref()
            .filter(|raw| !raw.is_empty())
            .ok_or(HandshakeError::MissingInitData)?;

        let init_data = self.auth.validate(raw)?;
        let telegram_id = init_data
            .telegram_id()
            .ok_or(HandshakeError::MissingUserId)?;

        match self.users.find_id_by_telegram_id(telegram_id).await {
            Ok(Some(user_id)) => Ok(user_id),
            Ok(None) => Err(HandshakeError::UnknownUser(telegram_id)),
            Err(e) if e.is_not_found() => Err(HandshakeError::UnknownUser(telegram_id)),
            Err(e) => Err(HandshakeError::Directory(e)),
        }
    }
}

impl std::fmt::Debug for Handshake {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handshake")
            .field("auth", &self.auth)
            .field("timeout", &self.timeout)
            .finish()
    }
}
