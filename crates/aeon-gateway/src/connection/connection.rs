//! Individual WebSocket connection
//!
//! Represents one authenticated socket as seen by the registry: its identity,
//! its outbound queue, and its lifecycle state.

use crate::protocol::Frame;
use aeon_core::UserId;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Notify};
use uuid::Uuid;

/// Opaque per-socket identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Generate a fresh identifier
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Identity resolved, not yet registered
    Connecting,
    /// Registered and receiving events
    Open,
    /// Torn down; no further frames are accepted
    Closed,
}

/// Why a frame could not be queued for a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    #[error("connection is closed")]
    Closed,
    #[error("send timed out")]
    Timeout,
    #[error("send queue is full")]
    Full,
}

/// A single WebSocket connection
pub struct Connection {
    id: ConnectionId,

    /// Resolved once at handshake and never changed
    user_id: UserId,

    /// Outbound queue drained by the socket writer
    sender: mpsc::Sender<Frame>,

    state: Mutex<ConnectionState>,

    /// Wakes whoever waits in [`Connection::closed`]
    closed: Notify,

    created_at: Instant,
}

impl Connection {
    /// Create a new connection in the `Connecting` state
    pub fn new(user_id: UserId, sender: mpsc::Sender<Frame>) -> Arc<Self> {
        Arc::new(Self {
            id: ConnectionId::generate(),
            user_id,
            sender,
            state: Mutex::new(ConnectionState::Connecting),
            closed: Notify::new(),
            created_at: Instant::now(),
        })
    }

    /// Get the connection ID
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Get the user this connection belongs to
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Get the current state
    pub fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    /// Check if the connection has been closed
    pub fn is_closed(&self) -> bool {
        self.state() == ConnectionState::Closed
    }

    /// Move from `Connecting` to `Open`; returns false if already closed
    pub(crate) fn open(&self) -> bool {
        let mut state = self.state.lock();
        match *state {
            ConnectionState::Closed => false,
            _ => {
                *state = ConnectionState::Open;
                true
            }
        }
    }

    /// Close the connection
    ///
    /// Returns true only for the call that performed the transition.
    pub fn close(&self) -> bool {
        {
            let mut state = self.state.lock();
            if *state == ConnectionState::Closed {
                return false;
            }
            *state = ConnectionState::Closed;
        }
        self.closed.notify_waiters();
        true
    }

    /// Wait until the connection is closed
    pub async fn closed(&self) {
        loop {
            let notified = self.closed.notified();
            if self.is_closed() {
                return;
            }
            notified.await;
        }
    }

    /// Get connection age
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Queue a frame, waiting at most `timeout` for room in the queue
    pub async fn send(&self, frame: Frame, timeout: Duration) -> Result<(), SendError> {
        if self.is_closed() {
            return Err(SendError::Closed);
        }
        match tokio::time::timeout(timeout, self.sender.send(frame)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(SendError::Closed),
            Err(_) => Err(SendError::Timeout),
        }
    }

    /// Queue a frame only if there is room right now
    pub fn try_send(&self, frame: Frame) -> Result<(), SendError> {
        if self.is_closed() {
            return Err(SendError::Closed);
        }
        self.sender.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => SendError::Full,
            TrySendError::Closed(_) => SendError::Closed,
        })
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("user_id", &self.user_id)
            .field("state", &self.state())
            .field("created_at", &self.created_at)
            .finish()
    }
}
