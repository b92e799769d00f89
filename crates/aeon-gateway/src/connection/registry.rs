//! Connection registry
//!
//! Tracks which sockets belong to which user and which users are subscribed
//! to which chats, and fans frames out to them.
//!
//! All three indexes live behind one mutex so every mutation is observed
//! atomically. The lock is never held across an await: recipients are copied
//! out first and frames are delivered after it is released.

use super::{Connection, ConnectionId, SendError};
use crate::protocol::{Frame, ServerEvent};
use aeon_core::{ChatId, UserId};
use futures::future::join_all;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

/// Default upper bound on a single delivery
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Result of removing a connection from the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectOutcome {
    /// The connection was not (or no longer) registered; nothing changed
    NotRegistered,
    /// The user still has other live connections
    StillOnline { remaining: usize },
    /// That was the user's last connection; these were their subscriptions
    WentOffline { chats: Vec<ChatId> },
}

#[derive(Debug, Default)]
struct Indexes {
    connections: HashMap<UserId, HashMap<ConnectionId, Arc<Connection>>>,
    chat_members: HashMap<ChatId, HashSet<UserId>>,
    user_chats: HashMap<UserId, HashSet<ChatId>>,
}

impl Indexes {
    fn live_connections(&self, user_id: UserId) -> impl Iterator<Item = &Arc<Connection>> {
        self.connections
            .get(&user_id)
            .into_iter()
            .flat_map(HashMap::values)
    }

    fn remove_connection(&mut self, user_id: UserId, id: ConnectionId) -> bool {
        let Some(set) = self.connections.get_mut(&user_id) else {
            return false;
        };
        let removed = set.remove(&id).is_some();
        if set.is_empty() {
            self.connections.remove(&user_id);
        }
        removed
    }

    fn subscribe(&mut self, user_id: UserId, chat_id: ChatId) {
        self.chat_members.entry(chat_id).or_default().insert(user_id);
        self.user_chats.entry(user_id).or_default().insert(chat_id);
    }

    fn unsubscribe(&mut self, user_id: UserId, chat_id: ChatId) {
        if let Some(members) = self.chat_members.get_mut(&chat_id) {
            members.remove(&user_id);
            if members.is_empty() {
                self.chat_members.remove(&chat_id);
            }
        }
        if let Some(chats) = self.user_chats.get_mut(&user_id) {
            chats.remove(&chat_id);
            if chats.is_empty() {
                self.user_chats.remove(&user_id);
            }
        }
    }

    /// Drop every subscription of a user, returning the chats they were in
    fn drop_subscriptions(&mut self, user_id: UserId) -> Vec<ChatId> {
        let mut chats: Vec<ChatId> = self
            .user_chats
            .remove(&user_id)
            .map(|chats| chats.into_iter().collect())
            .unwrap_or_default();
        chats.sort_unstable();

        for chat_id in &chats {
            if let Some(members) = self.chat_members.get_mut(chat_id) {
                members.remove(&user_id);
                if members.is_empty() {
                    self.chat_members.remove(chat_id);
                }
            }
        }
        chats
    }
}

/// Registry of live connections and chat subscriptions
pub struct ConnectionRegistry {
    indexes: Mutex<Indexes>,
    send_timeout: Duration,
}

impl ConnectionRegistry {
    /// Create a new registry
    #[must_use]
    pub fn new(send_timeout: Duration) -> Self {
        Self {
            indexes: Mutex::new(Indexes::default()),
            send_timeout,
        }
    }

    /// Create a new registry wrapped in Arc
    #[must_use]
    pub fn new_shared(send_timeout: Duration) -> Arc<Self> {
        Arc::new(Self::new(send_timeout))
    }

    /// Upper bound on a single delivery
    pub fn send_timeout(&self) -> Duration {
        self.send_timeout
    }

    /// Register an opened connection and greet it
    ///
    /// The greeting is queued before the connection becomes visible to any
    /// fan-out, so it is always the first frame the client sees. Returns true
    /// if this is the user's only live connection, i.e. the user just came
    /// online.
    pub fn connect(&self, connection: Arc<Connection>) -> bool {
        let user_id = connection.user_id();
        if !connection.open() {
            tracing::debug!(connection_id = %connection.id(), "Refusing closed connection");
            return false;
        }

        let greeted = ServerEvent::connection_established(user_id)
            .to_frame()
            .map_err(|e| e.to_string())
            .and_then(|frame| connection.try_send(frame).map_err(|e| e.to_string()));
        if let Err(e) = greeted {
            tracing::warn!(
                user_id = %user_id,
                connection_id = %connection.id(),
                error = %e,
                "Failed to greet connection"
            );
            connection.close();
            return false;
        }

        let came_online = {
            let mut indexes = self.indexes.lock();
            let set = indexes.connections.entry(user_id).or_default();
            set.insert(connection.id(), connection.clone());
            set.len() == 1
        };

        tracing::info!(
            user_id = %user_id,
            connection_id = %connection.id(),
            came_online,
            "Connection registered"
        );

        came_online
    }

    /// Remove a connection
    ///
    /// When it was the user's last live connection, every chat subscription of
    /// the user is dropped in the same critical section and returned.
    pub fn disconnect(&self, connection: &Connection) -> DisconnectOutcome {
        let user_id = connection.user_id();
        let mut indexes = self.indexes.lock();

        let removed = indexes.remove_connection(user_id, connection.id());
        let remaining = indexes.connections.get(&user_id).map_or(0, HashMap::len);

        let outcome = if remaining > 0 {
            if removed {
                DisconnectOutcome::StillOnline { remaining }
            } else {
                DisconnectOutcome::NotRegistered
            }
        } else if removed || indexes.user_chats.contains_key(&user_id) {
            // A reaped connection is already gone from the set but its user may
            // still hold subscriptions.
            DisconnectOutcome::WentOffline {
                chats: indexes.drop_subscriptions(user_id),
            }
        } else {
            DisconnectOutcome::NotRegistered
        };
        drop(indexes);

        tracing::debug!(
            user_id = %user_id,
            connection_id = %connection.id(),
            outcome = ?outcome,
            "Connection removed"
        );

        outcome
    }

    /// Subscribe a user to a chat (idempotent)
    pub fn join_chat(&self, user_id: UserId, chat_id: ChatId) {
        self.indexes.lock().subscribe(user_id, chat_id);
        tracing::trace!(user_id = %user_id, chat_id = %chat_id, "User joined chat");
    }

    /// Unsubscribe a user from a chat (no-op when not subscribed)
    pub fn leave_chat(&self, user_id: UserId, chat_id: ChatId) {
        self.indexes.lock().unsubscribe(user_id, chat_id);
        tracing::trace!(user_id = %user_id, chat_id = %chat_id, "User left chat");
    }

    /// Send an event to every live connection of a user
    pub async fn send_to_user(&self, event: &ServerEvent, user_id: UserId) -> usize {
        let targets: Vec<Arc<Connection>> =
            self.indexes.lock().live_connections(user_id).cloned().collect();
        self.fan_out(event, targets).await
    }

    /// Send an event to one specific connection
    pub async fn send_to_connection(&self, event: &ServerEvent, connection: &Arc<Connection>) -> bool {
        self.fan_out(event, vec![connection.clone()]).await == 1
    }

    /// Send an event to every subscriber of a chat, optionally skipping one user
    pub async fn send_to_chat(
        &self,
        event: &ServerEvent,
        chat_id: ChatId,
        exclude_user: Option<UserId>,
    ) -> usize {
        self.send_to_chats(event, &[chat_id], exclude_user).await
    }

    /// Send an event once to every subscriber of any of `chats`
    pub async fn send_to_chats(
        &self,
        event: &ServerEvent,
        chats: &[ChatId],
        exclude_user: Option<UserId>,
    ) -> usize {
        let targets = self.chat_targets(chats, exclude_user);
        self.fan_out(event, targets).await
    }

    fn chat_targets(&self, chats: &[ChatId], exclude_user: Option<UserId>) -> Vec<Arc<Connection>> {
        let indexes = self.indexes.lock();
        let recipients: HashSet<UserId> = chats
            .iter()
            .filter_map(|chat_id| indexes.chat_members.get(chat_id))
            .flatten()
            .copied()
            .filter(|user_id| Some(*user_id) != exclude_user)
            .collect();

        recipients
            .into_iter()
            .flat_map(|user_id| indexes.live_connections(user_id).cloned())
            .collect()
    }

    async fn fan_out(&self, event: &ServerEvent, targets: Vec<Arc<Connection>>) -> usize {
        if targets.is_empty() {
            return 0;
        }
        let frame = match event.to_frame() {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!(event = event.event_type(), error = %e, "Failed to serialize event");
                return 0;
            }
        };
        let delivered = self.deliver(&frame, &targets).await;

        tracing::trace!(
            event = event.event_type(),
            targets = targets.len(),
            delivered,
            "Event fanned out"
        );

        delivered
    }

    /// Deliver a frame to all targets concurrently and reap the ones that fail
    async fn deliver(&self, frame: &Frame, targets: &[Arc<Connection>]) -> usize {
        let timeout = self.send_timeout;
        let results = join_all(
            targets
                .iter()
                .map(|connection| connection.send(frame.clone(), timeout)),
        )
        .await;

        let mut delivered = 0;
        let mut dead = Vec::new();
        for (connection, result) in targets.iter().zip(results) {
            match result {
                Ok(()) => delivered += 1,
                Err(e) => {
                    if e == SendError::Timeout {
                        tracing::warn!(
                            user_id = %connection.user_id(),
                            connection_id = %connection.id(),
                            "Slow consumer, dropping connection"
                        );
                    } else {
                        tracing::debug!(
                            user_id = %connection.user_id(),
                            connection_id = %connection.id(),
                            error = %e,
                            "Dropping dead connection"
                        );
                    }
                    dead.push(connection.clone());
                }
            }
        }

        if !dead.is_empty() {
            self.reap(&dead);
        }
        delivered
    }

    /// Forget failed connections and mark them closed
    ///
    /// Subscriptions are left alone; the socket task owning each connection
    /// performs the full disconnect once it observes the close.
    fn reap(&self, dead: &[Arc<Connection>]) {
        {
            let mut indexes = self.indexes.lock();
            for connection in dead {
                indexes.remove_connection(connection.user_id(), connection.id());
            }
        }
        for connection in dead {
            connection.close();
        }
    }

    /// Check if a user has at least one live connection
    pub fn is_online(&self, user_id: UserId) -> bool {
        self.indexes.lock().connections.contains_key(&user_id)
    }

    /// Get the total number of live connections
    pub fn connection_count(&self) -> usize {
        self.indexes
            .lock()
            .connections
            .values()
            .map(HashMap::len)
            .sum()
    }

    /// Get the number of users with live connections
    pub fn user_count(&self) -> usize {
        self.indexes.lock().connections.len()
    }

    /// Get the number of chats with at least one subscriber
    pub fn chat_count(&self) -> usize {
        self.indexes.lock().chat_members.len()
    }

    /// Get the subscribers of a chat, sorted
    pub fn chat_members(&self, chat_id: ChatId) -> Vec<UserId> {
        let mut members: Vec<UserId> = self
            .indexes
            .lock()
            .chat_members
            .get(&chat_id)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default();
        members.sort_unstable();
        members
    }

    /// Get the chats a user is subscribed to, sorted
    pub fn user_chats(&self, user_id: UserId) -> Vec<ChatId> {
        let mut chats: Vec<ChatId> = self
            .indexes
            .lock()
            .user_chats
            .get(&user_id)
            .map(|chats| chats.iter().copied().collect())
            .unwrap_or_default();
        chats.sort_unstable();
        chats
    }

    /// Get all live connections of a user
    pub fn user_connections(&self, user_id: UserId) -> Vec<Arc<Connection>> {
        self.indexes.lock().live_connections(user_id).cloned().collect()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_SEND_TIMEOUT)
    }
}

impl std::fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let indexes = self.indexes.lock();
        f.debug_struct("ConnectionRegistry")
            .field("users", &indexes.connections.len())
            .field("chats", &indexes.chat_members.len())
            .field("send_timeout", &self.send_timeout)
            .finish()
    }
}
