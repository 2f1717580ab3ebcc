//! Connection manager for tracking client connections and their channels.
//!
//! This module provides the central management system for all client
//! connections, handling connection lifecycle, channel subscriptions and
//! message delivery.

use super::{client::ClientConnection, ConnectionId};
use cubeworld_core::{BusError, SessionId};
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

/// Central manager for all client connections.
///
/// The `ConnectionManager` tracks active connections, assigns unique IDs,
/// keeps the channel subscriptions created by successful joins and delivers
/// frames into per-connection outboxes.
///
/// # Architecture
///
/// * Uses `RwLock<HashMap>` for connection and subscription storage
/// * Never holds both locks at once
/// * Each connection owns an unbounded outbox drained by its writer task
/// * Removing the last subscriber of a channel reports the channel vacated
#[derive(Debug)]
pub struct ConnectionManager {
    /// Map of connection ID to client connection information
    connections: Arc<RwLock<HashMap<ConnectionId, ClientConnection>>>,

    /// Subscribers of each session channel
    channels: Arc<RwLock<HashMap<SessionId, HashSet<ConnectionId>>>>,

    /// Atomic counter for generating unique connection IDs
    next_id: AtomicUsize,

    /// Channels whose last subscriber went away
    vacancy_sender: mpsc::UnboundedSender<SessionId>,
    vacancy_receiver: Mutex<Option<mpsc::UnboundedReceiver<SessionId>>>,
}

impl ConnectionManager {
    /// Creates a new connection manager with no connections.
    pub fn new() -> Self {
        let (vacancy_sender, vacancy_receiver) = mpsc::unbounded_channel();
        Self {
            connections: Arc::new(RwLock::new(HashMap::new())),
            channels: Arc::new(RwLock::new(HashMap::new())),
            next_id: AtomicUsize::new(1),
            vacancy_sender,
            vacancy_receiver: Mutex::new(Some(vacancy_receiver)),
        }
    }

    /// Adds a new connection and returns its unique ID together with the
    /// receiving end of its outbox.
    pub async fn add_connection(
        &self,
        remote_addr: SocketAddr,
    ) -> (ConnectionId, mpsc::UnboundedReceiver<Message>) {
        let connection_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (outbox, receiver) = mpsc::unbounded_channel();
        let connection = ClientConnection::new(remote_addr, outbox);
        self.connections.write().await.insert(connection_id, connection);
        info!("🔗 Connection {} from {}", connection_id, remote_addr);
        (connection_id, receiver)
    }

    /// Removes a connection from the manager.
    ///
    /// If the connection was the last subscriber of its channel, the channel
    /// is reported on the vacancy stream.
    pub async fn remove_connection(&self, connection_id: ConnectionId) {
        let removed = self.connections.write().await.remove(&connection_id);
        let Some(connection) = removed else {
            return;
        };
        info!(
            "❌ Connection {} from {} disconnected",
            connection_id, connection.remote_addr
        );

        if let Some(channel) = connection.channel {
            if self.drop_subscriber(channel, connection_id).await {
                debug!("📭 Channel {} vacated", channel);
                if self.vacancy_sender.send(channel).is_err() {
                    warn!("⚠️ Vacancy of channel {} went unobserved", channel);
                }
            }
        }
    }

    /// Subscribes a connection to `channel`.
    ///
    /// Returns `false` if the connection is unknown.
    pub async fn subscribe(&self, connection_id: ConnectionId, channel: SessionId) -> bool {
        self.subscribe_with(connection_id, channel, false).await
    }

    /// Subscribes a connection whose join is still in flight.
    ///
    /// Frames for `channel` are held back until the next
    /// [`send_to_connection`](Self::send_to_connection), so the join reply
    /// reaches the client before any event raised after it.
    pub async fn subscribe_pending(&self, connection_id: ConnectionId, channel: SessionId) -> bool {
        self.subscribe_with(connection_id, channel, true).await
    }

    async fn subscribe_with(&self, connection_id: ConnectionId, channel: SessionId, hold: bool) -> bool {
        {
            let mut connections = self.connections.write().await;
            match connections.get_mut(&connection_id) {
                Some(connection) => {
                    connection.channel = Some(channel);
                    if hold {
                        connection.hold();
                    }
                }
                None => return false,
            }
        }
        self.channels
            .write()
            .await
            .entry(channel)
            .or_default()
            .insert(connection_id);
        debug!("📬 Connection {} subscribed to {}", connection_id, channel);
        true
    }

    /// Drops a connection's subscription without reporting a vacancy.
    ///
    /// Used when the join that created the subscription was rejected.
    pub async fn unsubscribe(&self, connection_id: ConnectionId) {
        let channel = {
            let mut connections = self.connections.write().await;
            connections.get_mut(&connection_id).and_then(|connection| {
                connection.discard_held();
                connection.channel.take()
            })
        };
        if let Some(channel) = channel {
            self.drop_subscriber(channel, connection_id).await;
        }
    }

    /// Removes one subscriber; returns true if the channel is now empty.
    async fn drop_subscriber(&self, channel: SessionId, connection_id: ConnectionId) -> bool {
        let mut channels = self.channels.write().await;
        let Some(subscribers) = channels.get_mut(&channel) else {
            return false;
        };
        subscribers.remove(&connection_id);
        if subscribers.is_empty() {
            channels.remove(&channel);
            true
        } else {
            false
        }
    }

    /// The channel a connection is subscribed to, if any.
    pub async fn channel_of(&self, connection_id: ConnectionId) -> Option<SessionId> {
        let connections = self.connections.read().await;
        connections.get(&connection_id).and_then(|c| c.channel)
    }

    /// Queues a frame for a specific connection.
    ///
    /// Returns `false` if the connection is unknown or its writer is gone.
    pub async fn send_message(&self, connection_id: ConnectionId, message: Message) -> bool {
        let connections = self.connections.read().await;
        match connections.get(&connection_id) {
            Some(connection) => connection.enqueue(message),
            None => false,
        }
    }

    /// Queues a response frame for a specific connection, followed by any
    /// channel frames held since a pending subscription.
    pub async fn send_to_connection(&self, connection_id: ConnectionId, text: String) -> bool {
        let delivered = {
            let mut connections = self.connections.write().await;
            match connections.get_mut(&connection_id) {
                Some(connection) => connection.reply(Message::Text(text.into())),
                None => false,
            }
        };
        if !delivered {
            tracing::error!("Failed to send message to connection {}", connection_id);
        }
        delivered
    }

    /// Queues a text frame for every subscriber of `channel`.
    ///
    /// Returns the number of connections the frame was queued for.
    pub async fn send_to_channel(&self, channel: &SessionId, text: &str) -> Result<usize, BusError> {
        let subscribers: Vec<ConnectionId> = {
            let channels = self.channels.read().await;
            match channels.get(channel) {
                Some(subscribers) if !subscribers.is_empty() => subscribers.iter().copied().collect(),
                _ => return Err(BusError::ChannelClosed(*channel)),
            }
        };

        let mut connections = self.connections.write().await;
        let mut delivered = 0;
        for id in &subscribers {
            if let Some(connection) = connections.get_mut(id) {
                if connection.push_event(Message::Text(text.to_owned().into())) {
                    delivered += 1;
                }
            }
        }

        if delivered == 0 {
            return Err(BusError::Transport(format!(
                "no live writer for channel {channel}"
            )));
        }
        Ok(delivered)
    }

    /// Hands out the stream of vacated channels.
    ///
    /// Only the first caller receives it; later calls return `None`.
    pub async fn take_vacancy_receiver(&self) -> Option<mpsc::UnboundedReceiver<SessionId>> {
        self.vacancy_receiver.lock().await.take()
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    pub async fn channel_count(&self) -> usize {
        self.channels.read().await.len()
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}
