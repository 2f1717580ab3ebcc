//! Client connection representation.
//!
//! This module defines the structure of individual client connections,
//! tracking their metadata, their outbox and the channel they joined.

use cubeworld_core::SessionId;
use std::net::SocketAddr;
use std::time::SystemTime;
use tokio::sync::mpsc::UnboundedSender;
use tokio_tungstenite::tungstenite::Message;

/// Represents an individual client connection to the server.
///
/// A connection starts without a channel. A successful join subscribes it
/// to the channel named by the new session's id.
#[derive(Debug)]
pub struct ClientConnection {
    /// The session channel this connection is subscribed to (None until joined)
    pub channel: Option<SessionId>,

    /// The remote network address of the client
    pub remote_addr: SocketAddr,

    /// When this connection was established
    pub connected_at: SystemTime,

    /// Frames queued for the connection's writer task
    outbox: UnboundedSender<Message>,

    /// Channel frames waiting for the reply to the pending join
    held: Option<Vec<Message>>,
}

impl ClientConnection {
    /// Creates a new, unsubscribed client connection.
    pub fn new(remote_addr: SocketAddr, outbox: UnboundedSender<Message>) -> Self {
        Self {
            channel: None,
            remote_addr,
            connected_at: SystemTime::now(),
            outbox,
            held: None,
        }
    }

    /// Queues a frame for delivery.
    ///
    /// Returns `false` once the writer task has gone away.
    pub fn enqueue(&self, message: Message) -> bool {
        self.outbox.send(message).is_ok()
    }

    /// Holds channel frames back until the next [`reply`](Self::reply).
    pub fn hold(&mut self) {
        self.held.get_or_insert_with(Vec::new);
    }

    /// Discards held frames and stops holding.
    pub fn discard_held(&mut self) {
        self.held = None;
    }

    /// Queues a channel frame, or keeps it back while a join is pending.
    pub fn push_event(&mut self, message: Message) -> bool {
        match &mut self.held {
            Some(held) => {
                held.push(message);
                true
            }
            None => self.enqueue(message),
        }
    }

    /// Queues a response frame followed by any frames held behind it.
    pub fn reply(&mut self, message: Message) -> bool {
        let delivered = self.enqueue(message);
        if let Some(held) = self.held.take() {
            for frame in held {
                if !self.enqueue(frame) {
                    break;
                }
            }
        }
        delivered
    }
}
