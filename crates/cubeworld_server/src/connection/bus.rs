//! WebSocket-backed implementation of the world event bus.
//!
//! This module provides the [`EventBus`] implementation that integrates the
//! connection manager with the coordinator, serializing world events and
//! queueing them on every connection subscribed to the target channel.

use super::manager::ConnectionManager;
use async_trait::async_trait;
use cubeworld_core::{BusError, EventBus, SessionId, WorldEvent};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Channel bus over the server's WebSocket connections.
///
/// A channel is named by a session id and its subscribers are the
/// connections that joined as that session. Sends only enqueue, so the
/// coordinator never waits on a slow socket while it holds the world lock.
#[derive(Clone, Debug)]
pub struct ChannelBus {
    connection_manager: Arc<ConnectionManager>,
}

impl ChannelBus {
    pub fn new(connection_manager: Arc<ConnectionManager>) -> Self {
        Self { connection_manager }
    }

    /// Stream of channels whose last subscriber disconnected.
    ///
    /// Only the first caller receives it.
    pub async fn take_vacancy_receiver(&self) -> Option<mpsc::UnboundedReceiver<SessionId>> {
        self.connection_manager.take_vacancy_receiver().await
    }
}

#[async_trait]
impl EventBus for ChannelBus {
    async fn send_to(&self, channel: &SessionId, event: &WorldEvent) -> Result<(), BusError> {
        let payload = event.to_json().map_err(|e| BusError::Encode(e.to_string()))?;
        let delivered = self.connection_manager.send_to_channel(channel, &payload).await?;
        tracing::trace!(
            "🔧 ChannelBus: '{}' queued for {} connection(s) on {}",
            event.kind(),
            delivered,
            channel
        );
        Ok(())
    }
}
