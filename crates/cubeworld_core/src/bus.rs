//! Event bus capability and fan-out.
//!
//! The coordinator never talks to a transport directly. It hands events to an
//! [`EventBus`], addressing each recipient by its [`SessionId`] (the session's
//! channel name). The [`Broadcaster`] performs the "everyone but the
//! originator" fan-out on top of it.

use crate::error::BusError;
use crate::events::WorldEvent;
use crate::registry::SessionRegistry;
use crate::stats::CoordinatorStats;
use crate::types::SessionId;
use async_trait::async_trait;
use futures::future::join_all;
use std::sync::{Arc, Mutex};
use tracing::{debug, error};

/// Delivery capability of the external pub/sub bus.
///
/// Implementations should enqueue and return promptly: the coordinator calls
/// this while holding the world lock. Delivery guarantees (at-least-once, no
/// cross-kind ordering) are whatever the implementation provides.
#[async_trait]
pub trait EventBus: Send + Sync + std::fmt::Debug {
    /// Sends `event` on `channel`.
    async fn send_to(&self, channel: &SessionId, event: &WorldEvent) -> Result<(), BusError>;
}

/// Result of one fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
    pub delivered: usize,
    pub failed: usize,
}

/// Fans events out to every live session except the originator.
#[derive(Debug, Clone)]
pub struct Broadcaster {
    bus: Arc<dyn EventBus>,
    stats: Arc<CoordinatorStats>,
}

impl Broadcaster {
    pub fn new(bus: Arc<dyn EventBus>, stats: Arc<CoordinatorStats>) -> Self {
        Self { bus, stats }
    }

    /// Delivers `event` to all sessions in `registry` other than `origin`.
    ///
    /// Fire-and-forget: a failed recipient is logged and counted, the others
    /// still receive the event and nothing is retried.
    pub async fn broadcast(
        &self,
        registry: &SessionRegistry,
        origin: &SessionId,
        event: &WorldEvent,
    ) -> Delivery {
        let recipients: Vec<SessionId> = registry
            .session_ids()
            .iter()
            .filter(|id| *id != origin)
            .copied()
            .collect();

        let results = join_all(recipients.iter().map(|channel| {
            let bus = self.bus.clone();
            async move { (channel, bus.send_to(channel, event).await) }
        }))
        .await;

        let mut delivery = Delivery::default();
        for (channel, result) in results {
            match result {
                Ok(()) => delivery.delivered += 1,
                Err(e) => {
                    delivery.failed += 1;
                    error!("Failed to deliver '{}' to channel {}: {}", event.kind(), channel, e);
                }
            }
        }

        self.stats
            .record_delivery(delivery.delivered as u64, delivery.failed as u64);
        debug!(
            "📡 Broadcasted '{}' from {} to {} session(s) ({} failed)",
            event.kind(),
            origin,
            delivery.delivered,
            delivery.failed
        );
        delivery
    }
}

/// In-memory bus that records every delivery.
///
/// Used to observe fan-out deterministically, e.g. in tests or when the
/// coordinator runs without a transport.
#[derive(Debug, Default)]
pub struct RecordingBus {
    sent: Mutex<Vec<(SessionId, WorldEvent)>>,
    closed: Mutex<Vec<SessionId>>,
}

impl RecordingBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later send to `channel` fail with [`BusError::ChannelClosed`].
    pub fn close_channel(&self, channel: SessionId) {
        if let Ok(mut closed) = self.closed.lock() {
            closed.push(channel);
        }
    }

    /// All deliveries so far, in send order.
    pub fn sent(&self) -> Vec<(SessionId, WorldEvent)> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }

    /// Events delivered on one channel, in send order.
    pub fn sent_to(&self, channel: &SessionId) -> Vec<WorldEvent> {
        self.sent()
            .into_iter()
            .filter(|(id, _)| id == channel)
            .map(|(_, event)| event)
            .collect()
    }

    pub fn clear(&self) {
        if let Ok(mut sent) = self.sent.lock() {
            sent.clear();
        }
    }
}

#[async_trait]
impl EventBus for RecordingBus {
    async fn send_to(&self, channel: &SessionId, event: &WorldEvent) -> Result<(), BusError> {
        let closed = self
            .closed
            .lock()
            .map(|closed| closed.contains(channel))
            .unwrap_or(false);
        if closed {
            return Err(BusError::ChannelClosed(*channel));
        }
        self.sent
            .lock()
            .map_err(|e| BusError::Transport(e.to_string()))?
            .push((*channel, event.clone()));
        Ok(())
    }
}
