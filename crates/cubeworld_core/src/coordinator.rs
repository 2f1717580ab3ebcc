//! The coordinator: the single entry point for join, place, remove and
//! disconnect.
//!
//! Slot pool, session registry and object store live together in one
//! [`WorldState`] behind one async mutex. Every operation, including the
//! fan-out it triggers, runs while holding that lock, so two joins can never
//! race for the same slot or name and a join snapshot always reflects a
//! single serialization point.
//!
//! A session is joining from the moment its name is checked until the join
//! returns, active while registered, and leaving for the duration of the
//! `disconnect` call that announces and removes it, and gone afterwards. Only
//! the active phase is observable from outside the lock.

use crate::bus::{Broadcaster, EventBus};
use crate::config::WorldConfig;
use crate::error::WorldError;
use crate::events::WorldEvent;
use crate::objects::ObjectStore;
use crate::registry::SessionRegistry;
use crate::stats::{CoordinatorStats, StatsSnapshot};
use crate::types::{MemberSnapshot, PlacedObject, Session, SessionId, SlotIndex};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, trace};

/// Result of a successful join.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinOutcome {
    /// The new session's id, which is also its channel name
    pub session_id: SessionId,
    /// The plot assigned to the new session
    pub slot_index: SlotIndex,
    /// Every other live member with their objects, in join order
    pub others: Vec<MemberSnapshot>,
}

/// Everything the coordinator guards with its lock.
#[derive(Debug)]
struct WorldState {
    registry: SessionRegistry,
    objects: ObjectStore,
}

impl WorldState {
    fn snapshot_of(&self, session: &Session) -> MemberSnapshot {
        MemberSnapshot {
            slot_index: session.slot_index,
            name: session.name.clone(),
            objects: self.objects.list_for(&session.id),
        }
    }
}

/// Orchestrates sessions, plots and objects and mirrors every change to the
/// other members.
#[derive(Debug)]
pub struct Coordinator {
    config: WorldConfig,
    state: Mutex<WorldState>,
    broadcaster: Broadcaster,
    stats: Arc<CoordinatorStats>,
}

impl Coordinator {
    /// Creates a coordinator with an empty world delivering through `bus`.
    pub fn new(config: WorldConfig, bus: Arc<dyn EventBus>) -> Self {
        let stats = Arc::new(CoordinatorStats::new());
        let state = WorldState {
            registry: SessionRegistry::new(config.max_slots),
            objects: ObjectStore::new(),
        };
        Self {
            broadcaster: Broadcaster::new(bus, stats.clone()),
            state: Mutex::new(state),
            config,
            stats,
        }
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Trims a requested display name and checks it against the limits.
    fn normalize_name(&self, raw: &str) -> Result<String, WorldError> {
        let name = raw.trim();
        if name.is_empty() {
            return Err(WorldError::NameTaken(name.to_string()));
        }
        let length = name.chars().count();
        if length > self.config.max_name_length {
            return Err(WorldError::MalformedRequest(format!(
                "display name is {} characters, the limit is {}",
                length, self.config.max_name_length
            )));
        }
        Ok(name.to_string())
    }

    /// Joins the world under `name`.
    ///
    /// On success the caller receives its slot and a snapshot of every other
    /// member; all other members receive [`WorldEvent::MemberJoined`].
    pub async fn join(&self, name: &str) -> Result<JoinOutcome, WorldError> {
        self.join_as(SessionId::new(), name).await
    }

    /// Joins the world under `name` using a session id chosen by the caller.
    ///
    /// Transports use this to subscribe to the session's channel before the
    /// session becomes visible, so no event addressed to it can be missed.
    pub async fn join_as(&self, session_id: SessionId, name: &str) -> Result<JoinOutcome, WorldError> {
        let name = match self.normalize_name(name) {
            Ok(name) => name,
            Err(e) => {
                self.stats.record_rejected_join();
                return Err(e);
            }
        };

        let mut state = self.state.lock().await;

        let session = match state.registry.join_with_id(session_id, &name) {
            Ok(session) => session,
            Err(e) => {
                self.stats.record_rejected_join();
                debug!("🚫 Join of '{}' rejected: {}", name, e);
                return Err(e);
            }
        };
        state.objects.open(session.id);

        self.broadcaster
            .broadcast(&state.registry, &session.id, &WorldEvent::member_joined(&session))
            .await;

        let others = state
            .registry
            .list_others(&session.id)
            .iter()
            .map(|other| state.snapshot_of(other))
            .collect();

        self.stats.record_join();
        info!(
            "🧱 '{}' joined on slot {} as {}",
            session.name, session.slot_index, session.id
        );

        Ok(JoinOutcome {
            session_id: session.id,
            slot_index: session.slot_index,
            others,
        })
    }

    /// Places `object` on the session's plot and tells everyone else.
    ///
    /// Objects for sessions that are already gone are dropped silently.
    pub async fn place_object(
        &self,
        session_id: &SessionId,
        object: PlacedObject,
    ) -> Result<(), WorldError> {
        object.validate().map_err(WorldError::MalformedRequest)?;

        let mut state = self.state.lock().await;
        let Some(owner_name) = state.registry.get(session_id).map(|s| s.name.clone()) else {
            debug!("{}", WorldError::UnknownSession(*session_id));
            return Ok(());
        };

        if !state.objects.add(session_id, object.clone()) {
            return Ok(());
        }
        self.stats.record_placed();
        debug!("➕ '{}' placed object {}", owner_name, object.id);

        let event = WorldEvent::ObjectAdded { object, owner_name };
        self.broadcaster
            .broadcast(&state.registry, session_id, &event)
            .await;
        Ok(())
    }

    /// Removes the session's object `object_id` and tells everyone else.
    ///
    /// The removal is forwarded even if the object was not in the session's
    /// list, so viewers that missed the placement stay consistent.
    pub async fn remove_object(
        &self,
        session_id: &SessionId,
        object_id: &str,
    ) -> Result<(), WorldError> {
        if object_id.trim().is_empty() {
            return Err(WorldError::MalformedRequest(
                "object id cannot be empty".to_string(),
            ));
        }

        let mut state = self.state.lock().await;
        if state.registry.get(session_id).is_none() {
            debug!("{}", WorldError::UnknownSession(*session_id));
            return Ok(());
        }

        let removed = state.objects.remove(session_id, object_id);
        self.stats.record_removed();
        debug!("➖ Session {} removed {} ({} matched)", session_id, object_id, removed);

        let event = WorldEvent::ObjectRemoved {
            object_id: object_id.to_string(),
        };
        self.broadcaster
            .broadcast(&state.registry, session_id, &event)
            .await;
        Ok(())
    }

    /// Cleans up after a session whose channel went away.
    ///
    /// Idempotent: returns `false` and does nothing if the session is not
    /// registered. The session's objects stay visible to other members; only
    /// the bookkeeping is discarded.
    pub async fn disconnect(&self, session_id: &SessionId) -> bool {
        let mut state = self.state.lock().await;
        let Some(session) = state.registry.get(session_id).cloned() else {
            trace!("Ignoring disconnect for unknown session {}", session_id);
            return false;
        };
        self.broadcaster
            .broadcast(&state.registry, session_id, &WorldEvent::member_left(&session))
            .await;

        state.registry.leave(session_id);
        state.objects.drop_session(session_id);
        self.stats.record_leave();
        info!("👋 '{}' left slot {}", session.name, session.slot_index);
        true
    }

    /// Every live member with their objects, in join order.
    pub async fn snapshot(&self) -> Vec<MemberSnapshot> {
        let state = self.state.lock().await;
        state
            .registry
            .session_ids()
            .iter()
            .filter_map(|id| state.registry.get(id))
            .map(|session| state.snapshot_of(session))
            .collect()
    }

    pub async fn session(&self, session_id: &SessionId) -> Option<Session> {
        self.state.lock().await.registry.get(session_id).cloned()
    }

    pub async fn session_count(&self) -> usize {
        self.state.lock().await.registry.len()
    }

    pub async fn available_slots(&self) -> usize {
        self.state.lock().await.registry.slots().available()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}
