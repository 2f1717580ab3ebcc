//! Session registry: which member holds which slot under which name.

use crate::error::WorldError;
use crate::slots::SlotPool;
use crate::types::{Session, SessionId, SlotIndex};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Live sessions keyed by id, with name uniqueness and slot assignment.
///
/// The registry owns the [`SlotPool`], so a slot is held exactly as long as
/// the session that acquired it is registered. Iteration follows join order.
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: HashMap<SessionId, Session>,
    order: Vec<SessionId>,
    names: HashSet<String>,
    slots: SlotPool,
}

impl SessionRegistry {
    pub fn new(capacity: SlotIndex) -> Self {
        Self {
            sessions: HashMap::new(),
            order: Vec::new(),
            names: HashSet::new(),
            slots: SlotPool::new(capacity),
        }
    }

    /// Registers a new session under `name`.
    ///
    /// The name is checked before a slot is taken, so a rejected join leaves
    /// both the pool and the registry untouched.
    pub fn join(&mut self, name: &str) -> Result<Session, WorldError> {
        self.join_with_id(SessionId::new(), name)
    }

    /// Registers a new session under a caller-chosen id.
    ///
    /// Lets a transport subscribe to the session's channel before the join
    /// becomes visible to other members.
    pub fn join_with_id(&mut self, id: SessionId, name: &str) -> Result<Session, WorldError> {
        if self.sessions.contains_key(&id) {
            return Err(WorldError::MalformedRequest(format!("session {id} is already registered")));
        }
        if self.names.contains(name) {
            return Err(WorldError::NameTaken(name.to_string()));
        }
        let slot_index = self
            .slots
            .acquire()
            .ok_or(WorldError::Exhausted(self.slots.capacity()))?;

        let session = Session {
            id,
            slot_index,
            name: name.to_string(),
        };
        self.names.insert(session.name.clone());
        self.order.push(session.id);
        self.sessions.insert(session.id, session.clone());
        debug!("📝 Registered session {} as '{}' on slot {}", session.id, session.name, slot_index);
        Ok(session)
    }

    /// Removes a session, releasing its slot and name.
    ///
    /// Returns the removed record, or `None` if the id was not registered.
    pub fn leave(&mut self, session_id: &SessionId) -> Option<Session> {
        let session = self.sessions.remove(session_id)?;
        self.order.retain(|id| id != session_id);
        self.names.remove(&session.name);
        self.slots.release(session.slot_index);
        debug!("🗑️ Unregistered session {} ('{}')", session.id, session.name);
        Some(session)
    }

    /// All live sessions except `excluding`, in join order.
    pub fn list_others(&self, excluding: &SessionId) -> Vec<Session> {
        self.order
            .iter()
            .filter(|id| *id != excluding)
            .filter_map(|id| self.sessions.get(id).cloned())
            .collect()
    }

    /// Ids of all live sessions, in join order.
    pub fn session_ids(&self) -> &[SessionId] {
        &self.order
    }

    pub fn exists(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn get(&self, session_id: &SessionId) -> Option<&Session> {
        self.sessions.get(session_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn slots(&self) -> &SlotPool {
        &self.slots
    }
}
