//! Per-session lists of placed objects.

use crate::types::{PlacedObject, SessionId};
use std::collections::HashMap;
use tracing::debug;

/// Objects placed by each live session, in placement order.
///
/// Operations against a session without a list are tolerated as no-ops:
/// requests can race a disconnect that already dropped the list.
#[derive(Debug, Default)]
pub struct ObjectStore {
    lists: HashMap<SessionId, Vec<PlacedObject>>,
}

impl ObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty list for a freshly joined session.
    pub fn open(&mut self, session_id: SessionId) {
        self.lists.entry(session_id).or_default();
    }

    /// Appends an object. Returns `false` if the session has no list.
    pub fn add(&mut self, session_id: &SessionId, object: PlacedObject) -> bool {
        match self.lists.get_mut(session_id) {
            Some(list) => {
                list.push(object);
                true
            }
            None => {
                debug!("Ignoring object {} for unknown session {}", object.id, session_id);
                false
            }
        }
    }

    /// Removes every object with `object_id` from the session's list.
    ///
    /// Returns the number of removed objects; unknown sessions yield 0.
    pub fn remove(&mut self, session_id: &SessionId, object_id: &str) -> usize {
        match self.lists.get_mut(session_id) {
            Some(list) => {
                let before = list.len();
                list.retain(|object| object.id != object_id);
                before - list.len()
            }
            None => {
                debug!("Ignoring removal of {} for unknown session {}", object_id, session_id);
                0
            }
        }
    }

    pub fn list_for(&self, session_id: &SessionId) -> Vec<PlacedObject> {
        self.lists.get(session_id).cloned().unwrap_or_default()
    }

    /// Discards the session's bookkeeping. Viewers keep what they already saw.
    pub fn drop_session(&mut self, session_id: &SessionId) -> Option<Vec<PlacedObject>> {
        self.lists.remove(session_id)
    }

    /// Total number of objects across all sessions.
    pub fn total(&self) -> usize {
        self.lists.values().map(Vec::len).sum()
    }
}
