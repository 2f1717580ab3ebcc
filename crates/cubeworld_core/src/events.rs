//! Events fanned out to other members.
//!
//! Every state change a member causes is mirrored to all other live members
//! as one of the [`WorldEvent`] variants. On the wire they serialize as
//! `{"event": "<kind>", "data": {...}}`:
//!
//! ```json
//! {"event": "member_joined", "data": {"slot_index": 3, "name": "alice"}}
//! {"event": "object_removed", "data": {"object_id": "f3b1..."}}
//! ```

use crate::types::{PlacedObject, Session, SlotIndex};
use serde::{Deserialize, Serialize};

/// A state change delivered to every member except its originator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum WorldEvent {
    /// A member claimed a plot
    MemberJoined { slot_index: SlotIndex, name: String },

    /// A member left and their plot is free again
    MemberLeft { slot_index: SlotIndex, name: String },

    /// A member placed a cube on their plot
    ObjectAdded {
        object: PlacedObject,
        owner_name: String,
    },

    /// A member removed one of their cubes
    ObjectRemoved { object_id: String },
}

impl WorldEvent {
    pub fn member_joined(session: &Session) -> Self {
        WorldEvent::MemberJoined {
            slot_index: session.slot_index,
            name: session.name.clone(),
        }
    }

    pub fn member_left(session: &Session) -> Self {
        WorldEvent::MemberLeft {
            slot_index: session.slot_index,
            name: session.name.clone(),
        }
    }

    /// The wire tag of this event.
    pub fn kind(&self) -> &'static str {
        match self {
            WorldEvent::MemberJoined { .. } => "member_joined",
            WorldEvent::MemberLeft { .. } => "member_left",
            WorldEvent::ObjectAdded { .. } => "object_added",
            WorldEvent::ObjectRemoved { .. } => "object_removed",
        }
    }

    /// Serializes the event into its wire representation.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Color, Position};
    use serde_json::json;

    #[test]
    fn events_use_tagged_wire_shape() {
        let event = WorldEvent::MemberJoined {
            slot_index: 3,
            name: "alice".to_string(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value, json!({"event": "member_joined", "data": {"slot_index": 3, "name": "alice"}}));
        assert_eq!(value["event"], event.kind());
    }

    #[test]
    fn object_added_carries_the_full_object() {
        let event = WorldEvent::ObjectAdded {
            object: PlacedObject::new("b1", Position::new(1.0, 0.5, -2.0), Color::new(1.0, 0.0, 0.5)),
            owner_name: "bob".to_string(),
        };
        let value: serde_json::Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(value["event"], "object_added");
        assert_eq!(value["data"]["owner_name"], "bob");
        assert_eq!(value["data"]["object"]["position"]["z"], -2.0);
        assert_eq!(value["data"]["object"]["color"]["b"], 0.5);

        let parsed: WorldEvent = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, event);
    }
}
