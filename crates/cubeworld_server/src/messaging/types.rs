//! Message type definitions for client-server communication.
//!
//! Clients send `{namespace, event, data}` envelopes; the server answers each
//! request with exactly one [`ServerMessage`]. World events pushed by the bus
//! use the same `{"event", "data"}` framing as the responses.

use cubeworld_core::{MemberSnapshot, PlacedObject, SessionId, SlotIndex, WorldError};
use serde::{Deserialize, Serialize};

/// The only namespace the gateway serves.
pub const WORLD_NAMESPACE: &str = "world";

/// A message sent from a client to the server.
///
/// # Examples
///
/// ```json
/// {
///   "namespace": "world",
///   "event": "join",
///   "data": { "name": "alice" }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientMessage {
    /// Always `"world"`
    pub namespace: String,

    /// `join`, `place_object` or `remove_object`
    pub event: String,

    /// The message payload as a JSON value
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Payload of `world:join`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinRequest {
    pub name: String,
}

/// Payload of `world:place_object`.
///
/// `name` is accepted for compatibility with older clients and ignored: the
/// registered display name is what other members see.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceObjectRequest {
    pub channel_id: SessionId,
    pub object: PlacedObject,
    #[serde(default)]
    pub name: Option<String>,
}

/// Payload of `world:remove_object`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoveObjectRequest {
    pub channel_id: SessionId,
    pub object_id: String,
}

/// Outcome of a join request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JoinResult {
    Succeed {
        channel_id: SessionId,
        slot_index: SlotIndex,
        others: Vec<MemberSnapshot>,
    },
    Failed {
        reason: String,
    },
}

/// A response sent from the server to the requesting client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    JoinResult(JoinResult),
    Ack { request: String },
    Error { reason: String, message: String },
}

impl ServerMessage {
    pub fn ack(request: &str) -> Self {
        ServerMessage::Ack {
            request: request.to_string(),
        }
    }

    /// An error frame for a request that never reached the coordinator.
    pub fn malformed(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            reason: "malformed_request".to_string(),
            message: message.into(),
        }
    }

    pub fn from_world_error(error: &WorldError) -> Self {
        ServerMessage::Error {
            reason: error.code().to_string(),
            message: error.to_string(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
