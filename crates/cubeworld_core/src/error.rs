//! Error types for coordinator operations and bus delivery.

use crate::types::SessionId;

/// Outcome of a rejected coordinator operation.
///
/// `NameTaken` and `Exhausted` are user-facing and recoverable,
/// `MalformedRequest` is returned before any state is touched.
/// `UnknownSession` is produced internally and absorbed by the coordinator;
/// callers never receive it from the public operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorldError {
    /// The display name belongs to a live session (or is blank)
    #[error("Display name '{0}' is not available")]
    NameTaken(String),

    /// Every slot is held by a live session
    #[error("No free plots remain (capacity {0})")]
    Exhausted(u32),

    /// The session is not (or no longer) registered
    #[error("Unknown session: {0}")]
    UnknownSession(SessionId),

    /// The request payload has an invalid shape
    #[error("Malformed request: {0}")]
    MalformedRequest(String),
}

impl WorldError {
    /// Stable, machine readable code used on the wire.
    pub fn code(&self) -> &'static str {
        match self {
            WorldError::NameTaken(_) => "name_taken",
            WorldError::Exhausted(_) => "exhausted",
            WorldError::UnknownSession(_) => "unknown_session",
            WorldError::MalformedRequest(_) => "malformed_request",
        }
    }
}

/// Failure to hand an event to the bus for one recipient.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BusError {
    /// Nobody is subscribed to the recipient's channel
    #[error("Channel {0} has no subscribers")]
    ChannelClosed(SessionId),

    /// The event could not be serialized
    #[error("Encoding error: {0}")]
    Encode(String),

    /// The transport refused the message
    #[error("Transport error: {0}")]
    Transport(String),
}
