//! # Core Type Definitions
//!
//! The fundamental value types shared by every component of the coordinator:
//! session identifiers, slot indices, placed objects and the snapshots handed
//! to joining members.
//!
//! ## Key Types
//!
//! - [`SessionId`] - Opaque identifier of a joined member, doubling as its bus channel
//! - [`SlotIndex`] - Index of the plot a session occupies
//! - [`PlacedObject`] - A unit cube placed on a plot
//! - [`Session`] - The registry record of a live member
//! - [`MemberSnapshot`] - Point-in-time view of another member for join responses

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Index of a plot in the spiral layout.
///
/// Slot indices are handed out lowest-first by the slot pool and are unique
/// among live sessions.
pub type SlotIndex = u32;

/// Unique identifier of a joined session.
///
/// A wrapper around a v4 UUID. The same value names the session's channel on
/// the event bus, so it is what clients echo back in their requests.
///
/// # Examples
///
/// ```rust
/// use cubeworld_core::SessionId;
///
/// let session_id = SessionId::new();
/// let parsed: SessionId = session_id.to_string().parse()?;
/// assert_eq!(session_id, parsed);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Creates a new random session ID using UUID v4.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::str::FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// World-space position of a placed object.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// RGB color of a placed object, components nominally in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Color {
    pub fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    pub fn is_finite(&self) -> bool {
        self.r.is_finite() && self.g.is_finite() && self.b.is_finite()
    }
}

/// A unit cube placed by a member on their plot.
///
/// The `id` is generated by the placing client and is only required to be
/// unique within the owner's object list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedObject {
    pub id: String,
    pub position: Position,
    pub color: Color,
}

impl PlacedObject {
    pub fn new(id: impl Into<String>, position: Position, color: Color) -> Self {
        Self {
            id: id.into(),
            position,
            color,
        }
    }

    /// Checks the shape of an object received from a client.
    ///
    /// Returns a human readable reason when the object cannot be stored.
    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("object id cannot be empty".to_string());
        }
        if !self.position.is_finite() {
            return Err(format!("object {} has a non-finite position", self.id));
        }
        if !self.color.is_finite() {
            return Err(format!("object {} has a non-finite color", self.id));
        }
        Ok(())
    }
}

/// Registry record of a live member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub slot_index: SlotIndex,
    pub name: String,
}

/// Another member's state as seen by a newly joining member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberSnapshot {
    pub slot_index: SlotIndex,
    pub name: String,
    pub objects: Vec<PlacedObject>,
}
