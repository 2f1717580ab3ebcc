//! # Cubeworld Core
//!
//! Presence and state coordination for a shared building world. Members join
//! under a unique display name, receive their own plot on an endless spiral
//! grid, place and remove unit cubes on it, and see everybody else's changes
//! as they happen.
//!
//! ## Components
//!
//! * [`layout`] - Maps slot indices to grid cells on a square spiral
//! * [`slots`] - Lowest-first pool of free slot indices
//! * [`registry`] - Live sessions, their slots and unique names
//! * [`objects`] - Cubes placed by each session
//! * [`bus`] - The [`EventBus`] capability and the originator-excluding fan-out
//! * [`coordinator`] - The [`Coordinator`] sequencing all of the above
//!
//! ## Example
//!
//! ```rust
//! use cubeworld_core::{Coordinator, RecordingBus, WorldConfig, WorldEvent};
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let bus = Arc::new(RecordingBus::new());
//! let world = Coordinator::new(WorldConfig::default(), bus.clone());
//!
//! let alice = world.join("alice").await?;
//! let bob = world.join("bob").await?;
//! assert_eq!(bob.others[0].name, "alice");
//!
//! let joined = bus.sent_to(&alice.session_id);
//! assert!(matches!(joined[0], WorldEvent::MemberJoined { slot_index: 1, .. }));
//! # Ok(())
//! # }
//! ```
//!
//! ## Thread Safety
//!
//! All mutable state sits behind a single lock inside the [`Coordinator`];
//! share it as `Arc<Coordinator>` between connection handlers.

pub mod bus;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod layout;
pub mod objects;
pub mod registry;
pub mod slots;
pub mod stats;
pub mod types;

pub use bus::{Broadcaster, Delivery, EventBus, RecordingBus};
pub use config::WorldConfig;
pub use coordinator::{Coordinator, JoinOutcome};
pub use error::{BusError, WorldError};
pub use events::WorldEvent;
pub use layout::{locate, plot_origin, GridCoordinate};
pub use stats::{CoordinatorStats, StatsSnapshot};
pub use types::{
    Color, MemberSnapshot, PlacedObject, Position, Session, SessionId, SlotIndex,
};
