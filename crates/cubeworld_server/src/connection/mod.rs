//! Connection management for client connections.
//!
//! This module handles the lifecycle of client connections, the mapping from
//! connections to the session channel they joined, and the bus that delivers
//! world events onto those channels.

pub mod bus;
pub mod client;
pub mod manager;

pub use bus::ChannelBus;
pub use manager::ConnectionManager;

/// Type alias for connection identifiers.
///
/// Connection IDs are used to uniquely identify client connections
/// throughout their lifecycle on the server.
pub type ConnectionId = usize;
