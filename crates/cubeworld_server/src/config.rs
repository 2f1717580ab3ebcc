//! Server configuration types and defaults.
//!
//! This module contains the server configuration structure and default values
//! used to initialize and customize the world server behavior.

use cubeworld_core::WorldConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Configuration structure for the world server.
///
/// Contains the network settings, the world limits handed to the coordinator
/// and the inbound message limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The socket address to bind the server to
    pub bind_address: SocketAddr,

    /// Slot and name limits for the coordinator
    pub world: WorldConfig,

    /// Maximum number of concurrent WebSocket connections allowed
    pub max_connections: usize,

    /// Inbound message limits
    pub security: SecurityConfig,
}

/// Limits applied to every inbound client message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum message size in bytes
    pub max_message_size: usize,

    /// Maximum allowed nesting depth for JSON messages
    pub max_json_depth: usize,

    /// Maximum allowed string length in JSON
    pub max_string_length: usize,

    /// Maximum allowed array/object size
    pub max_collection_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 8080)),
            world: WorldConfig::default(),
            max_connections: 1000,
            security: SecurityConfig::default(),
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_message_size: 16 * 1024, // 16KB
            max_json_depth: 6,
            max_string_length: 256,
            max_collection_size: 32,
        }
    }
}
