//! Factory functions for creating server instances.

use crate::{config::ServerConfig, server::WorldServer};

/// Creates a new world server with default configuration.
///
/// # Example
///
/// ```rust
/// use cubeworld_server::create_server;
///
/// let server = create_server();
/// assert_eq!(server.config().world.max_slots, 50);
/// ```
pub fn create_server() -> WorldServer {
    WorldServer::new(ServerConfig::default())
}

/// Creates a new world server with custom configuration.
///
/// # Example
///
/// ```rust
/// use cubeworld_server::{create_server_with_config, ServerConfig};
///
/// let mut config = ServerConfig {
///     bind_address: "0.0.0.0:9000".parse().unwrap(),
///     max_connections: 200,
///     ..Default::default()
/// };
/// config.world.max_slots = 8;
///
/// let server = create_server_with_config(config);
/// assert_eq!(server.config().world.max_slots, 8);
/// ```
pub fn create_server_with_config(config: ServerConfig) -> WorldServer {
    WorldServer::new(config)
}
