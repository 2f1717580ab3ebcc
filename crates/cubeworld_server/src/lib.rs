//! # Cubeworld Server
//!
//! WebSocket gateway for the shared building world. The server accepts client
//! connections, turns their requests into [`cubeworld_core::Coordinator`]
//! operations and pushes every world event to the members it concerns.
//!
//! ## Architecture Overview
//!
//! * **Coordinator** - All world state behind one lock (see `cubeworld_core`)
//! * **Connection Manager** - WebSocket lifecycle and channel subscriptions
//! * **Channel Bus** - The coordinator's event bus, backed by connection outboxes
//! * **Router** - Parses `{namespace, event, data}` requests and shapes responses
//!
//! ### Message Flow
//!
//! 1. Client sends a text frame with a `{namespace, event, data}` envelope
//! 2. The frame is checked against the [`SecurityConfig`] limits
//! 3. The router runs the matching coordinator operation
//! 4. The client receives one response frame (`join_result`, `ack` or `error`)
//! 5. Other members receive the resulting world events on their channels
//!
//! ```json
//! {"namespace": "world", "event": "join", "data": {"name": "alice"}}
//! ```
//!
//! ### Sessions and Channels
//!
//! A successful join subscribes the connection to a channel named by the new
//! session id. When the last connection of a channel closes, the channel is
//! reported vacated and the coordinator disconnects the session, freeing its
//! plot and name.
//!
//! ## Error Handling
//!
//! The server uses structured error types ([`ServerError`]) to categorize failures:
//!
//! * **Network errors** - Binding, handshake and protocol issues
//! * **Internal errors** - Connection bookkeeping problems
//!
//! Request-level failures never end a connection; they are answered with an
//! `error` frame.

pub use config::{SecurityConfig, ServerConfig};
pub use error::ServerError;
pub use server::WorldServer;
pub use shutdown::ShutdownState;
pub use utils::{create_server, create_server_with_config};

pub mod config;
pub mod connection;
pub mod error;
pub mod messaging;
pub mod security;
pub mod server;
pub mod shutdown;
pub mod utils;

#[cfg(test)]
mod tests;
