//! Message handling and routing for client-server communication.
//!
//! This module provides the infrastructure for parsing client requests,
//! dispatching them to the coordinator and shaping the responses.

pub mod router;
pub mod types;

pub use router::route_client_message;
pub use types::{ClientMessage, JoinResult, ServerMessage};
