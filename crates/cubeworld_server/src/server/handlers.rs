//! Connection handling logic for WebSocket clients.
//!
//! This module contains the logic that manages the lifecycle of individual
//! client connections, including WebSocket handshaking, request processing,
//! and cleanup.

use crate::{
    config::SecurityConfig,
    connection::{ConnectionId, ConnectionManager},
    error::ServerError,
    messaging::{route_client_message, ServerMessage},
    security::validate_json_message,
};
use cubeworld_core::Coordinator;
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, trace, warn};

/// Handles a single client connection from establishment to cleanup.
///
/// # Connection Flow
///
/// 1. Perform WebSocket handshake
/// 2. Register connection with the connection manager
/// 3. Start the incoming (requests) and outgoing (outbox) tasks
/// 4. Remove the connection once either task ends or the server shuts down,
///    which reports its channel vacated and lets the coordinator clean up
///    the session
///
/// # Message Handling
///
/// * **Incoming Task**: Validates and routes requests, queues one response per request
/// * **Outgoing Task**: Drains the connection's outbox into the socket
///
/// Responses and bus events share the outbox, so frames reach the client in
/// the order they were queued.
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    connection_manager: Arc<ConnectionManager>,
    coordinator: Arc<Coordinator>,
    security: SecurityConfig,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<(), ServerError> {
    let ws_stream = tokio::select! {
        handshake = accept_async(stream) => handshake
            .map_err(|e| ServerError::Network(format!("WebSocket handshake failed: {e}")))?,
        _ = shutdown.recv() => {
            debug!("🛑 Dropping {} during handshake - server shutting down", addr);
            return Ok(());
        }
    };

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let (connection_id, mut outbox) = connection_manager.add_connection(addr).await;

    let incoming_task = {
        let connection_manager = connection_manager.clone();
        let coordinator = coordinator.clone();

        async move {
            while let Some(msg) = ws_receiver.next().await {
                match msg {
                    Ok(Message::Text(text)) => {
                        handle_text(
                            text.as_str(),
                            connection_id,
                            &connection_manager,
                            &coordinator,
                            &security,
                        )
                        .await;
                    }
                    Ok(Message::Close(_)) => {
                        debug!("🔌 Client {} requested close", connection_id);
                        break;
                    }
                    Ok(Message::Ping(data)) => {
                        connection_manager
                            .send_message(connection_id, Message::Pong(data))
                            .await;
                    }
                    Err(e) => {
                        error!("WebSocket error for connection {}: {}", connection_id, e);
                        break;
                    }
                    _ => {}
                }
            }
        }
    };

    let outgoing_task = async move {
        while let Some(message) = outbox.recv().await {
            if let Err(e) = ws_sender.send(message).await {
                error!("Failed to send message: {}", e);
                break;
            }
        }
    };

    tokio::select! {
        _ = incoming_task => {},
        _ = outgoing_task => {},
        _ = shutdown.recv() => {
            debug!("🛑 Closing connection {} - server shutting down", connection_id);
        }
    }

    connection_manager.remove_connection(connection_id).await;
    Ok(())
}

/// Validates, routes and answers one text frame.
async fn handle_text(
    text: &str,
    connection_id: ConnectionId,
    connection_manager: &ConnectionManager,
    coordinator: &Coordinator,
    security: &SecurityConfig,
) {
    let response = match validate_json_message(text.as_bytes(), security) {
        Ok(()) => match route_client_message(text, connection_id, connection_manager, coordinator).await {
            Ok(response) => response,
            Err(e) => {
                trace!("❌ Message routing error: {}", e);
                return;
            }
        },
        Err(e) => {
            warn!("🛡️ Rejected frame from connection {}: {}", connection_id, e);
            ServerMessage::malformed(e.to_string())
        }
    };

    match response.to_json() {
        Ok(json) => {
            connection_manager.send_to_connection(connection_id, json).await;
        }
        Err(e) => error!("Failed to serialize response: {}", e),
    }
}
