//! Message routing logic for dispatching client requests to the coordinator.
//!
//! This module parses incoming text messages, checks them against the state
//! of the sending connection and turns the coordinator's outcome into the
//! response frame for that client.

use crate::connection::{ConnectionId, ConnectionManager};
use crate::error::ServerError;
use crate::messaging::types::{
    ClientMessage, JoinRequest, JoinResult, PlaceObjectRequest, RemoveObjectRequest, ServerMessage,
    WORLD_NAMESPACE,
};
use cubeworld_core::{Coordinator, SessionId};
use serde::de::DeserializeOwned;
use tracing::{debug, trace, warn};

/// Routes a raw client message to the coordinator.
///
/// Every request yields exactly one response. Malformed input becomes an
/// `error` frame; a `ServerError` is only returned when the connection itself
/// is no longer tracked.
///
/// # Message Flow
///
/// 1. Parse the raw text as a `ClientMessage` envelope
/// 2. Reject foreign namespaces and unknown events
/// 3. Check the request against the connection's channel
/// 4. Run the coordinator operation and shape the response
pub async fn route_client_message(
    text: &str,
    connection_id: ConnectionId,
    connection_manager: &ConnectionManager,
    coordinator: &Coordinator,
) -> Result<ServerMessage, ServerError> {
    let message: ClientMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(e) => return Ok(ServerMessage::malformed(format!("Invalid JSON: {e}"))),
    };

    if message.namespace != WORLD_NAMESPACE {
        return Ok(ServerMessage::malformed(format!(
            "unknown namespace '{}'",
            message.namespace
        )));
    }

    debug!(
        "📨 Routing '{}:{}' from connection {}",
        message.namespace, message.event, connection_id
    );

    let response = match message.event.as_str() {
        "join" => handle_join(message.data, connection_id, connection_manager, coordinator).await?,
        "place_object" => {
            let request: PlaceObjectRequest = match parse_payload(message.data) {
                Ok(request) => request,
                Err(response) => return Ok(response),
            };
            match ensure_channel(connection_id, &request.channel_id, connection_manager).await {
                Ok(channel) => match coordinator.place_object(&channel, request.object).await {
                    Ok(()) => ServerMessage::ack("place_object"),
                    Err(e) => ServerMessage::from_world_error(&e),
                },
                Err(response) => response,
            }
        }
        "remove_object" => {
            let request: RemoveObjectRequest = match parse_payload(message.data) {
                Ok(request) => request,
                Err(response) => return Ok(response),
            };
            match ensure_channel(connection_id, &request.channel_id, connection_manager).await {
                Ok(channel) => match coordinator.remove_object(&channel, &request.object_id).await {
                    Ok(()) => ServerMessage::ack("remove_object"),
                    Err(e) => ServerMessage::from_world_error(&e),
                },
                Err(response) => response,
            }
        }
        other => ServerMessage::malformed(format!("unknown event '{other}'")),
    };

    trace!("✅ Handled '{}' from connection {}", message.event, connection_id);
    Ok(response)
}

/// Joins on behalf of a connection.
///
/// The connection is subscribed to the new session's channel before the join
/// becomes visible, so no event addressed to the session can be missed. Those
/// events are held until the join reply is queued through
/// [`ConnectionManager::send_to_connection`]. A rejected join drops the
/// subscription again.
async fn handle_join(
    data: serde_json::Value,
    connection_id: ConnectionId,
    connection_manager: &ConnectionManager,
    coordinator: &Coordinator,
) -> Result<ServerMessage, ServerError> {
    if connection_manager.channel_of(connection_id).await.is_some() {
        return Ok(ServerMessage::malformed("connection has already joined"));
    }
    let request: JoinRequest = match parse_payload(data) {
        Ok(request) => request,
        Err(response) => return Ok(response),
    };

    let session_id = SessionId::new();
    if !connection_manager.subscribe_pending(connection_id, session_id).await {
        return Err(ServerError::Internal(format!(
            "connection {connection_id} is not registered"
        )));
    }

    match coordinator.join_as(session_id, &request.name).await {
        Ok(outcome) => Ok(ServerMessage::JoinResult(JoinResult::Succeed {
            channel_id: outcome.session_id,
            slot_index: outcome.slot_index,
            others: outcome.others,
        })),
        Err(e) => {
            connection_manager.unsubscribe(connection_id).await;
            Ok(ServerMessage::JoinResult(JoinResult::Failed {
                reason: e.code().to_string(),
            }))
        }
    }
}

/// Checks that a request names the channel the connection joined.
async fn ensure_channel(
    connection_id: ConnectionId,
    requested: &SessionId,
    connection_manager: &ConnectionManager,
) -> Result<SessionId, ServerMessage> {
    match connection_manager.channel_of(connection_id).await {
        Some(channel) if channel == *requested => Ok(channel),
        Some(_) => {
            warn!(
                "🚫 Connection {} addressed channel {} it does not own",
                connection_id, requested
            );
            Err(ServerMessage::malformed("channel_id does not belong to this connection"))
        }
        None => Err(ServerMessage::malformed("join before sending world requests")),
    }
}

fn parse_payload<T: DeserializeOwned>(data: serde_json::Value) -> Result<T, ServerMessage> {
    serde_json::from_value(data).map_err(|e| ServerMessage::malformed(format!("Invalid payload: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::ChannelBus;
    use cubeworld_core::WorldConfig;
    use serde_json::{json, Value};
    use std::net::SocketAddr;
    use std::sync::Arc;
    use tokio::sync::mpsc::UnboundedReceiver;
    use tokio_tungstenite::tungstenite::Message;

    struct Harness {
        manager: Arc<ConnectionManager>,
        coordinator: Coordinator,
    }

    impl Harness {
        fn new(max_slots: u32) -> Self {
            let manager = Arc::new(ConnectionManager::new());
            let bus = Arc::new(ChannelBus::new(manager.clone()));
            let config = WorldConfig {
                max_slots,
                ..WorldConfig::default()
            };
            Self {
                coordinator: Coordinator::new(config, bus),
                manager,
            }
        }

        async fn connect(&self) -> (ConnectionId, UnboundedReceiver<Message>) {
            self.manager
                .add_connection(SocketAddr::from(([127, 0, 0, 1], 5000)))
                .await
        }

        async fn send(&self, connection_id: ConnectionId, message: Value) -> Value {
            let response = route_client_message(
                &message.to_string(),
                connection_id,
                &self.manager,
                &self.coordinator,
            )
            .await
            .unwrap();
            self.manager
                .send_to_connection(connection_id, response.to_json().unwrap())
                .await;
            serde_json::to_value(response).unwrap()
        }

        async fn join(&self, connection_id: ConnectionId, name: &str) -> Value {
            self.send(
                connection_id,
                json!({"namespace": "world", "event": "join", "data": {"name": name}}),
            )
            .await
        }
    }

    fn cube(id: &str) -> Value {
        json!({"id": id, "position": {"x": 1.0, "y": 0.5, "z": 2.0}, "color": {"r": 0.2, "g": 0.4, "b": 0.6}})
    }

    fn frames(rx: &mut UnboundedReceiver<Message>) -> Vec<Value> {
        let mut frames = Vec::new();
        while let Ok(Message::Text(text)) = rx.try_recv() {
            frames.push(serde_json::from_str(text.as_str()).unwrap());
        }
        frames
    }

    /// Bus events only, without the replies to the connection's own requests.
    fn pushed(rx: &mut UnboundedReceiver<Message>) -> Vec<Value> {
        frames(rx)
            .into_iter()
            .filter(|frame| !matches!(frame["event"].as_str(), Some("join_result" | "ack" | "error")))
            .collect()
    }

    #[tokio::test]
    async fn join_subscribes_the_connection() {
        let harness = Harness::new(4);
        let (a, mut a_rx) = harness.connect().await;
        let (b, _b_rx) = harness.connect().await;

        let first = harness.join(a, "alice").await;
        assert_eq!(first["event"], "join_result");
        assert_eq!(first["data"]["status"], "succeed");
        assert_eq!(first["data"]["slot_index"], 0);

        let channel: SessionId = first["data"]["channel_id"].as_str().unwrap().parse().unwrap();
        assert_eq!(harness.manager.channel_of(a).await, Some(channel));

        let second = harness.join(b, "bob").await;
        assert_eq!(second["data"]["others"][0]["name"], "alice");

        let frames = pushed(&mut a_rx);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["event"], "member_joined");
        assert_eq!(frames[0]["data"]["name"], "bob");
    }

    #[tokio::test]
    async fn join_reply_precedes_events_raised_before_it_is_sent() {
        let harness = Harness::new(4);
        let (a, _a_rx) = harness.connect().await;
        let (b, mut b_rx) = harness.connect().await;
        let alice = harness.join(a, "alice").await;

        let reply = route_client_message(
            &json!({"namespace": "world", "event": "join", "data": {"name": "bob"}}).to_string(),
            b,
            &harness.manager,
            &harness.coordinator,
        )
        .await
        .unwrap();

        // Alice builds while bob's reply is still on its way.
        harness
            .send(
                a,
                json!({"namespace": "world", "event": "place_object",
                       "data": {"channel_id": alice["data"]["channel_id"], "object": cube("c1")}}),
            )
            .await;
        assert!(frames(&mut b_rx).is_empty());

        harness
            .manager
            .send_to_connection(b, reply.to_json().unwrap())
            .await;
        let received = frames(&mut b_rx);
        assert_eq!(received.len(), 2);
        assert_eq!(received[0]["event"], "join_result");
        assert_eq!(received[0]["data"]["others"][0]["objects"], json!([]));
        assert_eq!(received[1]["event"], "object_added");
        assert_eq!(received[1]["data"]["object"]["id"], "c1");
    }

    #[tokio::test]
    async fn rejected_join_leaves_the_connection_unsubscribed() {
        let harness = Harness::new(4);
        let (a, _a_rx) = harness.connect().await;
        let (b, _b_rx) = harness.connect().await;
        harness.join(a, "alice").await;

        let response = harness.join(b, "alice").await;
        assert_eq!(response["data"]["status"], "failed");
        assert_eq!(response["data"]["reason"], "name_taken");
        assert_eq!(harness.manager.channel_of(b).await, None);

        // The connection may try again under another name.
        let retry = harness.join(b, "bob").await;
        assert_eq!(retry["data"]["status"], "succeed");
    }

    #[tokio::test]
    async fn second_join_on_one_connection_is_malformed() {
        let harness = Harness::new(4);
        let (a, _a_rx) = harness.connect().await;
        harness.join(a, "alice").await;

        let response = harness.join(a, "again").await;
        assert_eq!(response["event"], "error");
        assert_eq!(response["data"]["reason"], "malformed_request");
        assert_eq!(harness.coordinator.session_count().await, 1);
    }

    #[tokio::test]
    async fn place_and_remove_are_acknowledged_and_mirrored() {
        let harness = Harness::new(4);
        let (a, mut a_rx) = harness.connect().await;
        let (b, mut b_rx) = harness.connect().await;
        harness.join(a, "alice").await;
        let joined = harness.join(b, "bob").await;
        let channel_id = joined["data"]["channel_id"].clone();
        pushed(&mut a_rx);

        let ack = harness
            .send(
                b,
                json!({"namespace": "world", "event": "place_object",
                       "data": {"channel_id": channel_id, "object": cube("c1"), "name": "mallory"}}),
            )
            .await;
        assert_eq!(ack, json!({"event": "ack", "data": {"request": "place_object"}}));

        let ack = harness
            .send(
                b,
                json!({"namespace": "world", "event": "remove_object",
                       "data": {"channel_id": channel_id, "object_id": "c1"}}),
            )
            .await;
        assert_eq!(ack["data"]["request"], "remove_object");

        let frames = pushed(&mut a_rx);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0]["event"], "object_added");
        assert_eq!(frames[0]["data"]["owner_name"], "bob");
        assert_eq!(frames[0]["data"]["object"]["id"], "c1");
        assert_eq!(frames[1]["event"], "object_removed");
        assert_eq!(frames[1]["data"]["object_id"], "c1");

        // The originator never hears its own changes.
        assert!(pushed(&mut b_rx).is_empty());
    }

    #[tokio::test]
    async fn requests_for_foreign_or_missing_channels_are_rejected() {
        let harness = Harness::new(4);
        let (a, _a_rx) = harness.connect().await;
        let (b, _b_rx) = harness.connect().await;

        let before_join = harness
            .send(
                b,
                json!({"namespace": "world", "event": "place_object",
                       "data": {"channel_id": SessionId::new().to_string(), "object": cube("c1")}}),
            )
            .await;
        assert_eq!(before_join["data"]["reason"], "malformed_request");

        let alice = harness.join(a, "alice").await;
        harness.join(b, "bob").await;
        let foreign = harness
            .send(
                b,
                json!({"namespace": "world", "event": "remove_object",
                       "data": {"channel_id": alice["data"]["channel_id"], "object_id": "c1"}}),
            )
            .await;
        assert_eq!(foreign["event"], "error");
        assert_eq!(foreign["data"]["reason"], "malformed_request");
    }

    #[tokio::test]
    async fn invalid_objects_report_the_coordinator_error() {
        let harness = Harness::new(4);
        let (a, _a_rx) = harness.connect().await;
        let joined = harness.join(a, "alice").await;

        let response = harness
            .send(
                a,
                json!({"namespace": "world", "event": "place_object",
                       "data": {"channel_id": joined["data"]["channel_id"], "object": cube("  ")}}),
            )
            .await;
        assert_eq!(response["event"], "error");
        assert_eq!(response["data"]["reason"], "malformed_request");
    }

    #[tokio::test]
    async fn garbage_and_unknown_routes_become_error_frames() {
        let harness = Harness::new(4);
        let (a, _a_rx) = harness.connect().await;

        let response = route_client_message("not json", a, &harness.manager, &harness.coordinator)
            .await
            .unwrap();
        assert!(matches!(response, ServerMessage::Error { .. }));

        let response = harness
            .send(a, json!({"namespace": "chat", "event": "join", "data": {"name": "x"}}))
            .await;
        assert_eq!(response["data"]["reason"], "malformed_request");

        let response = harness
            .send(a, json!({"namespace": "world", "event": "teleport", "data": {}}))
            .await;
        assert_eq!(response["data"]["reason"], "malformed_request");

        let response = harness
            .send(a, json!({"namespace": "world", "event": "join", "data": {"nom": "x"}}))
            .await;
        assert_eq!(response["data"]["reason"], "malformed_request");
    }

    #[tokio::test]
    async fn exhausted_world_fails_the_join() {
        let harness = Harness::new(1);
        let (a, _a_rx) = harness.connect().await;
        let (b, _b_rx) = harness.connect().await;
        harness.join(a, "alice").await;

        let response = harness.join(b, "bob").await;
        assert_eq!(response["data"]["status"], "failed");
        assert_eq!(response["data"]["reason"], "exhausted");
    }

    #[tokio::test]
    async fn unregistered_connections_are_an_internal_error() {
        let harness = Harness::new(1);
        let result = route_client_message(
            &json!({"namespace": "world", "event": "join", "data": {"name": "ghost"}}).to_string(),
            99,
            &harness.manager,
            &harness.coordinator,
        )
        .await;
        assert!(matches!(result, Err(ServerError::Internal(_))));
    }
}
