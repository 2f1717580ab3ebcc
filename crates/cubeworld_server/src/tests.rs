use crate::*;
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn spawn_server(config: ServerConfig) -> (Arc<WorldServer>, String) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("listener has an address");
    let server = Arc::new(create_server_with_config(config));

    let serving = server.clone();
    tokio::spawn(async move {
        serving.serve(listener, None).await.expect("server failed");
    });

    (server, format!("ws://{addr}"))
}

async fn connect(url: &str) -> Client {
    let (client, _) = connect_async(url).await.expect("Failed to connect");
    client
}

async fn send(client: &mut Client, message: Value) {
    client
        .send(Message::Text(message.to_string().into()))
        .await
        .expect("Failed to send");
}

async fn next_json(client: &mut Client) -> Value {
    loop {
        let frame = timeout(Duration::from_secs(5), client.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("stream ended")
            .expect("websocket error");
        if let Message::Text(text) = frame {
            return serde_json::from_str(text.as_str()).expect("frame is JSON");
        }
    }
}

async fn join(client: &mut Client, name: &str) -> Value {
    send(client, json!({"namespace": "world", "event": "join", "data": {"name": name}})).await;
    let response = next_json(client).await;
    assert_eq!(response["event"], "join_result");
    response["data"].clone()
}

#[tokio::test(flavor = "multi_thread")]
async fn test_two_clients_share_one_world() {
    let (server, url) = spawn_server(ServerConfig::default()).await;
    let mut alice = connect(&url).await;
    let mut bob = connect(&url).await;

    let alice_join = join(&mut alice, "alice").await;
    assert_eq!(alice_join["status"], "succeed");
    assert_eq!(alice_join["slot_index"], 0);
    assert_eq!(alice_join["others"], json!([]));

    let bob_join = join(&mut bob, "bob").await;
    assert_eq!(bob_join["status"], "succeed");
    assert_eq!(bob_join["slot_index"], 1);
    assert_eq!(bob_join["others"][0]["name"], "alice");
    assert_eq!(bob_join["others"][0]["slot_index"], 0);

    let joined = next_json(&mut alice).await;
    assert_eq!(
        joined,
        json!({"event": "member_joined", "data": {"slot_index": 1, "name": "bob"}})
    );

    send(
        &mut bob,
        json!({"namespace": "world", "event": "place_object", "data": {
            "channel_id": bob_join["channel_id"],
            "object": {"id": "cube-1", "position": {"x": 100.0, "y": 0.5, "z": 0.0}, "color": {"r": 1.0, "g": 0.5, "b": 0.0}},
            "name": "bob"
        }}),
    )
    .await;
    assert_eq!(
        next_json(&mut bob).await,
        json!({"event": "ack", "data": {"request": "place_object"}})
    );

    let added = next_json(&mut alice).await;
    assert_eq!(added["event"], "object_added");
    assert_eq!(added["data"]["owner_name"], "bob");
    assert_eq!(added["data"]["object"]["id"], "cube-1");

    bob.close(None).await.expect("Failed to close");

    let left = next_json(&mut alice).await;
    assert_eq!(
        left,
        json!({"event": "member_left", "data": {"slot_index": 1, "name": "bob"}})
    );

    let coordinator = server.get_coordinator();
    assert_eq!(coordinator.session_count().await, 1);
    assert_eq!(coordinator.stats().objects_placed, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_closed_session_frees_name_and_slot() {
    let (_server, url) = spawn_server(ServerConfig::default()).await;
    let mut watcher = connect(&url).await;
    join(&mut watcher, "watcher").await;

    let mut first = connect(&url).await;
    let first_join = join(&mut first, "builder").await;
    assert_eq!(first_join["slot_index"], 1);
    next_json(&mut watcher).await;

    drop(first);
    let left = next_json(&mut watcher).await;
    assert_eq!(left["event"], "member_left");

    let mut second = connect(&url).await;
    let second_join = join(&mut second, "builder").await;
    assert_eq!(second_join["status"], "succeed");
    assert_eq!(second_join["slot_index"], 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rejections_keep_the_connection_open() {
    let mut config = ServerConfig::default();
    config.world.max_slots = 1;
    let (server, url) = spawn_server(config).await;

    let mut alice = connect(&url).await;
    join(&mut alice, "alice").await;

    let mut late = connect(&url).await;
    let rejected = join(&mut late, "alice").await;
    assert_eq!(rejected, json!({"status": "failed", "reason": "name_taken"}));
    let rejected = join(&mut late, "bob").await;
    assert_eq!(rejected, json!({"status": "failed", "reason": "exhausted"}));

    send(&mut late, json!({"namespace": "world", "event": "join", "data": {"name": "x\u{0007}"}})).await;
    let refused = next_json(&mut late).await;
    assert_eq!(refused["event"], "error");
    assert_eq!(refused["data"]["reason"], "malformed_request");

    late.send(Message::Text("][".to_string().into())).await.expect("Failed to send");
    assert_eq!(next_json(&mut late).await["event"], "error");

    assert_eq!(server.get_coordinator().session_count().await, 1);
    assert_eq!(server.get_coordinator().stats().joins_rejected, 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_shutdown_stops_accepting() {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("listener has an address");
    let server = Arc::new(create_server());
    let state = ShutdownState::new();

    let serving = server.clone();
    let serving_state = state.clone();
    let handle = tokio::spawn(async move { serving.serve(listener, Some(serving_state)).await });

    let url = format!("ws://{addr}");
    let mut alice = connect(&url).await;
    join(&mut alice, "alice").await;
    let coordinator = server.get_coordinator();
    assert_eq!(coordinator.session_count().await, 1);

    state.initiate_shutdown();
    let result = timeout(Duration::from_secs(5), handle)
        .await
        .expect("server did not stop")
        .expect("server task panicked");
    assert!(result.is_ok());

    // Open connections were closed and their sessions released.
    assert!(state.is_shutdown_complete());
    assert_eq!(coordinator.session_count().await, 0);
    assert_eq!(coordinator.stats().sessions_left, 1);
    assert_eq!(server.get_connection_manager().connection_count().await, 0);

    // The vacancy stream was consumed by the first run.
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    assert!(matches!(
        server.serve(listener, None).await,
        Err(ServerError::Internal(_))
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_connection_limit_counts_pending_handshakes() {
    let config = ServerConfig {
        max_connections: 1,
        ..ServerConfig::default()
    };
    let (_server, url) = spawn_server(config).await;
    let addr = url.trim_start_matches("ws://").to_string();

    // A socket that never completes its handshake still occupies the slot.
    let idle = TcpStream::connect(&addr).await.expect("Failed to connect");
    tokio::time::sleep(Duration::from_millis(100)).await;
    let refused = timeout(Duration::from_secs(5), connect_async(url.as_str()))
        .await
        .expect("refusal should be immediate");
    assert!(refused.is_err());

    drop(idle);
    tokio::time::sleep(Duration::from_millis(200)).await;
    let mut client = connect(&url).await;
    assert_eq!(join(&mut client, "alice").await["status"], "succeed");
}
