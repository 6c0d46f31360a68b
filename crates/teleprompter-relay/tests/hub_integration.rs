//! Integration tests for the WebSocket hub.
//!
//! Real loopback clients (`tokio_tungstenite::connect_async`) talk to a hub
//! bound on `127.0.0.1:0`.  The tests verify:
//!
//! - N concurrent clients each sending M commands produce exactly N×M
//!   handler calls, in send order per connection, with payloads untouched.
//! - Commands without `key`, unknown events and garbage never reach the
//!   command handler and never close the connection.
//! - A disconnecting client is silent apart from a lifecycle event.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::SinkExt;
use serde_json::{json, Value};
use teleprompter_core::CommandEvent;
use teleprompter_relay::infrastructure::{ConnectionHub, ConnectionId, HubEvent, HubListener};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

// ── Helpers ───────────────────────────────────────────────────────────────────

#[derive(Debug)]
enum Observed {
    Command(ConnectionId, CommandEvent),
    Event(HubEvent),
}

/// Forwards everything the hub reports into a channel the test can await.
struct ChannelListener {
    tx: mpsc::UnboundedSender<Observed>,
}

impl HubListener for ChannelListener {
    fn on_command(&self, connection: ConnectionId, event: CommandEvent) {
        let _ = self.tx.send(Observed::Command(connection, event));
    }

    fn on_hub_event(&self, event: HubEvent) {
        let _ = self.tx.send(Observed::Event(event));
    }
}

async fn start_hub() -> (SocketAddr, CancellationToken, mpsc::UnboundedReceiver<Observed>) {
    let hub = ConnectionHub::bind("127.0.0.1:0".parse().unwrap())
        .await
        .expect("bind loopback");
    let addr = hub.local_addr();
    let (tx, rx) = mpsc::unbounded_channel();
    let token = CancellationToken::new();
    hub.serve(Arc::new(ChannelListener { tx }), token.clone());
    (addr, token, rx)
}

async fn next_command(rx: &mut mpsc::UnboundedReceiver<Observed>) -> (ConnectionId, CommandEvent) {
    loop {
        let observed = tokio::time::timeout(RECV_TIMEOUT, rx.recv())
            .await
            .expect("timed out waiting for a command")
            .expect("hub listener dropped");
        if let Observed::Command(id, event) = observed {
            return (id, event);
        }
    }
}

async fn next_event(rx: &mut mpsc::UnboundedReceiver<Observed>) -> HubEvent {
    loop {
        let observed = tokio::time::timeout(RECV_TIMEOUT, rx.recv())
            .await
            .expect("timed out waiting for a hub event")
            .expect("hub listener dropped");
        if let Observed::Event(event) = observed {
            return event;
        }
    }
}

// ── Fan-in and ordering ───────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_clients_commands_all_arrive_in_per_connection_order() {
    // Arrange
    const CLIENTS: usize = 5;
    const COMMANDS: usize = 20;
    let (addr, token, mut rx) = start_hub().await;
    let url = format!("ws://{addr}");

    // Act: every client sends its commands as fast as it can.
    let mut senders = Vec::new();
    for client in 0..CLIENTS {
        let url = url.clone();
        senders.push(tokio::spawn(async move {
            let (mut ws, _) = connect_async(url).await.expect("connect");
            for seq in 0..COMMANDS {
                let frame = json!(["command", {"key": "ArrowDown", "client": client, "seq": seq}]);
                ws.send(Message::Text(frame.to_string())).await.expect("send");
            }
            ws
        }));
    }

    let mut by_connection: HashMap<ConnectionId, Vec<Value>> = HashMap::new();
    for _ in 0..CLIENTS * COMMANDS {
        let (id, event) = next_command(&mut rx).await;
        by_connection.entry(id).or_default().push(Value::Object(event.into_payload()));
    }

    // Assert: N connections, M commands each, sequence preserved per connection.
    assert_eq!(by_connection.len(), CLIENTS);
    for payloads in by_connection.values() {
        assert_eq!(payloads.len(), COMMANDS);
        let client = payloads[0]["client"].clone();
        for (seq, payload) in payloads.iter().enumerate() {
            assert_eq!(
                *payload,
                json!({"key": "ArrowDown", "client": client, "seq": seq}),
                "payload must round-trip untouched and in order"
            );
        }
    }

    for sender in senders {
        drop(sender.await.unwrap());
    }
    token.cancel();
}

// ── Malformed input ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_bad_frames_are_dropped_without_closing_the_connection() {
    // Arrange
    let (addr, token, mut rx) = start_hub().await;
    let (mut ws, _) = connect_async(format!("ws://{addr}")).await.expect("connect");

    // Act: a run of frames the hub must ignore, then one good command.
    let ignored = [
        r#"["command",{"code":38}]"#.to_string(),
        r#"{"event":"command","data":"ArrowUp"}"#.to_string(),
        r#"{"event":"hello","data":{"key":"x"}}"#.to_string(),
        "not json at all".to_string(),
    ];
    for frame in ignored {
        ws.send(Message::Text(frame)).await.unwrap();
    }
    ws.send(Message::Binary(vec![1, 2, 3])).await.unwrap();
    ws.send(Message::Text(r#"42["command",{"key":"Space"}]"#.to_string()))
        .await
        .unwrap();

    // Assert: the only command is the good one.
    let (_, event) = next_command(&mut rx).await;
    assert_eq!(event.key(), &json!("Space"));

    token.cancel();
}

#[tokio::test]
async fn test_missing_key_is_reported_as_hub_event() {
    let (addr, token, mut rx) = start_hub().await;
    let (mut ws, _) = connect_async(format!("ws://{addr}")).await.expect("connect");

    let connected = next_event(&mut rx).await;
    ws.send(Message::Text(r#"{"event":"command","data":{"speed":2}}"#.to_string()))
        .await
        .unwrap();
    let malformed = next_event(&mut rx).await;

    let HubEvent::Connected { connection, .. } = connected else {
        panic!("expected Connected first, got {connected:?}");
    };
    assert!(matches!(
        malformed,
        HubEvent::MalformedCommand { connection: c, .. } if c == connection
    ));
    token.cancel();
}

// ── Lifecycle ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_disconnect_is_silent_and_reconnect_gets_new_id() {
    // Arrange
    let (addr, token, mut rx) = start_hub().await;
    let url = format!("ws://{addr}");

    // Act: connect, close, connect again.
    let (mut first, _) = connect_async(url.clone()).await.expect("connect");
    let HubEvent::Connected { connection: first_id, .. } = next_event(&mut rx).await else {
        panic!("expected Connected");
    };
    first.close(None).await.unwrap();
    let disconnected = next_event(&mut rx).await;

    let (_second, _) = connect_async(url).await.expect("reconnect");
    let HubEvent::Connected { connection: second_id, .. } = next_event(&mut rx).await else {
        panic!("expected Connected");
    };

    // Assert
    assert!(matches!(
        disconnected,
        HubEvent::Disconnected { connection, .. } if connection == first_id
    ));
    assert_ne!(first_id, second_id, "a returning client is a new connection");
    token.cancel();
}

#[tokio::test]
async fn test_cancel_closes_open_connections() {
    // Arrange
    let (addr, token, mut rx) = start_hub().await;
    let (mut ws, _) = connect_async(format!("ws://{addr}")).await.expect("connect");
    let _ = next_event(&mut rx).await;

    // Act
    token.cancel();

    // Assert: the server side goes away; the client sees end of stream.
    use futures_util::StreamExt;
    let ended = tokio::time::timeout(RECV_TIMEOUT, async {
        while let Some(msg) = ws.next().await {
            if msg.is_err() || matches!(msg, Ok(Message::Close(_))) {
                break;
            }
        }
    })
    .await;
    assert!(ended.is_ok(), "connection must close after cancellation");
}
