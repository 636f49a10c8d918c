//! End-to-end tests wiring two `Connection`s against each other over
//! loopback TCP, exercising the full establish / chat / close lifecycle the
//! way the TUI drives it.

use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::time::timeout;
use wirechat::{ConnError, Connection, ConnectionEvent, Role};

async fn recv_event(rx: &mut UnboundedReceiver<ConnectionEvent>) -> ConnectionEvent {
    timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("Timed out waiting for event")
        .expect("Event channel closed")
}

/// Wait for `InboxReady` events until `conn`'s inbox has yielded `n` bodies.
async fn drain_messages(
    conn: &Connection,
    rx: &mut UnboundedReceiver<ConnectionEvent>,
    n: usize,
) -> Vec<String> {
    let mut bodies = Vec::new();
    while bodies.len() < n {
        match recv_event(rx).await {
            ConnectionEvent::InboxReady => {
                while let Some(body) = conn.inbox().poll() {
                    bodies.push(body);
                }
            }
            other => panic!("Expected InboxReady, got: {other:?}"),
        }
    }
    bodies
}

/// Establish a server/client pair over loopback, consuming the
/// establishment events on both sides.
async fn session() -> (
    Connection,
    UnboundedReceiver<ConnectionEvent>,
    Connection,
    UnboundedReceiver<ConnectionEvent>,
) {
    let (server_tx, mut server_rx) = mpsc::unbounded_channel();
    let server = Connection::start_server(0, server_tx);

    let port = match recv_event(&mut server_rx).await {
        ConnectionEvent::Listening { port } => port,
        other => panic!("Expected Listening, got: {other:?}"),
    };

    let (client_tx, mut client_rx) = mpsc::unbounded_channel();
    let client = Connection::start_client("127.0.0.1", port, client_tx);

    match recv_event(&mut server_rx).await {
        ConnectionEvent::Established { .. } => {}
        other => panic!("Expected Established on server, got: {other:?}"),
    }
    match recv_event(&mut client_rx).await {
        ConnectionEvent::Established { local_port, .. } => {
            assert_ne!(local_port, 0);
        }
        other => panic!("Expected Established on client, got: {other:?}"),
    }

    (server, server_rx, client, client_rx)
}

#[tokio::test]
async fn test_two_way_chat() {
    let (server, mut server_rx, client, mut client_rx) = session().await;
    assert_eq!(server.role(), Role::Server);
    assert_eq!(client.role(), Role::Client);

    assert!(client.send_message("hello from client").unwrap());
    assert!(client.send_message("colons: still: fine").unwrap());
    let received = drain_messages(&server, &mut server_rx, 2).await;
    assert_eq!(received, ["hello from client", "colons: still: fine"]);

    assert!(server.send_message("hello from server").unwrap());
    let received = drain_messages(&client, &mut client_rx, 1).await;
    assert_eq!(received, ["hello from server"]);
}

#[tokio::test]
async fn test_peer_names_match_socket_addresses() {
    let (server, _server_rx, client, _client_rx) = session().await;

    let server_sees = server.peer_name().expect("Server peer name set");
    let client_sees = client.peer_name().expect("Client peer name set");

    let server_peer: std::net::SocketAddr = server_sees.parse().unwrap();
    let client_peer: std::net::SocketAddr = client_sees.parse().unwrap();
    assert!(server_peer.ip().is_loopback());
    assert!(client_peer.ip().is_loopback());
}

#[tokio::test]
async fn test_message_order_preserved_under_burst() {
    let (server, mut server_rx, client, _client_rx) = session().await;

    let sent: Vec<String> = (0..50).map(|i| format!("message {i}")).collect();
    for text in &sent {
        assert!(client.send_message(text).unwrap());
    }

    let received = drain_messages(&server, &mut server_rx, sent.len()).await;
    assert_eq!(received, sent);
}

#[tokio::test]
async fn test_local_close_is_remote_graceful_close() {
    let (server, mut server_rx, client, mut client_rx) = session().await;

    client.request_close();
    assert!(client.is_ended());

    match recv_event(&mut server_rx).await {
        ConnectionEvent::PeerClosed => {}
        other => panic!("Expected PeerClosed on server, got: {other:?}"),
    }
    assert!(server.is_ended());

    // Messages after close on either side are dropped, not transmitted.
    assert!(!client.send_message("after close").unwrap());
    assert!(!server.send_message("after close").unwrap());

    client.join().await;
    server.join().await;

    // Neither side reports anything further: closer saw no event at all,
    // closee saw exactly the one PeerClosed.
    assert!(client_rx.recv().await.is_none());
    assert!(server_rx.recv().await.is_none());
}

#[tokio::test]
async fn test_close_race_both_sides_end_cleanly() {
    let (server, mut server_rx, client, mut client_rx) = session().await;

    server.request_close();
    client.request_close();

    assert!(server.is_ended());
    assert!(client.is_ended());
    server.join().await;
    client.join().await;

    // Each side sees at most one terminal notification.
    for rx in [&mut server_rx, &mut client_rx] {
        let mut terminal_events = 0;
        while let Some(event) = rx.recv().await {
            match event {
                ConnectionEvent::PeerClosed | ConnectionEvent::Fatal(_) => terminal_events += 1,
                other => panic!("Unexpected event after close race: {other:?}"),
            }
        }
        assert!(terminal_events <= 1);
    }
}

/// Mirrors the binary's exit sequence: close, bounded join on the runtime,
/// then runtime drop. Joining before the drop is what guarantees the
/// termination frame is flushed; without it the runtime cancels the write
/// task and the peer sees an abrupt EOF instead of a graceful close.
#[test]
fn test_close_flushes_termination_frame_before_runtime_drop() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let (server, mut server_rx, client, _client_rx) = runtime.block_on(session());

    client.request_close();
    runtime.block_on(async {
        let _ = timeout(Duration::from_secs(1), client.join()).await;
    });

    match runtime.block_on(recv_event(&mut server_rx)) {
        ConnectionEvent::PeerClosed => {}
        other => panic!("Expected PeerClosed on server, got: {other:?}"),
    }

    runtime.block_on(server.join());
    drop(runtime);
}

#[tokio::test]
async fn test_abrupt_peer_drop_is_fatal_not_graceful() {
    let (server, mut server_rx, client, _client_rx) = session().await;

    // Simulate the client process dying: tear down its tasks without
    // sending C:END. Dropping the handle closes the write channel, which
    // closes the stream without a termination frame.
    drop(client);

    match recv_event(&mut server_rx).await {
        ConnectionEvent::Fatal(ConnError::StreamEndedUnexpectedly) => {}
        other => panic!("Expected Fatal(StreamEndedUnexpectedly), got: {other:?}"),
    }
    assert!(server.is_ended());
}
