//! End-to-end tests of the forward connection against a scripted
//! bot-implementation server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;

use solder_link::{
    CallError, ConnState, ConnectionError, ForwardConfig, ForwardWebSocketConnection,
};
use solder_model::Action;

/// Starts a WebSocket server playing the bot implementation.
///
/// It answers every request by action name; `black_hole` swallows the
/// request, `bye` drops the connection.
async fn spawn_mock_impl() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
                while let Some(Ok(message)) = ws.next().await {
                    let Message::Text(text) = message else {
                        continue;
                    };
                    let request: Value = serde_json::from_str(text.as_str()).unwrap();
                    let action = request["action"].as_str().unwrap();
                    let echo = request["echo"].clone();
                    let response = match action {
                        "send_private_msg" => json!({
                            "status": "ok",
                            "retcode": 0,
                            "data": {"message_id": 99},
                            "echo": echo,
                        }),
                        "black_hole" => continue,
                        "bye" => {
                            let _ = ws.close(None).await;
                            break;
                        }
                        "always_sync_rate_limited" => json!({
                            "status": "ok",
                            "retcode": 0,
                            "data": null,
                            "echo": echo,
                        }),
                        name if name.ends_with("_rate_limited") || name.ends_with("_async") => {
                            json!({
                                "status": "async",
                                "retcode": 1,
                                "data": null,
                                "echo": echo,
                            })
                        }
                        _ => json!({"status": "ok", "retcode": 0, "data": null, "echo": echo}),
                    };
                    ws.send(Message::Text(response.to_string().into()))
                        .await
                        .unwrap();
                }
            });
        }
    });
    addr
}

fn config_for(addr: SocketAddr) -> ForwardConfig {
    ForwardConfig::new("127.0.0.1", addr.port())
        .with_reconnect_interval(Duration::from_millis(100))
        .with_call_timeout(Duration::from_secs(5))
}

async fn await_state(conn: &ForwardWebSocketConnection, wanted: ConnState) {
    let mut watch = conn.state_watch();
    timeout(Duration::from_secs(5), async {
        loop {
            if *watch.borrow_and_update() == wanted {
                return;
            }
            watch.changed().await.unwrap();
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn call_round_trip() {
    let addr = spawn_mock_impl().await;
    let conn = ForwardWebSocketConnection::connect(config_for(addr));
    conn.await_connected().await.unwrap();
    assert!(conn.is_connected());

    let message_id = conn.send_private_msg(123, "hi").await.unwrap();
    assert_eq!(message_id, 99);

    // Payload-less action, answered with a null payload.
    conn.set_group_whole_ban(42, true).await.unwrap();

    // Deferred policies accept the `async` status.
    conn.send_group_msg_rate_limited(42, "later").await.unwrap();
    conn.send_private_msg_async(123, "later too").await.unwrap();

    conn.close().await.unwrap();
    assert_eq!(conn.state(), ConnState::Closed);
    assert!(matches!(
        conn.close().await,
        Err(ConnectionError::AlreadyClosed)
    ));
}

#[tokio::test]
async fn sync_answer_to_rate_limited_call_is_rejected() {
    const ALWAYS_SYNC: Action<Value, ()> = Action::new("always_sync");

    let addr = spawn_mock_impl().await;
    let conn = ForwardWebSocketConnection::connect(config_for(addr));
    conn.await_connected().await.unwrap();

    let error = conn
        .call_rate_limited(&ALWAYS_SYNC, &json!({}))
        .await
        .unwrap_err();
    assert!(matches!(error, CallError::UnexpectedStatus { status, .. } if status == "ok"));

    conn.close().await.unwrap();
}

#[tokio::test]
async fn closing_fails_all_pending_calls() {
    const BLACK_HOLE: Action<Value, Value> = Action::new("black_hole");

    let addr = spawn_mock_impl().await;
    let conn = Arc::new(ForwardWebSocketConnection::connect(config_for(addr)));
    conn.await_connected().await.unwrap();

    let callers: Vec<_> = (0..3)
        .map(|i| {
            let conn = Arc::clone(&conn);
            tokio::spawn(async move { conn.call(&BLACK_HOLE, &json!({"i": i})).await })
        })
        .collect();

    timeout(Duration::from_secs(2), async {
        while conn.pending_calls() < 3 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    conn.close().await.unwrap();

    // All three resolve promptly with a connection failure.
    for caller in callers {
        let result = timeout(Duration::from_secs(2), caller).await.unwrap();
        assert!(matches!(
            result.unwrap(),
            Err(CallError::ConnectionLost)
        ));
    }
    assert_eq!(conn.pending_calls(), 0);
}

#[tokio::test]
async fn reconnects_after_the_server_drops_the_session() {
    const BYE: Action<Value, ()> = Action::new("bye");

    let addr = spawn_mock_impl().await;
    let conn = ForwardWebSocketConnection::connect(config_for(addr));
    conn.await_connected().await.unwrap();

    // The server hangs up without answering; the call fails and the
    // connection dials again.
    let error = conn.call(&BYE, &json!({})).await.unwrap_err();
    assert!(matches!(error, CallError::ConnectionLost));

    conn.await_connected().await.unwrap();
    let message_id = conn.send_private_msg(123, "back again").await.unwrap();
    assert_eq!(message_id, 99);

    conn.close().await.unwrap();
}

#[tokio::test]
async fn exhausted_attempts_reach_the_terminal_state() {
    // A port nothing listens on.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let conn = ForwardWebSocketConnection::connect(
        ForwardConfig::new("127.0.0.1", addr.port())
            .with_max_connect_attempts(2)
            .with_reconnect_interval(Duration::from_millis(50)),
    );
    await_state(&conn, ConnState::Closed).await;

    assert!(matches!(
        conn.close().await,
        Err(ConnectionError::AlreadyClosed)
    ));
}

#[tokio::test]
async fn calls_without_a_session_fail_immediately() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let conn = ForwardWebSocketConnection::connect(
        ForwardConfig::new("127.0.0.1", addr.port())
            .with_reconnect_interval(Duration::from_secs(30)),
    );

    let error = conn.send_private_msg(123, "nope").await.unwrap_err();
    assert!(matches!(error, CallError::NotConnected));

    let error = conn.disconnect("bye").await.unwrap_err();
    assert!(matches!(error, ConnectionError::NotConnected));

    conn.close().await.unwrap();
}
