use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use thrum_core::AgentId;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_util::sync::CancellationToken;

use super::*;
use crate::messages::SendRequest;
use crate::sync::{GitSyncLoop, PeerSyncLoop};
use crate::test_support::test_daemon;

async fn spawn_server() -> (Arc<Daemon<thrum_core::FakeClock>>, u16, CancellationToken) {
    let daemon = Arc::new(test_daemon());
    let git_sync = Arc::new(GitSyncLoop::spawn(daemon.clone()));
    let peer_sync = Arc::new(PeerSyncLoop::spawn(daemon.clone()));
    let dispatcher = Arc::new(Dispatcher::new(daemon.clone(), git_sync, peer_sync));
    let config = daemon.config.clone();
    let cancel = CancellationToken::new();

    let port = WsServer::serve(0, dispatcher, daemon.clone(), config, cancel.clone())
        .await
        .expect("bind websocket listener");
    (daemon, port, cancel)
}

#[tokio::test]
async fn health_request_round_trips_over_websocket() {
    let (_daemon, port, cancel) = spawn_server().await;
    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://127.0.0.1:{port}/ws"))
        .await
        .expect("connect");

    ws.send(WsMessage::Text(r#"{"jsonrpc":"2.0","id":1,"method":"health","params":{}}"#.into()))
        .await
        .expect("send health request");

    let response = tokio::time::timeout(Duration::from_secs(2), ws.next())
        .await
        .expect("response within timeout")
        .expect("stream not closed")
        .expect("valid frame");
    let WsMessage::Text(text) = response else { panic!("expected a text frame") };
    assert!(text.contains("\"result\""));
    cancel.cancel();
}

#[tokio::test]
async fn subscribing_then_sending_pushes_a_notification_over_websocket() {
    let (daemon, port, cancel) = spawn_server().await;
    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://127.0.0.1:{port}/ws"))
        .await
        .expect("connect");

    let subscribe_req = json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "subscribe",
        "params": {"client_session_id": "ws-sub-1", "mode": "all"},
    });
    ws.send(WsMessage::Text(subscribe_req.to_string().into())).await.expect("send subscribe");
    let response = tokio::time::timeout(Duration::from_secs(2), ws.next())
        .await
        .expect("subscribe response within timeout")
        .expect("stream not closed")
        .expect("valid frame");
    let WsMessage::Text(text) = response else { panic!("expected a text frame") };
    assert!(text.contains("\"result\""));

    daemon
        .send_message(SendRequest {
            author: AgentId::new(),
            content: "hello from websocket test",
            format: None,
            mentions: vec![],
            to: vec![],
            scopes: vec![],
            refs: vec![],
            reply_to: None,
            structured: None,
            priority: thrum_core::Priority::Normal,
            broadcast: false,
            acting_as: None,
            disclosed: true,
        })
        .expect("send message");

    let pushed = tokio::time::timeout(Duration::from_secs(2), ws.next())
        .await
        .expect("notification within timeout")
        .expect("stream not closed")
        .expect("valid frame");
    let WsMessage::Text(text) = pushed else { panic!("expected a text frame") };
    assert!(text.contains("notification.message"));
    cancel.cancel();
}

#[tokio::test]
async fn a_plain_http_request_to_an_unknown_path_serves_ui_fallback() {
    let (_daemon, port, cancel) = spawn_server().await;
    let mut stream = tokio::net::TcpStream::connect(("127.0.0.1", port)).await.expect("connect");
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    stream.write_all(b"GET /not-a-real-path HTTP/1.1\r\nHost: localhost\r\n\r\n").await.expect("write request");

    let mut buf = vec![0u8; 4096];
    let n = tokio::time::timeout(Duration::from_secs(2), stream.read(&mut buf))
        .await
        .expect("read within timeout")
        .expect("read succeeds");
    let text = String::from_utf8_lossy(&buf[..n]);
    assert!(text.contains("thrum"));
    cancel.cancel();
}
