use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use thrum_core::AgentId;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tokio_util::sync::CancellationToken;

use super::*;
use crate::messages::SendRequest;
use crate::sync::{GitSyncLoop, PeerSyncLoop};
use crate::test_support::test_daemon;

fn socket_path() -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("thrum.sock");
    (dir, path)
}

async fn spawn_server(path: &std::path::Path) -> (Arc<Daemon<thrum_core::FakeClock>>, CancellationToken) {
    let daemon = Arc::new(test_daemon());
    let git_sync = Arc::new(GitSyncLoop::spawn(daemon.clone()));
    let peer_sync = Arc::new(PeerSyncLoop::spawn(daemon.clone()));
    let dispatcher = Arc::new(Dispatcher::new(daemon.clone(), git_sync, peer_sync));
    let cancel = CancellationToken::new();

    let path = path.to_path_buf();
    let serve_daemon = daemon.clone();
    let serve_cancel = cancel.clone();
    tokio::spawn(async move {
        let _ = UnixServer::serve(&path, dispatcher, serve_daemon, serve_cancel).await;
    });
    // Give the listener a moment to bind before the test dials it.
    tokio::time::sleep(Duration::from_millis(20)).await;
    (daemon, cancel)
}

async fn request_line(stream: &mut UnixStream, line: &str) -> String {
    stream.write_all(line.as_bytes()).await.expect("write request");
    stream.write_all(b"\n").await.expect("write newline");
    let mut reader = BufReader::new(stream);
    let mut out = String::new();
    reader.read_line(&mut out).await.expect("read response");
    out
}

#[tokio::test]
async fn health_request_round_trips_over_the_socket() {
    let (_dir, path) = socket_path();
    let (_daemon, cancel) = spawn_server(&path).await;

    let mut stream = UnixStream::connect(&path).await.expect("connect");
    let response = request_line(
        &mut stream,
        r#"{"jsonrpc":"2.0","id":1,"method":"health","params":{}}"#,
    )
    .await;
    assert!(response.contains("\"result\""));
    assert!(response.contains("\"version\""));
    cancel.cancel();
}

#[tokio::test]
async fn subscribing_then_sending_pushes_a_notification() {
    let (_dir, path) = socket_path();
    let (daemon, cancel) = spawn_server(&path).await;

    let mut subscriber = UnixStream::connect(&path).await.expect("connect subscriber");
    let subscribe_req = json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "subscribe",
        "params": {"client_session_id": "sub-1", "mode": "all"},
    });
    let response = request_line(&mut subscriber, &subscribe_req.to_string()).await;
    assert!(response.contains("\"result\""));

    let author = AgentId::new();
    daemon
        .send_message(SendRequest {
            author,
            content: "hello everyone",
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

    let mut reader = BufReader::new(&mut subscriber);
    let mut line = String::new();
    let read = tokio::time::timeout(Duration::from_secs(2), reader.read_line(&mut line)).await;
    assert!(read.is_ok(), "expected a pushed notification within the timeout");
    assert!(line.contains("notification.message"));
    cancel.cancel();
}
