//! Fake Slack for integration tests: mockito for the Web API, a local tungstenite server for RTM.

#![allow(dead_code)]

use std::io::Write;

use futures::{SinkExt, StreamExt};
use relay_slack::RelayConfig;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

pub const TEST_KEY: &str = "xoxb-test";

pub const SAMPLE_CONFIG: &str = r#"{"default_room":"general","friend_name":"Rosie","slack_key":"xoxb-test","slack_team":"Acme"}"#;

pub const CHANNELS_BODY: &str = r#"{
    "ok": true,
    "channels": [
        {"id": "C1", "name": "general", "is_archived": false},
        {"id": "C2", "name": "random", "is_archived": false}
    ],
    "response_metadata": {"next_cursor": ""}
}"#;

pub fn sample_config() -> RelayConfig {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(SAMPLE_CONFIG.as_bytes()).unwrap();
    RelayConfig::load(file.path()).unwrap()
}

/// Registers `conversations.list` returning general (C1) and random (C2).
/// Callers must hold the returned mock until the request completes.
pub async fn mock_channels(server: &mut mockito::ServerGuard) -> mockito::Mock {
    server
        .mock("GET", "/conversations.list")
        .match_query(mockito::Matcher::Any)
        .match_header("authorization", format!("Bearer {TEST_KEY}").as_str())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(CHANNELS_BODY)
        .create_async()
        .await
}

/// Registers `rtm.connect` pointing at `ws_url`.
pub async fn mock_rtm_connect(server: &mut mockito::ServerGuard, ws_url: &str) -> mockito::Mock {
    let body = serde_json::json!({
        "ok": true,
        "url": ws_url,
        "team": {"id": "T1", "name": "Acme", "domain": "acme"},
        "self": {"id": "U9", "name": "rosie"}
    });
    server
        .mock("GET", "/rtm.connect")
        .match_header("authorization", format!("Bearer {TEST_KEY}").as_str())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body.to_string())
        .create_async()
        .await
}

/// Frame received by the fake RTM server: (connection number starting at 1, text).
pub type Received = (usize, String);

/// How the fake RTM server treats its first connection. Later connections are always steady.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirstConnection {
    /// Answers pings and stays open.
    Steady,
    /// Answers the first client frame with `goodbye` and closes.
    Goodbye,
    /// Accepts the first client frame, then never sends anything again while keeping the socket open.
    Silent,
}

/// Accepts websocket connections, greets each with `hello`, answers RTM pings with `pong`, and
/// reports every other text frame the client sends.
pub async fn spawn_rtm_server(
    first: FirstConnection,
) -> (String, mpsc::UnboundedReceiver<Received>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let mut conn_no = 0;
        while let Ok((stream, _)) = listener.accept().await {
            conn_no += 1;
            let mode = if conn_no == 1 { first } else { FirstConnection::Steady };
            let tx = tx.clone();
            tokio::spawn(async move {
                let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                    return;
                };
                let hello = r#"{"type":"hello"}"#.to_string();
                if ws.send(Message::Text(hello.into())).await.is_err() {
                    return;
                }
                let mut silent = false;
                while let Some(Ok(msg)) = ws.next().await {
                    let Message::Text(text) = msg else {
                        continue;
                    };
                    if silent {
                        continue;
                    }
                    let frame: serde_json::Value =
                        serde_json::from_str(text.as_str()).unwrap_or_default();
                    if frame["type"] == "ping" {
                        let pong = serde_json::json!({"type": "pong", "reply_to": frame["id"]});
                        let _ = ws.send(Message::Text(pong.to_string().into())).await;
                        continue;
                    }
                    let _ = tx.send((conn_no, text.as_str().to_string()));
                    match mode {
                        FirstConnection::Steady => {}
                        FirstConnection::Goodbye => {
                            let goodbye = r#"{"type":"goodbye"}"#.to_string();
                            let _ = ws.send(Message::Text(goodbye.into())).await;
                            let _ = ws.close(None).await;
                            break;
                        }
                        FirstConnection::Silent => silent = true,
                    }
                }
            });
        }
    });

    (url, rx)
}
