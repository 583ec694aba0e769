//! Integration tests for the CDP client and the print pipeline.
//!
//! Each test spins up a mock WebSocket server with configurable behavior,
//! connects a `CdpClient`, and verifies the expected interactions.

use std::net::SocketAddr;
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use futures_util::{SinkExt, StreamExt};
use html2pdf::cdp::{CdpClient, CdpConfig, CdpError};
use html2pdf::pdf::{PrintOptions, print_page};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

// =============================================================================
// Mock server helpers
// =============================================================================

/// Start a mock CDP server that echoes `{"id": N, "result": {}}` for each command.
async fn start_echo_server() -> (SocketAddr, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
                let (mut sink, mut source) = ws.split();
                while let Some(Ok(msg)) = source.next().await {
                    if let Message::Text(text) = msg {
                        let cmd: Value = serde_json::from_str(&text).unwrap();
                        let response = json!({"id": cmd["id"], "result": {}});
                        sink.send(Message::Text(response.to_string().into()))
                            .await
                            .unwrap();
                    }
                }
            });
        }
    });
    (addr, handle)
}

/// Start a mock server that never responds to commands (for timeout tests).
async fn start_silent_server() -> (SocketAddr, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
                let (_sink, mut source) = ws.split();
                // Accept commands but never respond
                while source.next().await.is_some() {}
            });
        }
    });
    (addr, handle)
}

/// Start a mock server that returns a CDP protocol error for each command.
async fn start_protocol_error_server(code: i64, message: &str) -> (SocketAddr, JoinHandle<()>) {
    let message = message.to_owned();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let message = message.clone();
            tokio::spawn(async move {
                let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
                let (mut sink, mut source) = ws.split();
                while let Some(Ok(msg)) = source.next().await {
                    if let Message::Text(text) = msg {
                        let cmd: Value = serde_json::from_str(&text).unwrap();
                        let response = json!({
                            "id": cmd["id"],
                            "error": {"code": code, "message": message}
                        });
                        sink.send(Message::Text(response.to_string().into()))
                            .await
                            .unwrap();
                    }
                }
            });
        }
    });
    (addr, handle)
}

/// Start a mock server that records all received messages including sessionId.
///
/// `Target.createTarget` and `Target.attachToTarget` get plausible results
/// so a session can be established; everything else is echoed.
async fn start_recording_server() -> (SocketAddr, mpsc::Receiver<Value>, JoinHandle<()>) {
    let (record_tx, record_rx) = mpsc::channel::<Value>(64);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let record_tx = record_tx.clone();
            tokio::spawn(async move {
                let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
                let (mut sink, mut source) = ws.split();
                while let Some(Ok(msg)) = source.next().await {
                    if let Message::Text(text) = msg {
                        let cmd: Value = serde_json::from_str(&text).unwrap();
                        let _ = record_tx.send(cmd.clone()).await;

                        let result = match cmd["method"].as_str() {
                            Some("Target.createTarget") => json!({"targetId": "T1"}),
                            Some("Target.attachToTarget") => json!({"sessionId": "S1"}),
                            _ => json!({}),
                        };
                        let response = json!({"id": cmd["id"], "result": result});
                        sink.send(Message::Text(response.to_string().into()))
                            .await
                            .unwrap();
                    }
                }
            });
        }
    });
    (addr, record_rx, handle)
}

/// Start a mock server scripted for a full print conversion.
///
/// It hands out a target and session, fires `Page.lifecycleEvent
/// (networkIdle)` once lifecycle events are enabled, fires
/// `Page.domContentEventFired` after navigation, and answers
/// `Page.printToPDF` with `pdf_bytes` base64-encoded.
async fn start_print_server(pdf_bytes: &'static [u8]) -> (SocketAddr, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        if let Ok((stream, _)) = listener.accept().await {
            let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            let (mut sink, mut source) = ws.split();
            while let Some(Ok(msg)) = source.next().await {
                let Message::Text(text) = msg else { continue };
                let cmd: Value = serde_json::from_str(&text).unwrap();
                let method = cmd["method"].as_str().unwrap_or_default();

                let result = match method {
                    "Target.createTarget" => json!({"targetId": "T1"}),
                    "Target.attachToTarget" => json!({"sessionId": "S1"}),
                    "Page.navigate" => json!({"frameId": "F1"}),
                    "Page.printToPDF" => json!({"data": BASE64.encode(pdf_bytes)}),
                    _ => json!({}),
                };
                let response = json!({"id": cmd["id"], "result": result});
                sink.send(Message::Text(response.to_string().into()))
                    .await
                    .unwrap();

                // Fire the events the pipeline waits on after the
                // triggering command has been answered.
                let event = match method {
                    "Page.setLifecycleEventsEnabled" => Some(json!({
                        "method": "Page.lifecycleEvent",
                        "params": {"name": "networkIdle"},
                        "sessionId": "S1",
                    })),
                    "Page.navigate" => Some(json!({
                        "method": "Page.domContentEventFired",
                        "params": {"timestamp": 1.0},
                        "sessionId": "S1",
                    })),
                    _ => None,
                };
                if let Some(event) = event {
                    sink.send(Message::Text(event.to_string().into()))
                        .await
                        .unwrap();
                }
            }
        }
    });
    (addr, handle)
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn send_command_round_trip() {
    let (addr, _server) = start_echo_server().await;
    let client = CdpClient::connect(&format!("ws://{addr}"), CdpConfig::default())
        .await
        .unwrap();

    let result = client.send_command("Browser.getVersion", None).await.unwrap();
    assert_eq!(result, json!({}));

    client.close().await.unwrap();
}

#[tokio::test]
async fn silent_server_times_out_commands() {
    let (addr, _server) = start_silent_server().await;
    let config = CdpConfig {
        command_timeout: Duration::from_millis(200),
        ..CdpConfig::default()
    };
    let client = CdpClient::connect(&format!("ws://{addr}"), config)
        .await
        .unwrap();

    let err = client.send_command("Page.enable", None).await.unwrap_err();
    match err {
        CdpError::CommandTimeout { method } => assert_eq!(method, "Page.enable"),
        other => panic!("expected CommandTimeout, got {other}"),
    }
}

#[tokio::test]
async fn protocol_errors_surface_code_and_message() {
    let (addr, _server) = start_protocol_error_server(-32000, "Cannot print").await;
    let client = CdpClient::connect(&format!("ws://{addr}"), CdpConfig::default())
        .await
        .unwrap();

    let err = client
        .send_command("Page.printToPDF", Some(json!({})))
        .await
        .unwrap_err();
    match err {
        CdpError::Protocol { code, message } => {
            assert_eq!(code, -32000);
            assert_eq!(message, "Cannot print");
        }
        other => panic!("expected Protocol, got {other}"),
    }
}

#[tokio::test]
async fn session_commands_carry_the_session_id() {
    let (addr, mut recorded, _server) = start_recording_server().await;
    let client = CdpClient::connect(&format!("ws://{addr}"), CdpConfig::default())
        .await
        .unwrap();

    let target_id = client.create_target("about:blank").await.unwrap();
    assert_eq!(target_id, "T1");

    let session = client.attach(&target_id).await.unwrap();
    session.send_command("Page.enable", None).await.unwrap();

    let create = recorded.recv().await.unwrap();
    assert_eq!(create["method"], "Target.createTarget");
    assert!(create.get("sessionId").is_none());

    let attach = recorded.recv().await.unwrap();
    assert_eq!(attach["method"], "Target.attachToTarget");
    assert_eq!(attach["params"]["flatten"], true);

    let enable = recorded.recv().await.unwrap();
    assert_eq!(enable["method"], "Page.enable");
    assert_eq!(enable["sessionId"], "S1");
}

#[tokio::test]
async fn full_print_flow_produces_pdf_bytes() {
    let (addr, _server) = start_print_server(b"%PDF-1.7 mock document").await;
    let client = CdpClient::connect(&format!("ws://{addr}"), CdpConfig::default())
        .await
        .unwrap();

    let target_id = client.create_target("about:blank").await.unwrap();
    let session = client.attach(&target_id).await.unwrap();

    let bytes = print_page(
        &session,
        "https://example.com/",
        &PrintOptions::default(),
        Duration::from_secs(5),
    )
    .await
    .unwrap();

    assert_eq!(bytes, b"%PDF-1.7 mock document");
}
