//! Integration tests for the overlay client against a real WebSocket server.
//!
//! A throwaway tokio-tungstenite server on an ephemeral port plays the event
//! source: it records every auth frame, pushes scripted messages, and closes
//! connections on demand.

use std::time::Duration;

use donation_overlay::client::{ClientOptions, OverlayClient};
use donation_overlay::settings::OverlaySettings;
use donation_overlay::surface::{OverlayState, WatchSurface};
use donation_overlay::transport::WsTransport;
use donation_overlay::types::{AuthPayload, EVENT_DONATION};
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Message;

// =============================================================================
// Test Helpers
// =============================================================================

/// What the fake event source does with each accepted connection.
#[derive(Clone)]
enum Script {
    /// Read the auth frame, then close immediately.
    AuthThenClose,
    /// Read the auth frame, send the frames, then hold the connection open.
    AuthThenSend(Vec<String>),
}

/// Starts a fake event source. Each accepted connection reports its auth
/// frame on the returned channel and then follows the next script entry; the
/// last entry repeats.
async fn spawn_event_source(scripts: Vec<Script>) -> (String, mpsc::UnboundedReceiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (auth_tx, auth_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let mut index = 0;
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            let script = scripts[index.min(scripts.len() - 1)].clone();
            index += 1;
            let auth_tx = auth_tx.clone();

            tokio::spawn(async move {
                let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                    return;
                };

                if let Some(Ok(Message::Text(text))) = ws.next().await {
                    let _ = auth_tx.send(text.as_str().to_string());
                }

                match script {
                    Script::AuthThenClose => {
                        let _ = ws.close(None).await;
                    }
                    Script::AuthThenSend(frames) => {
                        for frame in frames {
                            let _ = ws.send(Message::Text(frame.into())).await;
                        }
                        // Hold the socket until the client goes away.
                        while let Some(Ok(_)) = ws.next().await {}
                    }
                }
            });
        }
    });

    (format!("ws://{addr}/streamlabs"), auth_rx)
}

fn settings() -> OverlaySettings {
    OverlaySettings {
        goal_text: "Stream goal".to_string(),
        currency_name: "PLN".to_string(),
        donate_sound: "cash.mp3".to_string(),
    }
}

fn donation_frame(value: u64, goal: u64, progress: u64, quiet: bool) -> String {
    let data = json!({"value": value, "goal": goal, "progress": progress, "quiet": quiet});
    json!({"event": EVENT_DONATION, "data": data.to_string()}).to_string()
}

fn spawn_client(url: String, delay: Duration) -> (tokio::task::JoinHandle<()>, watch::Receiver<OverlayState>) {
    let (surface, rx) = WatchSurface::new();
    let mut client = OverlayClient::new(
        WsTransport::new(),
        surface,
        settings(),
        ClientOptions {
            server_url: url,
            reconnect_delay: delay,
        },
    );

    let task = tokio::spawn(async move {
        let _ = client.run(Some("integration-key".to_string())).await;
    });
    (task, rx)
}

async fn next_auth(rx: &mut mpsc::UnboundedReceiver<String>) -> AuthPayload {
    let frame = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for auth frame")
        .expect("event source stopped");
    serde_json::from_str(&frame).expect("auth frame is an AuthPayload")
}

async fn wait_for_state<F>(rx: &mut watch::Receiver<OverlayState>, predicate: F) -> OverlayState
where
    F: Fn(&OverlayState) -> bool,
{
    let state = tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|s| predicate(s)))
        .await
        .expect("timed out waiting for overlay state")
        .expect("surface dropped");
    state.clone()
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn test_auth_is_first_frame_on_every_connection() {
    let (url, mut auth_rx) = spawn_event_source(vec![Script::AuthThenClose]).await;
    let (task, _state) = spawn_client(url, Duration::from_millis(50));

    for _ in 0..3 {
        let auth = next_auth(&mut auth_rx).await;
        assert_eq!(auth, AuthPayload::new("integration-key"));
    }

    task.abort();
}

#[tokio::test]
async fn test_donation_updates_overlay() {
    let frames = vec![
        json!({"event": "EVENT_FOLLOW", "data": "{}"}).to_string(),
        donation_frame(40, 200, 20, false),
    ];
    let (url, mut auth_rx) = spawn_event_source(vec![Script::AuthThenSend(frames)]).await;
    let (task, mut state_rx) = spawn_client(url, Duration::from_millis(50));

    next_auth(&mut auth_rx).await;
    let state = wait_for_state(&mut state_rx, |s| s.goal_text.is_some()).await;

    assert_eq!(state.goal_text.as_deref(), Some("Stream goal 40/200 PLN"));
    assert_eq!(state.progress, Some(20.0));
    assert_eq!(state.sound.as_deref(), Some("cash.mp3"));

    task.abort();
}

#[tokio::test]
async fn test_reconnects_after_server_close_and_resumes_updates() {
    let (url, mut auth_rx) = spawn_event_source(vec![
        Script::AuthThenClose,
        Script::AuthThenSend(vec![donation_frame(10, 100, 10, true)]),
    ])
    .await;
    let (task, mut state_rx) = spawn_client(url, Duration::from_millis(100));

    next_auth(&mut auth_rx).await;
    next_auth(&mut auth_rx).await;

    let state = wait_for_state(&mut state_rx, |s| s.progress.is_some()).await;
    assert_eq!(state.goal_text.as_deref(), Some("Stream goal 10/100 PLN"));
    assert!(state.sound.is_none(), "quiet donation must not cue a sound");

    task.abort();
}

#[tokio::test]
async fn test_keeps_retrying_while_nothing_listens() {
    // Reserve a port, then free it so the first attempts are refused.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let (task, _state) = spawn_client(format!("ws://{addr}/streamlabs"), Duration::from_millis(50));
    tokio::time::sleep(Duration::from_millis(300)).await;

    // Bring the event source up on the same port; the client finds it.
    let listener = TcpListener::bind(addr).await.unwrap();
    let (stream, _) = tokio::time::timeout(Duration::from_secs(5), listener.accept())
        .await
        .expect("client never retried")
        .unwrap();
    let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

    let Some(Ok(Message::Text(text))) = ws.next().await else {
        panic!("expected auth frame");
    };
    let auth: AuthPayload = serde_json::from_str(text.as_str()).unwrap();
    assert_eq!(auth.api_key, "integration-key");

    task.abort();
}
