//! HTTP and WebSocket routes for the donation hub.
//!
//! - `GET /streamlabs` - WebSocket endpoint for overlays
//! - `POST /donations` - Record a donation and broadcast progress
//! - `GET /goal` - Current ledger snapshot
//! - `PUT /goal` - Replace the goal and broadcast progress
//! - `GET /health` - Health check
//!
//! # WebSocket protocol
//!
//! The first text frame from the subscriber must be an auth payload
//! (`{author, website, api_key, events}`). A bad payload or key closes the
//! socket with a policy-violation close frame. After auth the hub sends the
//! current goal progress (quiet), then forwards every broadcast envelope whose
//! event name the subscriber listed.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{close_code, CloseFrame, Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

use crate::auth::{authenticate, AuthError, Subscription};
use crate::broadcast::EventBroadcaster;
use crate::config::Config;
use crate::error::{HubError, Result};
use crate::ledger::{Ledger, LedgerSnapshot};
use crate::types::{Envelope, EVENT_DONATION};

/// How long a new socket has to send its auth payload.
pub const AUTH_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// Application State
// ============================================================================

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub broadcaster: EventBroadcaster,
    pub ledger: Arc<RwLock<Ledger>>,
    pub start_time: Instant,
}

impl AppState {
    /// Builds state with a ledger seeded from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Ledger`] if the configured goal or initial value
    /// is invalid.
    pub fn new(config: Config) -> Result<Self> {
        let ledger = Ledger::new(config.goal, config.initial_value)?;
        Ok(Self::with_components(config, EventBroadcaster::new(), ledger))
    }

    #[must_use]
    pub fn with_components(config: Config, broadcaster: EventBroadcaster, ledger: Ledger) -> Self {
        Self {
            config: Arc::new(config),
            broadcaster,
            ledger: Arc::new(RwLock::new(ledger)),
            start_time: Instant::now(),
        }
    }

    /// Broadcasts the snapshot as an `EVENT_DONATION` envelope.
    fn broadcast_progress(&self, snapshot: &LedgerSnapshot, quiet: bool) -> Result<usize> {
        let envelope = Envelope::donation(&snapshot.to_payload(quiet))?;
        Ok(self.broadcaster.broadcast(envelope))
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &"<Config>")
            .field("broadcaster", &self.broadcaster)
            .field("start_time", &self.start_time)
            .finish()
    }
}

// ============================================================================
// Router
// ============================================================================

/// Creates the router with all routes and request tracing.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/streamlabs", get(get_ws))
        .route("/donations", post(post_donation))
        .route("/goal", get(get_goal).put(put_goal))
        .route("/health", get(get_health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============================================================================
// POST /donations
// ============================================================================

/// Request body for `POST /donations`.
#[derive(Debug, Serialize, Deserialize)]
pub struct DonationRequest {
    pub amount: f64,

    /// Suppress the overlay's sound cue.
    #[serde(default)]
    pub quiet: bool,
}

/// Records a donation and broadcasts the new progress.
///
/// - `200 OK` with the ledger snapshot
/// - `400 Bad Request` for negative amounts
async fn post_donation(
    State(state): State<AppState>,
    Json(request): Json<DonationRequest>,
) -> Result<Json<LedgerSnapshot>> {
    // Broadcast under the write guard so envelopes leave in ledger order.
    let mut ledger = state.ledger.write().await;
    let snapshot = ledger.record(request.amount)?;
    let receivers = state.broadcast_progress(&snapshot, request.quiet)?;
    drop(ledger);

    info!(
        amount = request.amount,
        value = snapshot.value,
        goal = snapshot.goal,
        progress = snapshot.progress,
        quiet = request.quiet,
        receivers,
        "Donation recorded"
    );

    Ok(Json(snapshot))
}

// ============================================================================
// GET/PUT /goal
// ============================================================================

/// Request body for `PUT /goal`.
#[derive(Debug, Serialize, Deserialize)]
pub struct GoalRequest {
    pub goal: f64,
}

async fn get_goal(State(state): State<AppState>) -> Json<LedgerSnapshot> {
    Json(state.ledger.read().await.snapshot())
}

/// Replaces the goal. The update is broadcast quiet.
async fn put_goal(
    State(state): State<AppState>,
    Json(request): Json<GoalRequest>,
) -> Result<Json<LedgerSnapshot>> {
    let mut ledger = state.ledger.write().await;
    let snapshot = ledger.set_goal(request.goal)?;
    let receivers = state.broadcast_progress(&snapshot, true)?;
    drop(ledger);

    info!(goal = snapshot.goal, progress = snapshot.progress, receivers, "Goal updated");

    Ok(Json(snapshot))
}

// ============================================================================
// GET /streamlabs
// ============================================================================

async fn get_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_websocket(socket, state))
}

/// Waits for the first text frame, skipping control frames.
async fn read_auth_frame(socket: &mut WebSocket) -> Option<String> {
    while let Some(msg) = socket.recv().await {
        match msg {
            Ok(Message::Text(text)) => return Some(text.as_str().to_string()),
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
            Ok(Message::Binary(_)) => return Some(String::new()),
            Ok(Message::Close(_)) | Err(_) => return None,
        }
    }
    None
}

async fn reject(mut socket: WebSocket, conn_id: Uuid, err: AuthError) {
    warn!(%conn_id, error = %err, "Subscriber rejected");
    let frame = CloseFrame {
        code: close_code::POLICY,
        reason: err.to_string().into(),
    };
    let _ = socket.send(Message::Close(Some(frame))).await;
}

async fn handle_websocket(mut socket: WebSocket, state: AppState) {
    use futures_util::{SinkExt, StreamExt};

    let conn_id = Uuid::new_v4();
    debug!(%conn_id, "WebSocket client connected, awaiting auth");

    let frame = match tokio::time::timeout(AUTH_TIMEOUT, read_auth_frame(&mut socket)).await {
        Ok(Some(frame)) => frame,
        Ok(None) => {
            debug!(%conn_id, "WebSocket client left before auth");
            return;
        }
        Err(_) => return reject(socket, conn_id, AuthError::Timeout).await,
    };

    let subscription = match authenticate(&frame, state.config.expected_api_key()) {
        Ok(subscription) => subscription,
        Err(err) => return reject(socket, conn_id, err).await,
    };

    // Subscribing under the read guard pins the snapshot to the subscription
    // point: every envelope received afterwards is newer.
    let (mut event_rx, snapshot) = {
        let ledger = state.ledger.read().await;
        (state.broadcaster.subscribe(), ledger.snapshot())
    };
    info!(%conn_id, events = subscription.len(), "Subscriber authenticated");

    if subscription.wants(EVENT_DONATION) {
        match welcome_frame(&snapshot) {
            Ok(json) => {
                if socket.send(Message::Text(json.into())).await.is_err() {
                    return;
                }
            }
            Err(err) => error!(%conn_id, error = %err, "Failed to encode progress"),
        }
    }

    let (mut sender, mut receiver) = socket.split();

    let forward_task = tokio::spawn(async move {
        loop {
            match event_rx.recv().await {
                Ok(envelope) => {
                    if !forwards(&subscription, &envelope) {
                        trace!(%conn_id, event = %envelope.event, "Event not subscribed");
                        continue;
                    }

                    match serde_json::to_string(&envelope) {
                        Ok(json) => {
                            if let Err(err) = sender.send(Message::Text(json.into())).await {
                                debug!(%conn_id, error = %err, "Failed to send to subscriber");
                                break;
                            }
                        }
                        Err(err) => error!(error = %err, "Failed to serialize envelope"),
                    }
                }
                Err(RecvError::Lagged(count)) => {
                    warn!(%conn_id, skipped = count, "Subscriber lagged, skipped envelopes");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(err) => {
                debug!(%conn_id, error = %err, "WebSocket error");
                break;
            }
        }
    }

    forward_task.abort();
    info!(%conn_id, "Subscriber disconnected");
}

fn forwards(subscription: &Subscription, envelope: &Envelope) -> bool {
    subscription.wants(&envelope.event)
}

fn welcome_frame(snapshot: &LedgerSnapshot) -> Result<String> {
    let envelope = Envelope::donation(&snapshot.to_payload(true))?;
    serde_json::to_string(&envelope).map_err(HubError::from)
}

// ============================================================================
// GET /health
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,

    /// Authenticated subscribers.
    pub connections: usize,

    pub uptime_seconds: u64,
}

async fn get_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        connections: state.broadcaster.subscriber_count(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}

// ============================================================================
// Tests
// ============================================================================
