//! Socket transport for the overlay client.
//!
//! A [`Transport`] opens a connection and hands back a [`Connection`]: an
//! outbound text sender plus a stream of [`SocketEvent`]s. Opening never
//! blocks; success or failure arrives as events, the same way a browser
//! socket reports `open`, `message`, `error` and `close`.
//!
//! [`WsTransport`] is the production implementation on top of
//! `tokio-tungstenite`. Each connection runs in its own task that performs the
//! handshake, forwards outbound frames, and reports inbound text frames. When
//! the owner drops the [`Connection`], the task closes the socket and exits.

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, trace, warn};

/// Events reported by an open connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    /// The handshake completed; the connection can send.
    Open,

    /// A text frame arrived.
    Message(String),

    /// The connection failed. Always followed by [`SocketEvent::Close`].
    Error(String),

    /// The connection is gone, for whatever reason.
    Close,
}

/// Handle to one connection.
///
/// Dropping it tears the connection down.
#[derive(Debug)]
pub struct Connection {
    outbound: mpsc::UnboundedSender<String>,
    events: mpsc::UnboundedReceiver<SocketEvent>,
}

impl Connection {
    /// Builds a connection from its two channel halves.
    #[must_use]
    pub fn new(
        outbound: mpsc::UnboundedSender<String>,
        events: mpsc::UnboundedReceiver<SocketEvent>,
    ) -> Self {
        Self { outbound, events }
    }

    /// Queues a text frame for sending.
    ///
    /// Returns `false` if the connection task has already gone away.
    pub fn send(&self, text: String) -> bool {
        self.outbound.send(text).is_ok()
    }

    /// Waits for the next event. A vanished connection task reads as
    /// [`SocketEvent::Close`].
    pub async fn next_event(&mut self) -> SocketEvent {
        self.events.recv().await.unwrap_or(SocketEvent::Close)
    }
}

/// Opens connections.
pub trait Transport {
    /// Starts connecting to `url` and returns the handle immediately.
    fn open(&self, url: &str) -> Connection;
}

/// WebSocket transport backed by `tokio-tungstenite`.
///
/// Must be used from within a tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsTransport;

impl WsTransport {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Transport for WsTransport {
    fn open(&self, url: &str) -> Connection {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        tokio::spawn(run_socket(url.to_string(), outbound_rx, event_tx));

        Connection::new(outbound_tx, event_rx)
    }
}

/// Drives one WebSocket connection until either side goes away.
async fn run_socket(
    url: String,
    mut outbound: mpsc::UnboundedReceiver<String>,
    events: mpsc::UnboundedSender<SocketEvent>,
) {
    debug!(url = %url, "Connecting");

    let ws_stream = match connect_async(url.as_str()).await {
        Ok((stream, response)) => {
            info!(url = %url, status = %response.status(), "Connected");
            stream
        }
        Err(err) => {
            let _ = events.send(SocketEvent::Error(err.to_string()));
            let _ = events.send(SocketEvent::Close);
            return;
        }
    };

    if events.send(SocketEvent::Open).is_err() {
        return;
    }

    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            outgoing = outbound.recv() => {
                match outgoing {
                    Some(text) => {
                        trace!(bytes = text.len(), "Sending frame");
                        if let Err(err) = write.send(Message::Text(text.into())).await {
                            let _ = events.send(SocketEvent::Error(err.to_string()));
                            break;
                        }
                    }
                    None => {
                        // Owner dropped the connection handle.
                        debug!(url = %url, "Connection handle dropped, closing socket");
                        let _ = write.send(Message::Close(None)).await;
                        return;
                    }
                }
            }

            incoming = read.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        if events.send(SocketEvent::Message(text.as_str().to_string())).is_err() {
                            return;
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        debug!(frame = ?frame, "Server closed connection");
                        break;
                    }
                    Some(Ok(Message::Binary(data))) => {
                        trace!(bytes = data.len(), "Ignoring binary frame");
                    }
                    Some(Ok(_)) => {
                        // Ping/pong handled by tungstenite
                    }
                    Some(Err(err)) => {
                        warn!(error = %err, "Socket read error");
                        let _ = events.send(SocketEvent::Error(err.to_string()));
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    let _ = events.send(SocketEvent::Close);
}
