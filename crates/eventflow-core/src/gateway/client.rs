//! WebSocket client for the push gateway.
//!
//! One task owns the connection for the life of the process: it redials on
//! a bounded backoff, performs the subscribe handshake, answers pings and
//! fans decoded events out on a broadcast channel. Consumers hold a
//! [`GatewayHandle`]; readiness is an awaitable signal that resolves once
//! the handshake completes, so nothing ever polls for a connection.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::error::{CoreError, Result};

use super::protocol::{decode_event, encode_frame, ClientFrame, GatewayEvent};

const INITIAL_BACKOFF: Duration = Duration::from_millis(500);
const MAX_BACKOFF: Duration = Duration::from_secs(30);
const PING_INTERVAL: Duration = Duration::from_secs(30);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Cheap cloneable handle onto the gateway connection task.
#[derive(Debug, Clone)]
pub struct GatewayHandle {
    events_tx: broadcast::Sender<GatewayEvent>,
    outbound_tx: mpsc::UnboundedSender<ClientFrame>,
    ready_rx: watch::Receiver<bool>,
}

impl GatewayHandle {
    /// Subscribe to decoded gateway events. Each receiver sees every event
    /// fanned out after it subscribed, across reconnects.
    pub fn subscribe(&self) -> broadcast::Receiver<GatewayEvent> {
        self.events_tx.subscribe()
    }

    /// Queue a frame for the live connection. Frames are best-effort: when
    /// the transport is down they are dropped, not buffered for later.
    pub fn send(&self, frame: ClientFrame) -> Result<()> {
        if !self.is_ready() {
            return Err(CoreError::TransportUnavailable);
        }
        self.outbound_tx
            .send(frame)
            .map_err(|_| CoreError::TransportUnavailable)
    }

    pub fn is_ready(&self) -> bool {
        *self.ready_rx.borrow()
    }

    /// Resolve once the gateway has completed its subscribe handshake.
    /// Resolves immediately when already connected; also resolves if the
    /// connection task has shut down, so callers cannot hang forever.
    pub async fn ready(&self) {
        let mut rx = self.ready_rx.clone();
        let _ = rx.wait_for(|connected| *connected).await;
    }
}

/// The connection task itself. Construct with [`GatewayClient::new`], then
/// hand `run()` to the runtime.
pub struct GatewayClient {
    url: String,
    user_id: String,
    events_tx: broadcast::Sender<GatewayEvent>,
    outbound_rx: mpsc::UnboundedReceiver<ClientFrame>,
    ready_tx: watch::Sender<bool>,
}

impl GatewayClient {
    pub fn new(url: impl Into<String>, user_id: impl Into<String>) -> (Self, GatewayHandle) {
        let (events_tx, _) = broadcast::channel(256);
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (ready_tx, ready_rx) = watch::channel(false);
        let client = Self {
            url: url.into(),
            user_id: user_id.into(),
            events_tx: events_tx.clone(),
            outbound_rx,
            ready_tx,
        };
        let handle = GatewayHandle {
            events_tx,
            outbound_tx,
            ready_rx,
        };
        (client, handle)
    }

    /// Connect-and-redial loop. Runs until the task is dropped.
    pub async fn run(mut self) {
        let mut backoff = INITIAL_BACKOFF;
        loop {
            match connect_async(self.url.as_str()).await {
                Ok((stream, _)) => {
                    info!(url = %self.url, "gateway connected");
                    backoff = INITIAL_BACKOFF;
                    match self.session(stream).await {
                        Ok(()) => info!("gateway session closed"),
                        Err(err) => warn!(error = %err, "gateway session ended"),
                    }
                    self.ready_tx.send_replace(false);
                }
                Err(err) => {
                    debug!(error = %err, "gateway connect failed");
                }
            }
            tokio::time::sleep(backoff).await;
            backoff = (backoff * 2).min(MAX_BACKOFF);
        }
    }

    /// Drive one connection from handshake to close.
    async fn session(&mut self, stream: WsStream) -> Result<()> {
        let (mut write, mut read) = stream.split();

        // Frames queued while disconnected are stale; drop them before the
        // handshake rather than replaying them into the new session.
        while self.outbound_rx.try_recv().is_ok() {}

        let subscribe = ClientFrame::Subscribe {
            user_id: self.user_id.clone(),
        };
        write.send(WsMessage::Text(encode_frame(&subscribe)?)).await?;

        let mut ping = tokio::time::interval_at(
            tokio::time::Instant::now() + PING_INTERVAL,
            PING_INTERVAL,
        );

        loop {
            tokio::select! {
                frame = self.outbound_rx.recv() => {
                    let Some(frame) = frame else { return Ok(()) };
                    write.send(WsMessage::Text(encode_frame(&frame)?)).await?;
                }
                _ = ping.tick() => {
                    write.send(WsMessage::Text(encode_frame(&ClientFrame::Ping)?)).await?;
                }
                message = read.next() => {
                    match message {
                        Some(Ok(WsMessage::Text(text))) => self.handle_text(&text),
                        Some(Ok(WsMessage::Ping(payload))) => {
                            write.send(WsMessage::Pong(payload)).await?;
                        }
                        Some(Ok(WsMessage::Close(_))) | None => return Ok(()),
                        Some(Ok(_)) => {}
                        Some(Err(err)) => return Err(err.into()),
                    }
                }
            }
        }
    }

    /// Decode one inbound frame and fan it out. Malformed frames are
    /// dropped here; they never reach subscribers.
    fn handle_text(&self, text: &str) {
        match decode_event(text) {
            Ok(event) => {
                debug!(kind = event.kind(), "gateway event");
                if matches!(event, GatewayEvent::Ready) {
                    self.ready_tx.send_replace(true);
                }
                let _ = self.events_tx.send(event);
            }
            Err(err) => {
                warn!(error = %err, "dropping malformed gateway frame");
            }
        }
    }
}
