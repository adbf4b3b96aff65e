//! Session connections.
//!
//! A session only ever sees a [`Transport`]: a non-blocking sink for binary
//! frames. Everything a connection produces (open, frames, close) comes back
//! to the swarm as a [`SessionEvent`] on one shared channel, in wire order per
//! connection.

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use crate::matchmaking::GameTarget;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection closed")]
    Closed,
}

/// Outbound half of one session's connection.
pub trait Transport: Send {
    /// Queue a frame. Never blocks.
    fn send(&mut self, frame: Bytes) -> Result<(), TransportError>;

    /// Close the connection. Further sends fail.
    fn close(&mut self);
}

/// Opens connections for new sessions.
pub trait Connector {
    fn connect(&mut self, session: u32, target: &GameTarget) -> Box<dyn Transport>;
}

/// Something that happened on a session's connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEvent {
    pub session: u32,
    pub kind: SessionEventKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEventKind {
    Opened,
    Frame(Bytes),
    Closed { reason: String },
}

impl SessionEvent {
    pub fn opened(session: u32) -> Self {
        Self {
            session,
            kind: SessionEventKind::Opened,
        }
    }

    pub fn frame(session: u32, frame: Bytes) -> Self {
        Self {
            session,
            kind: SessionEventKind::Frame(frame),
        }
    }

    pub fn closed(session: u32, reason: impl Into<String>) -> Self {
        Self {
            session,
            kind: SessionEventKind::Closed {
                reason: reason.into(),
            },
        }
    }
}

enum Outbound {
    Frame(Bytes),
    Close,
}

/// WebSocket connections, one tokio task each.
#[derive(Debug, Clone)]
pub struct WsConnector {
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl WsConnector {
    pub fn new(events: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self { events }
    }
}

impl Connector for WsConnector {
    fn connect(&mut self, session: u32, target: &GameTarget) -> Box<dyn Transport> {
        let (tx, rx) = mpsc::unbounded_channel();
        let url = target.play_url();
        let events = self.events.clone();
        tokio::spawn(async move {
            let reason = match handle_connection(session, &url, rx, &events).await {
                Ok(reason) => reason,
                Err(e) => {
                    warn!("Bot {} connection to {} failed: {}", session, url, e);
                    e.to_string()
                }
            };
            let _ = events.send(SessionEvent::closed(session, reason));
        });
        Box::new(WsTransport { outbound: Some(tx) })
    }
}

struct WsTransport {
    outbound: Option<mpsc::UnboundedSender<Outbound>>,
}

impl Transport for WsTransport {
    fn send(&mut self, frame: Bytes) -> Result<(), TransportError> {
        let tx = self.outbound.as_ref().ok_or(TransportError::Closed)?;
        tx.send(Outbound::Frame(frame)).map_err(|_| TransportError::Closed)
    }

    fn close(&mut self) {
        if let Some(tx) = self.outbound.take() {
            let _ = tx.send(Outbound::Close);
        }
    }
}

/// Pump one WebSocket until either side closes. Returns the close reason.
async fn handle_connection(
    session: u32,
    url: &str,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    events: &mpsc::UnboundedSender<SessionEvent>,
) -> anyhow::Result<String> {
    let (ws_stream, _) = connect_async(url).await?;
    debug!("Bot {} connected to {}", session, url);
    let _ = events.send(SessionEvent::opened(session));

    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Binary(data))) => {
                        let _ = events.send(SessionEvent::frame(session, data));
                    }
                    Some(Ok(Message::Close(frame))) => {
                        let reason = frame
                            .map(|f| f.reason.as_str().to_string())
                            .unwrap_or_default();
                        info!("Bot {} closed by server: {:?}", session, reason);
                        return Ok(reason);
                    }
                    Some(Err(e)) => return Err(e.into()),
                    None => return Ok("connection ended".to_string()),
                    _ => {}
                }
            }
            out = outbound.recv() => {
                match out {
                    Some(Outbound::Frame(frame)) => {
                        write.send(Message::Binary(frame)).await?;
                    }
                    Some(Outbound::Close) | None => {
                        let _ = write.send(Message::Close(None)).await;
                        return Ok("closed by client".to_string());
                    }
                }
            }
        }
    }
}
