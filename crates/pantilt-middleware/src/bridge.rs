//! WebSocket joint-state bridge.
//!
//! [`JointBridge`] is the node's external pub/sub surface:
//!
//! 1. **Ingests** rosbridge-style publish frames carrying joint states for
//!    the configured input topic and translates them into [`Event`] values on
//!    the internal [`EventBus`].
//!
//! 2. **Serves** a lightweight WebSocket endpoint where external clients can
//!    both push joint-state frames and subscribe to the live event stream
//!    (joint samples and computed transforms) as JSON, one object per event.
//!
//! The bridge is intentionally agnostic about the *meaning* of the data it
//! routes; it only handles serialisation and transport.

use std::net::SocketAddr;
use std::sync::Arc;

use chrono::Utc;
use futures_util::{Sink, SinkExt, StreamExt};
use pantilt_types::{Event, EventPayload, JointStateSample, PanTiltError};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{error, warn};
use uuid::Uuid;

use crate::bus::{EventBus, Topic};

/// Bridge between external joint-state publishers and the internal
/// [`EventBus`] / WebSocket clients.
#[derive(Clone)]
pub struct JointBridge {
    bus: Arc<EventBus>,
    joint_topic: String,
}

impl JointBridge {
    /// Create a new bridge backed by `bus`, accepting joint-state frames for
    /// `joint_topic`.
    pub fn new(bus: Arc<EventBus>, joint_topic: impl Into<String>) -> Self {
        Self {
            bus,
            joint_topic: joint_topic.into(),
        }
    }

    /// The input topic this bridge accepts joint states for.
    pub fn joint_topic(&self) -> &str {
        &self.joint_topic
    }

    // -----------------------------------------------------------------------
    // Ingest
    // -----------------------------------------------------------------------

    /// Validate a joint-state sample and publish it on the
    /// [`Topic::JointStates`] lane.
    ///
    /// Returns the number of bus receivers that were handed the event.
    pub fn ingest_joint_state(&self, sample: JointStateSample) -> Result<usize, PanTiltError> {
        sample.validate()?;
        let event = Event {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            source: format!("pantilt-middleware::bridge{}", self.joint_topic),
            payload: EventPayload::JointState(sample),
        };
        Ok(self.bus.publish_to(Topic::JointStates, event))
    }

    // -----------------------------------------------------------------------
    // WebSocket server
    // -----------------------------------------------------------------------

    /// Start a WebSocket server on `addr`.
    ///
    /// Every connecting client receives the live event stream as JSON objects
    /// and may push rosbridge-style publish frames for the joint topic.  The
    /// server runs until it encounters a fatal bind error.
    ///
    /// # Errors
    ///
    /// Returns [`PanTiltError::Channel`] if the TCP listener cannot be bound.
    pub async fn run_ws_server(self, addr: SocketAddr) -> Result<(), PanTiltError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| PanTiltError::Channel(format!("ws bind error on {addr}: {e}")))?;

        loop {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    let bridge = self.clone();
                    tokio::spawn(async move {
                        if let Err(e) = bridge.handle_ws_client(stream, peer).await {
                            error!(peer = %peer, error = %e, "ws client error");
                        }
                    });
                }
                Err(e) => {
                    error!(error = %e, "ws accept error");
                }
            }
        }
    }

    async fn handle_ws_client(
        &self,
        stream: TcpStream,
        peer: SocketAddr,
    ) -> Result<(), PanTiltError> {
        let ws_stream = accept_async(stream)
            .await
            .map_err(|e| PanTiltError::Channel(format!("ws handshake from {peer}: {e}")))?;

        let (mut ws_tx, mut ws_rx) = ws_stream.split();
        let mut joints = self.bus.subscribe_to(Topic::JointStates);
        let mut transforms = self.bus.subscribe_to(Topic::Transforms);

        loop {
            tokio::select! {
                // Forward bus events to the WebSocket client.
                result = joints.recv() => {
                    if !forward_event(&mut ws_tx, result, peer).await? {
                        break;
                    }
                }
                result = transforms.recv() => {
                    if !forward_event(&mut ws_tx, result, peer).await? {
                        break;
                    }
                }
                // Handle incoming WebSocket frames.
                msg = ws_rx.next() => {
                    match msg {
                        Some(Ok(Message::Close(_))) | None => break,
                        Some(Err(_)) => break,
                        Some(Ok(Message::Text(text))) => {
                            self.handle_incoming_ws_message(text.as_str());
                        }
                        _ => {}
                    }
                }
            }
        }

        Ok(())
    }

    /// Parse an incoming WebSocket text message.
    ///
    /// The only recognised message kind is a rosbridge-style publish frame on
    /// the configured joint topic:
    ///
    /// ```json
    /// {"op":"publish","topic":"/pantilt/joint_states",
    ///  "msg":{"name":["pan","tilt"],"position":[0.1,-0.2]}}
    /// ```
    ///
    /// Frames for any other topic or op are silently ignored; joint states
    /// that fail validation are logged and dropped.
    fn handle_incoming_ws_message(&self, text: &str) {
        let Ok(json) = serde_json::from_str::<serde_json::Value>(text) else {
            return;
        };

        let op = json.get("op").and_then(|o| o.as_str()).unwrap_or("");
        let topic = json.get("topic").and_then(|t| t.as_str()).unwrap_or("");
        if op != "publish" || topic != self.joint_topic {
            return;
        }
        let Some(msg) = json.get("msg") else {
            return;
        };

        match serde_json::from_value::<JointStateSample>(msg.clone()) {
            Ok(sample) => {
                if let Err(e) = self.ingest_joint_state(sample) {
                    warn!(topic = %topic, error = %e, "dropping malformed joint sample");
                }
            }
            Err(e) => {
                warn!(topic = %topic, error = %e, "unparseable joint-state frame");
            }
        }
    }
}

/// Serialize one bus event onto the WebSocket.
///
/// Returns `Ok(false)` when the stream should be torn down (client gone or
/// bus closed) and `Ok(true)` otherwise; a lagged receiver is logged and the
/// stream continues.
async fn forward_event<S>(
    ws_tx: &mut S,
    result: Result<Event, broadcast::error::RecvError>,
    peer: SocketAddr,
) -> Result<bool, PanTiltError>
where
    S: Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
{
    match result {
        Ok(event) => {
            let json = serde_json::to_string(&event)
                .map_err(|e| PanTiltError::Parsing(e.to_string()))?;
            Ok(ws_tx.send(Message::Text(json.into())).await.is_ok())
        }
        Err(broadcast::error::RecvError::Lagged(n)) => {
            warn!(peer = %peer, lagged_by = n, "ws client lagged");
            Ok(true)
        }
        Err(broadcast::error::RecvError::Closed) => Ok(false),
    }
}
