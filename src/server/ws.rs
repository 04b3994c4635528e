//! `/ws/record`: one recording session per socket.
//!
//! Frames are decoded into [`ClientMessage`]s and handed to a
//! [`RecordingConnection`], which replies through an outbox drained by a
//! writer task. Classification runs off the read loop so a second
//! `classify` can be seen and rejected while the first is still running.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::error::{ClassificationError, ProtocolError};
use crate::models::{ClassificationResult, Point};
use crate::protocol::{ClientMessage, ServerMessage};
use crate::AppState;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

const OUTBOX_CAPACITY: usize = 32;
const NO_EXEMPLARS_MESSAGE: &str = "No trained symbols yet. Teach a symbol first.";
const GENERIC_FAILURE_MESSAGE: &str = "Classification failed";

pub async fn record_socket(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sink, mut stream) = socket.split();
    let (outbox, mut outgoing) = mpsc::channel::<ServerMessage>(OUTBOX_CAPACITY);

    let writer = tokio::spawn(async move {
        while let Some(message) = outgoing.recv().await {
            let text = match message.to_json() {
                Ok(text) => text,
                Err(err) => {
                    log_error!("failed to encode {message:?}: {err}");
                    continue;
                }
            };
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    log_info!("Recording socket opened");
    let connection = RecordingConnection::new(state, outbox);

    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => connection.handle_text(&text).await,
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(err) => {
                log_warn!("recording socket read failed: {err}");
                break;
            }
        }
    }

    drop(connection);
    if let Err(err) = writer.await {
        log_error!("recording socket writer panicked: {err}");
    }
    log_info!("Recording socket closed");
}

/// Server-side mirror of what the client is doing. The client announces
/// session start and end with `toggle`; classification is tracked here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Idle,
    Recording,
    Classifying,
}

/// Per-socket session state. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct RecordingConnection {
    state: AppState,
    outbox: mpsc::Sender<ServerMessage>,
    active: Arc<AtomicBool>,
    in_flight: Arc<AtomicBool>,
}

impl RecordingConnection {
    pub fn new(state: AppState, outbox: mpsc::Sender<ServerMessage>) -> Self {
        Self {
            state,
            outbox,
            active: Arc::new(AtomicBool::new(false)),
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        if self.in_flight.load(Ordering::Acquire) {
            ConnectionStatus::Classifying
        } else if self.active.load(Ordering::Acquire) {
            ConnectionStatus::Recording
        } else {
            ConnectionStatus::Idle
        }
    }

    /// Malformed frames get an `error` reply; the socket stays open.
    pub async fn handle_text(&self, text: &str) {
        match ClientMessage::parse(text) {
            Ok(message) => self.dispatch(message).await,
            Err(err) => {
                log_warn!("rejecting frame: {err}");
                self.reply(ServerMessage::error(err.to_string())).await;
            }
        }
    }

    pub async fn dispatch(&self, message: ClientMessage) {
        match message {
            ClientMessage::Toggle => self.toggle().await,
            ClientMessage::SetCursor { x, y } => self.set_cursor(x, y).await,
            ClientMessage::Classify { points } => self.classify(points).await,
        }
    }

    async fn toggle(&self) {
        let was_active = self.active.fetch_xor(true, Ordering::AcqRel);
        log_debug!("client session {}", if was_active { "ended" } else { "started" });
        let reply = if was_active {
            ServerMessage::Idle {
                message: "Recording stopped".to_string(),
            }
        } else {
            ServerMessage::Recording {
                message: "Recording started".to_string(),
            }
        };
        self.reply(reply).await;
    }

    /// Always acknowledged: the client waits on `cursor_reset` before it
    /// captures again, so a failed move is only logged.
    async fn set_cursor(&self, x: f64, y: f64) {
        let pointer = Arc::clone(&self.state.pointer);
        match tokio::task::spawn_blocking(move || pointer.move_to(x, y)).await {
            Ok(Ok(())) => log_debug!("pointer moved to ({x}, {y})"),
            Ok(Err(err)) => log_warn!("failed to move pointer to ({x}, {y}): {err:#}"),
            Err(err) => log_error!("pointer worker panicked: {err}"),
        }
        self.reply(ServerMessage::CursorReset).await;
    }

    async fn classify(&self, points: Vec<Point>) {
        if self.in_flight.swap(true, Ordering::AcqRel) {
            log_warn!("classify received while another is in flight");
            self.reply(ServerMessage::error(
                ProtocolError::ClassificationInFlight.to_string(),
            ))
            .await;
            return;
        }

        self.reply(ServerMessage::Classifying).await;

        let connection = self.clone();
        tokio::spawn(async move {
            let point_count = points.len();
            let classifier = Arc::clone(&connection.state.classifier);
            let outcome =
                tokio::task::spawn_blocking(move || classifier.classify_points(&points)).await;

            let reply = match outcome {
                Ok(Ok(candidates)) => {
                    let result = ClassificationResult::finished(candidates);
                    log_info!(
                        "Classified {point_count} points as {:?} ({:?})",
                        result.symbol,
                        result.confidence
                    );
                    ServerMessage::from(result)
                }
                Ok(Err(ClassificationError::EmptyInput)) => ServerMessage::Idle {
                    message: "No points recorded".to_string(),
                },
                Ok(Err(ClassificationError::NoExemplars)) => {
                    ServerMessage::error(NO_EXEMPLARS_MESSAGE)
                }
                Ok(Err(err)) => {
                    log_error!("classification failed: {err}");
                    ServerMessage::error(GENERIC_FAILURE_MESSAGE)
                }
                Err(err) => {
                    log_error!("classification worker panicked: {err}");
                    ServerMessage::error(GENERIC_FAILURE_MESSAGE)
                }
            };

            connection.in_flight.store(false, Ordering::Release);
            connection.reply(reply).await;
        });
    }

    async fn reply(&self, message: ServerMessage) {
        if self.outbox.send(message).await.is_err() {
            log_debug!("recording socket gone; dropping reply");
        }
    }
}
