//! Cooperative loop that feeds UI input, server messages and timer expiry
//! into the session state machine and carries out its effects.

use std::future::pending;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{sleep_until, timeout, Instant};
use tokio_util::sync::CancellationToken;

use crate::config::ClientConfig;
use crate::models::ClassificationResult;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::settings::Settings;

use super::api::SettingsSource;
use super::connection::ConnectionEvent;
use super::session::{transition, Effect, SessionContext, SessionEvent, SessionState, SessionStatus};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

const CHANNEL_CAPACITY: usize = 64;

/// What the UI pushes into the driver. Pointer positions are absolute
/// screen coordinates; the driver stamps them on arrival.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    Toggle,
    PointerMoved { x: f64, y: f64 },
    Click,
    Dismiss,
}

/// What the driver publishes back to the UI.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionUpdate {
    Status(SessionStatus),
    Result(ClassificationResult),
    Error(String),
}

pub struct SessionDriver {
    config: ClientConfig,
    settings_source: Arc<dyn SettingsSource>,
    outgoing: mpsc::Sender<ClientMessage>,
    connection: mpsc::Receiver<ConnectionEvent>,
    inputs: mpsc::Receiver<InputEvent>,
    updates: mpsc::Sender<SessionUpdate>,
    epoch: Instant,
    state: SessionState,
    ctx: SessionContext,
    pause_threshold: Duration,
    pause_deadline: Option<Instant>,
    ack_deadline: Option<Instant>,
    /// Whether the server was told about the current session via `toggle`.
    announced: bool,
}

impl SessionDriver {
    /// Returns the driver plus the UI's ends of its input and update channels.
    pub fn new(
        config: ClientConfig,
        settings_source: Arc<dyn SettingsSource>,
        outgoing: mpsc::Sender<ClientMessage>,
        connection: mpsc::Receiver<ConnectionEvent>,
    ) -> (Self, mpsc::Sender<InputEvent>, mpsc::Receiver<SessionUpdate>) {
        let (inputs_tx, inputs_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (updates_tx, updates_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let settings = Settings::default();

        let driver = Self {
            ctx: SessionContext::new(&config, &settings),
            pause_threshold: settings.pause_duration(),
            config,
            settings_source,
            outgoing,
            connection,
            inputs: inputs_rx,
            updates: updates_tx,
            epoch: Instant::now(),
            state: SessionState::Idle,
            pause_deadline: None,
            ack_deadline: None,
            announced: false,
        };

        (driver, inputs_tx, updates_rx)
    }

    /// Run until cancelled or until the UI or connection side hangs up.
    /// Returns the final session state.
    pub async fn run(mut self, cancel_token: CancellationToken) -> SessionState {
        while !cancel_token.is_cancelled() {
            let pause_deadline = self.pause_deadline;
            let ack_deadline = self.ack_deadline;

            tokio::select! {
                _ = cancel_token.cancelled() => break,
                input = self.inputs.recv() => match input {
                    Some(input) => self.on_input(input, &cancel_token).await,
                    None => break,
                },
                event = self.connection.recv() => match event {
                    Some(event) => self.on_connection(event).await,
                    None => break,
                },
                _ = wait_for(pause_deadline) => {
                    self.pause_deadline = None;
                    self.apply(SessionEvent::PauseElapsed).await;
                }
                _ = wait_for(ack_deadline) => {
                    self.ack_deadline = None;
                    log_warn!("cursor reset not acknowledged within {:?}", self.config.ack_timeout);
                    self.apply(SessionEvent::AckTimeout).await;
                }
            }
        }

        log_info!("session driver stopped in {:?}", self.state.status());
        self.state
    }

    async fn on_input(&mut self, input: InputEvent, cancel_token: &CancellationToken) {
        let event = match input {
            InputEvent::Toggle => {
                if self.state.is_resting() && !self.refresh_settings(cancel_token).await {
                    return;
                }
                SessionEvent::Toggle
            }
            InputEvent::PointerMoved { x, y } => SessionEvent::PointerMoved {
                x,
                y,
                at_ms: self.now_ms(),
            },
            InputEvent::Click => SessionEvent::Click,
            InputEvent::Dismiss => SessionEvent::Dismiss,
        };
        self.apply(event).await;
    }

    async fn on_connection(&mut self, event: ConnectionEvent) {
        let event = match event {
            ConnectionEvent::Connected => {
                log_debug!("connection up");
                return;
            }
            ConnectionEvent::Disconnected(reason) => {
                log_warn!("connection lost: {reason}");
                // the next socket starts with a fresh server-side session
                self.announced = false;
                SessionEvent::Disconnected
            }
            ConnectionEvent::Message(message) => match message {
                ServerMessage::CursorReset => SessionEvent::CursorReset {
                    at_ms: self.now_ms(),
                },
                ServerMessage::Error { message } => SessionEvent::ServerError { message },
                ServerMessage::Idle { message } => SessionEvent::ServerIdle { message },
                finished @ ServerMessage::Finished { .. } => match finished.into_result() {
                    Some(result) => SessionEvent::ServerFinished(result),
                    None => return,
                },
                ServerMessage::Recording { .. } | ServerMessage::Classifying => return,
            },
        };
        self.apply(event).await;
    }

    /// Settings are read once per session start. A slow or failing fetch
    /// falls back to the previous settings after `request_timeout`.
    /// Returns false if cancelled while waiting.
    async fn refresh_settings(&mut self, cancel_token: &CancellationToken) -> bool {
        let fetch = timeout(
            self.config.request_timeout,
            self.settings_source.fetch_settings(),
        );

        let outcome = tokio::select! {
            _ = cancel_token.cancelled() => return false,
            outcome = fetch => outcome,
        };

        match outcome {
            Ok(Ok(settings)) => {
                self.ctx = SessionContext::new(&self.config, &settings);
                self.pause_threshold = settings.pause_duration();
            }
            Ok(Err(err)) => log_warn!("using previous settings, fetch failed: {err}"),
            Err(_) => log_warn!(
                "using previous settings, fetch took longer than {:?}",
                self.config.request_timeout
            ),
        }
        true
    }

    async fn apply(&mut self, event: SessionEvent) {
        let mut next_event = Some(event);

        while let Some(event) = next_event.take() {
            let before = self.state.status();
            let was_resting = self.state.is_resting();
            let state = std::mem::replace(&mut self.state, SessionState::Idle);
            let (next, effects) = transition(state, &self.ctx, event);
            self.state = next;

            if was_resting && !self.state.is_resting() {
                self.send(ClientMessage::Toggle).await;
                self.announced = true;
            }

            for effect in effects {
                self.execute(effect).await;
            }

            if !was_resting && self.state.is_resting() && self.announced {
                self.send(ClientMessage::Toggle).await;
                self.announced = false;
            }

            let after = self.state.status();
            if after != before {
                log_debug!("session {before:?} -> {after:?}");
                self.publish(SessionUpdate::Status(after)).await;
            }

            // an error is surfaced once, then the session settles
            if matches!(self.state, SessionState::Error { .. }) {
                next_event = Some(SessionEvent::Dismiss);
            }
        }
    }

    async fn execute(&mut self, effect: Effect) {
        match effect {
            Effect::RequestRecenter { x, y } => {
                self.send(ClientMessage::SetCursor { x, y }).await;
            }
            Effect::ArmAckTimer => {
                self.ack_deadline = Some(Instant::now() + self.config.ack_timeout);
            }
            Effect::CancelAckTimer => self.ack_deadline = None,
            Effect::RestartPauseTimer => {
                self.pause_deadline = Some(Instant::now() + self.pause_threshold);
            }
            Effect::CancelPauseTimer => self.pause_deadline = None,
            Effect::SendClassify { points } => {
                log_info!("dispatching {} points for classification", points.len());
                self.send(ClientMessage::Classify { points }).await;
            }
            Effect::Deliver(result) => self.publish(SessionUpdate::Result(result)).await,
            Effect::SurfaceError(message) => self.publish(SessionUpdate::Error(message)).await,
        }
    }

    /// A failed send surfaces later as a disconnect or an ack timeout.
    async fn send(&self, message: ClientMessage) {
        if self.outgoing.send(message).await.is_err() {
            log_warn!("connection task is gone; message not sent");
        }
    }

    async fn publish(&self, update: SessionUpdate) {
        if self.updates.send(update).await.is_err() {
            log_debug!("no listener for session updates");
        }
    }

    fn now_ms(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64() * 1000.0
    }
}

async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => pending::<()>().await,
    }
}
