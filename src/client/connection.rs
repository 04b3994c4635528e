//! Owned websocket connection to the recognition server.
//!
//! A background task keeps the socket open, reconnecting with exponential
//! backoff, and talks to the rest of the client only through channels.

use std::time::Duration;

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use rand::Rng;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;

use crate::config::ClientConfig;
use crate::error::TransportError;
use crate::protocol::{ClientMessage, ServerMessage};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

pub const RECORD_PATH: &str = "/ws/record";
const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    Connected,
    Message(ServerMessage),
    Disconnected(TransportError),
}

/// Exponential backoff with random jitter in `[delay/2, delay)`.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            current: initial,
        }
    }

    pub fn reset(&mut self) {
        self.current = self.initial;
    }

    pub fn next_delay(&mut self) -> Duration {
        let base = self.current;
        self.current = (self.current * 2).min(self.max);
        base.mul_f64(rand::thread_rng().gen_range(0.5..1.0))
    }
}

pub struct Connection {
    outgoing: mpsc::Sender<ClientMessage>,
    cancel_token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl Connection {
    /// Start connecting in the background. Events arrive on the returned
    /// receiver; the first is `Connected` once the socket is up.
    pub fn open(config: &ClientConfig) -> (Self, mpsc::Receiver<ConnectionEvent>) {
        let (outgoing_tx, outgoing_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (events_tx, events_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let cancel_token = CancellationToken::new();

        let handle = tokio::spawn(connection_loop(
            config.ws_url(RECORD_PATH),
            Backoff::new(config.backoff_initial, config.backoff_max),
            outgoing_rx,
            events_tx,
            cancel_token.clone(),
        ));

        (
            Self {
                outgoing: outgoing_tx,
                cancel_token,
                handle: Some(handle),
            },
            events_rx,
        )
    }

    pub fn sender(&self) -> mpsc::Sender<ClientMessage> {
        self.outgoing.clone()
    }

    pub async fn send(&self, message: ClientMessage) -> Result<(), TransportError> {
        self.outgoing
            .send(message)
            .await
            .map_err(|_| TransportError::Closed)
    }

    pub async fn close(mut self) -> Result<()> {
        self.cancel_token.cancel();
        if let Some(handle) = self.handle.take() {
            handle.await.context("connection task failed to join")?;
        }
        Ok(())
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

async fn connection_loop(
    url: String,
    mut backoff: Backoff,
    mut outgoing: mpsc::Receiver<ClientMessage>,
    events: mpsc::Sender<ConnectionEvent>,
    cancel_token: CancellationToken,
) {
    loop {
        let attempt = tokio::select! {
            _ = cancel_token.cancelled() => break,
            attempt = connect_async(url.as_str()) => attempt,
        };

        match attempt {
            Ok((stream, _)) => {
                backoff.reset();
                log_info!("Connected to {url}");
                if events.send(ConnectionEvent::Connected).await.is_err() {
                    break;
                }

                let (mut sink, mut source) = stream.split();
                let reason = loop {
                    tokio::select! {
                        _ = cancel_token.cancelled() => {
                            let _ = sink.close().await;
                            log_info!("connection closed");
                            return;
                        }
                        message = outgoing.recv() => {
                            let Some(message) = message else {
                                let _ = sink.close().await;
                                return;
                            };
                            let text = match message.to_json() {
                                Ok(text) => text,
                                Err(err) => {
                                    log_warn!("failed to encode {message:?}: {err}");
                                    continue;
                                }
                            };
                            if let Err(err) = sink.send(Message::Text(text)).await {
                                break TransportError::Connect(err.to_string());
                            }
                        }
                        frame = source.next() => match frame {
                            Some(Ok(Message::Text(text))) => match ServerMessage::parse(&text) {
                                Ok(message) => {
                                    if events.send(ConnectionEvent::Message(message)).await.is_err() {
                                        return;
                                    }
                                }
                                Err(err) => log_warn!("ignoring server frame: {err}"),
                            },
                            Some(Ok(Message::Close(_))) | None => break TransportError::Closed,
                            Some(Ok(_)) => {}
                            Some(Err(err)) => break TransportError::Connect(err.to_string()),
                        },
                    }
                };

                log_warn!("Disconnected from {url}: {reason}");
                if events.send(ConnectionEvent::Disconnected(reason)).await.is_err() {
                    break;
                }

                // requests queued for the dead socket would land out of context
                while let Ok(message) = outgoing.try_recv() {
                    log_debug!("dropping {message:?} queued while disconnected");
                }
            }
            Err(err) => log_debug!("connect to {url} failed: {err}"),
        }

        let delay = backoff.next_delay();
        tokio::select! {
            _ = cancel_token.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }

    log_info!("connection loop shutting down");
}
