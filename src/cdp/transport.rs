use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Duration, Instant};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

use super::error::CdpError;
use super::types::{CdpCommand, CdpEvent, Incoming, WireMessage};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Key for the subscriber map: (`method_name`, `session_id`).
type SubscriberKey = (String, Option<String>);

/// Incoming message cap. A printed PDF arrives base64-encoded in a single
/// text frame, so the library default of a few megabytes is far too small.
const MAX_MESSAGE_BYTES: usize = 1 << 30;

/// Command sent from the client handle to the transport task.
pub enum TransportCommand {
    /// Send a CDP command and deliver the response via the oneshot channel.
    SendCommand {
        command: CdpCommand,
        response_tx: oneshot::Sender<Result<serde_json::Value, CdpError>>,
        deadline: Instant,
    },
    /// Subscribe to events matching a method name (and optional session).
    Subscribe {
        method: String,
        session_id: Option<String>,
        event_tx: mpsc::Sender<CdpEvent>,
    },
    /// Shut down the transport gracefully.
    Shutdown,
}

/// Tracks an in-flight command awaiting its response.
struct PendingRequest {
    response_tx: oneshot::Sender<Result<serde_json::Value, CdpError>>,
    method: String,
    deadline: Instant,
}

/// Settings for the bounded connect retry loop.
#[derive(Debug, Clone)]
pub struct ConnectRetry {
    /// Total number of connection attempts before giving up.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_delay: Duration,
    /// Growth factor applied to the delay after each failed attempt.
    pub growth: f64,
    /// Upper bound on the delay between attempts.
    pub max_delay: Duration,
}

impl Default for ConnectRetry {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_delay: Duration::from_millis(500),
            growth: 1.6,
            max_delay: Duration::from_secs(5),
        }
    }
}

/// Next backoff delay: multiply by the growth factor, capped.
fn next_delay(current: Duration, growth: f64, cap: Duration) -> Duration {
    current.mul_f64(growth).min(cap)
}

/// Clonable handle for communicating with the transport task.
#[derive(Debug, Clone)]
pub struct TransportHandle {
    command_tx: mpsc::Sender<TransportCommand>,
    next_id: Arc<AtomicU64>,
}

impl TransportHandle {
    /// Send a transport command to the background task.
    ///
    /// # Errors
    ///
    /// Returns `CdpError::Internal` if the transport task has exited.
    pub async fn send(&self, cmd: TransportCommand) -> Result<(), CdpError> {
        self.command_tx
            .send(cmd)
            .await
            .map_err(|_| CdpError::Internal("transport task is not running".into()))
    }

    /// Generate the next unique message ID for this connection.
    pub fn next_message_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

/// Establish a single WebSocket connection with a timeout and a raised
/// incoming message cap.
async fn connect_ws(url: &str, timeout: Duration) -> Result<WsStream, CdpError> {
    let config = WebSocketConfig::default()
        .max_message_size(Some(MAX_MESSAGE_BYTES))
        .max_frame_size(Some(MAX_MESSAGE_BYTES));
    let attempt = tokio_tungstenite::connect_async_with_config(url, Some(config), false);
    match tokio::time::timeout(timeout, attempt).await {
        Ok(Ok((stream, _response))) => Ok(stream),
        Ok(Err(e)) => Err(CdpError::Connect(e.to_string())),
        Err(_) => Err(CdpError::ConnectTimeout),
    }
}

/// Connect with bounded retries and exponentially growing delay.
///
/// A freshly launched browser may not accept its debug connection right
/// away, so refused and timed-out attempts are retried.
///
/// # Errors
///
/// Returns `CdpError::RetriesExhausted` once every attempt has failed.
async fn connect_ws_with_retry(
    url: &str,
    retry: &ConnectRetry,
    connect_timeout: Duration,
) -> Result<WsStream, CdpError> {
    let mut delay = retry.initial_delay;
    let mut last_error = String::from("no attempts made");

    for attempt in 1..=retry.max_attempts.max(1) {
        match connect_ws(url, connect_timeout).await {
            Ok(stream) => {
                debug!("connected to {url} on attempt {attempt}");
                return Ok(stream);
            }
            Err(e) => {
                last_error = e.to_string();
                if attempt < retry.max_attempts {
                    warn!("connection attempt {attempt} failed ({last_error}), retrying in {delay:?}");
                    tokio::time::sleep(delay).await;
                    delay = next_delay(delay, retry.growth, retry.max_delay);
                }
            }
        }
    }

    Err(CdpError::RetriesExhausted {
        attempts: retry.max_attempts.max(1),
        last_error,
    })
}

/// Connect (with retry) and spawn the transport background task.
///
/// # Errors
///
/// Returns `CdpError::RetriesExhausted` if no connection could be
/// established within the retry budget.
pub async fn spawn_transport(
    url: &str,
    channel_capacity: usize,
    retry: &ConnectRetry,
    connect_timeout: Duration,
) -> Result<TransportHandle, CdpError> {
    let ws_stream = connect_ws_with_retry(url, retry, connect_timeout).await?;
    let (command_tx, command_rx) = mpsc::channel(channel_capacity);

    let handle = TransportHandle {
        command_tx,
        next_id: Arc::new(AtomicU64::new(1)),
    };

    tokio::spawn(async move {
        let mut task = TransportTask {
            ws_stream,
            command_rx,
            pending: HashMap::new(),
            subscribers: HashMap::new(),
        };
        task.run().await;
    });

    Ok(handle)
}

/// The background task that owns the WebSocket connection.
///
/// One conversion means one connection; if the peer goes away mid-flight
/// all outstanding commands fail with `Closed` and the task exits.
struct TransportTask {
    ws_stream: WsStream,
    command_rx: mpsc::Receiver<TransportCommand>,
    pending: HashMap<u64, PendingRequest>,
    subscribers: HashMap<SubscriberKey, Vec<mpsc::Sender<CdpEvent>>>,
}

impl TransportTask {
    async fn run(&mut self) {
        loop {
            let next_deadline = self.pending.values().map(|p| p.deadline).min();
            let timeout_sleep = async {
                if let Some(deadline) = next_deadline {
                    tokio::time::sleep_until(deadline).await;
                } else {
                    // No pending requests, nothing to sweep.
                    std::future::pending::<()>().await;
                }
            };

            tokio::select! {
                ws_msg = self.ws_stream.next() => {
                    match ws_msg {
                        Some(Ok(Message::Text(text))) => {
                            self.handle_text_message(&text);
                        }
                        Some(Ok(Message::Close(_)) | Err(_)) | None => {
                            self.fail_pending();
                            return;
                        }
                        Some(Ok(_)) => {
                            // Binary, Ping, Pong, Frame: not part of CDP.
                        }
                    }
                }

                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(TransportCommand::SendCommand { command, response_tx, deadline }) => {
                            self.handle_send_command(command, response_tx, deadline).await;
                        }
                        Some(TransportCommand::Subscribe { method, session_id, event_tx }) => {
                            self.subscribers
                                .entry((method, session_id))
                                .or_default()
                                .push(event_tx);
                        }
                        Some(TransportCommand::Shutdown) | None => {
                            self.fail_pending();
                            let _ = self.ws_stream.close(None).await;
                            return;
                        }
                    }
                }

                () = timeout_sleep => {
                    self.sweep_timeouts();
                }
            }
        }
    }

    fn handle_text_message(&mut self, text: &str) {
        let Ok(raw) = serde_json::from_str::<WireMessage>(text) else {
            // Malformed JSON from the browser; skip it.
            return;
        };
        match raw.into_incoming() {
            Some(Incoming::Response(response)) => {
                if let Some(pending) = self.pending.remove(&response.id) {
                    let result = response.result.map_err(|e| CdpError::Protocol {
                        code: e.code,
                        message: e.message,
                    });
                    let _ = pending.response_tx.send(result);
                }
            }
            Some(Incoming::Event(event)) => {
                let key = (event.method.clone(), event.session_id.clone());
                if let Some(senders) = self.subscribers.get_mut(&key) {
                    senders.retain(|tx| tx.try_send(event.clone()).is_ok() || !tx.is_closed());
                    if senders.is_empty() {
                        self.subscribers.remove(&key);
                    }
                }
            }
            None => {}
        }
    }

    async fn handle_send_command(
        &mut self,
        command: CdpCommand,
        response_tx: oneshot::Sender<Result<serde_json::Value, CdpError>>,
        deadline: Instant,
    ) {
        let id = command.id;
        let method = command.method.clone();

        let json = match serde_json::to_string(&command) {
            Ok(j) => j,
            Err(e) => {
                let _ =
                    response_tx.send(Err(CdpError::Internal(format!("serialization error: {e}"))));
                return;
            }
        };

        if let Err(e) = self.ws_stream.send(Message::Text(json.into())).await {
            let _ = response_tx.send(Err(CdpError::Connect(format!(
                "WebSocket write error: {e}"
            ))));
            return;
        }

        self.pending.insert(
            id,
            PendingRequest {
                response_tx,
                method,
                deadline,
            },
        );
    }

    fn sweep_timeouts(&mut self) {
        let now = Instant::now();
        let timed_out: Vec<u64> = self
            .pending
            .iter()
            .filter(|(_, p)| p.deadline <= now)
            .map(|(&id, _)| id)
            .collect();

        for id in timed_out {
            if let Some(pending) = self.pending.remove(&id) {
                let _ = pending.response_tx.send(Err(CdpError::CommandTimeout {
                    method: pending.method,
                }));
            }
        }
    }

    fn fail_pending(&mut self) {
        let pending = std::mem::take(&mut self.pending);
        for (_, req) in pending {
            let _ = req.response_tx.send(Err(CdpError::Closed));
        }
    }
}
