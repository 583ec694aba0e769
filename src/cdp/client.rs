use tokio::sync::{mpsc, oneshot};
use tokio::time::{Duration, Instant};

use super::error::CdpError;
use super::transport::{ConnectRetry, TransportCommand, TransportHandle, spawn_transport};
use super::types::CdpEvent;

/// Configuration for a CDP client connection.
#[derive(Debug, Clone)]
pub struct CdpConfig {
    /// Timeout for a single WebSocket connection attempt (default: 10s).
    pub connect_timeout: Duration,
    /// Timeout for individual CDP commands (default: 30s).
    pub command_timeout: Duration,
    /// Capacity of the internal command channel (default: 256).
    pub channel_capacity: usize,
    /// Bounded retry settings for the initial connection.
    pub retry: ConnectRetry,
}

impl Default for CdpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            command_timeout: Duration::from_secs(30),
            channel_capacity: 256,
            retry: ConnectRetry::default(),
        }
    }
}

/// A CDP client connected to the browser over WebSocket.
///
/// Owns the browser-level connection; page work happens on a
/// [`CdpSession`] obtained via [`attach`](Self::attach).
#[derive(Debug)]
pub struct CdpClient {
    handle: TransportHandle,
    config: CdpConfig,
}

impl CdpClient {
    /// Connect to a browser's CDP WebSocket endpoint, retrying with
    /// backoff per the configuration.
    ///
    /// # Errors
    ///
    /// Returns `CdpError::RetriesExhausted` when no attempt succeeds.
    pub async fn connect(url: &str, config: CdpConfig) -> Result<Self, CdpError> {
        let handle = spawn_transport(
            url,
            config.channel_capacity,
            &config.retry,
            config.connect_timeout,
        )
        .await?;

        Ok(Self { handle, config })
    }

    /// Send a browser-level CDP command (no session).
    ///
    /// # Errors
    ///
    /// Returns `CdpError::CommandTimeout` if the browser does not respond
    /// in time, `CdpError::Protocol` if it returns an error, or
    /// `CdpError::Internal` if the transport task has exited.
    pub async fn send_command(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, CdpError> {
        send_command_impl(&self.handle, self.config.command_timeout, method, params, None).await
    }

    /// Create a new page target, initially pointing at `url`.
    ///
    /// # Errors
    ///
    /// Returns `CdpError::BadResponse` if the browser response lacks a
    /// target ID, or any transport error.
    pub async fn create_target(&self, url: &str) -> Result<String, CdpError> {
        let result = self
            .send_command(
                "Target.createTarget",
                Some(serde_json::json!({ "url": url })),
            )
            .await?;
        result["targetId"]
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| {
                CdpError::BadResponse("Target.createTarget response missing targetId".into())
            })
    }

    /// Attach to a target and return a session bound to it.
    ///
    /// # Errors
    ///
    /// Returns `CdpError::Protocol` if the target cannot be attached,
    /// or any transport error.
    pub async fn attach(&self, target_id: &str) -> Result<CdpSession, CdpError> {
        let params = serde_json::json!({
            "targetId": target_id,
            "flatten": true,
        });
        let result = self
            .send_command("Target.attachToTarget", Some(params))
            .await?;
        let session_id = result["sessionId"]
            .as_str()
            .ok_or_else(|| {
                CdpError::BadResponse("Target.attachToTarget response missing sessionId".into())
            })?
            .to_owned();

        Ok(CdpSession {
            session_id,
            handle: self.handle.clone(),
            config: self.config.clone(),
        })
    }

    /// Close a target (tab) by ID.
    ///
    /// # Errors
    ///
    /// Returns any transport or protocol error.
    pub async fn close_target(&self, target_id: &str) -> Result<(), CdpError> {
        self.send_command(
            "Target.closeTarget",
            Some(serde_json::json!({ "targetId": target_id })),
        )
        .await?;
        Ok(())
    }

    /// Gracefully close the WebSocket connection.
    ///
    /// # Errors
    ///
    /// Returns `CdpError::Internal` if the transport task has already exited.
    pub async fn close(self) -> Result<(), CdpError> {
        self.handle.send(TransportCommand::Shutdown).await
    }
}

/// A CDP session bound to a specific target (tab).
///
/// Shares the parent client's WebSocket connection; commands and events
/// are routed through the `sessionId`.
#[derive(Debug)]
pub struct CdpSession {
    session_id: String,
    handle: TransportHandle,
    config: CdpConfig,
}

impl CdpSession {
    /// Send a command within this session's context.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`CdpClient::send_command`].
    pub async fn send_command(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, CdpError> {
        send_command_impl(
            &self.handle,
            self.config.command_timeout,
            method,
            params,
            Some(self.session_id.clone()),
        )
        .await
    }

    /// Subscribe to events emitted within this session.
    ///
    /// Returns a receiver yielding matching events; delivery stops when
    /// the receiver is dropped.
    ///
    /// # Errors
    ///
    /// Returns `CdpError::Internal` if the transport task has exited.
    pub async fn subscribe(&self, method: &str) -> Result<mpsc::Receiver<CdpEvent>, CdpError> {
        let (event_tx, event_rx) = mpsc::channel(self.config.channel_capacity);
        self.handle
            .send(TransportCommand::Subscribe {
                method: method.to_owned(),
                session_id: Some(self.session_id.clone()),
                event_tx,
            })
            .await?;
        Ok(event_rx)
    }

    /// Get the session ID.
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

/// Send a CDP command via the transport handle and await the response.
async fn send_command_impl(
    handle: &TransportHandle,
    command_timeout: Duration,
    method: &str,
    params: Option<serde_json::Value>,
    session_id: Option<String>,
) -> Result<serde_json::Value, CdpError> {
    let command = super::types::CdpCommand {
        id: handle.next_message_id(),
        method: method.to_owned(),
        params,
        session_id,
    };

    let (response_tx, response_rx) = oneshot::channel();
    let deadline = Instant::now() + command_timeout;

    handle
        .send(TransportCommand::SendCommand {
            command,
            response_tx,
            deadline,
        })
        .await?;

    response_rx
        .await
        .map_err(|_| CdpError::Internal("transport task exited before responding".into()))?
}
