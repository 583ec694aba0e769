use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outgoing CDP command (client to browser).
#[derive(Debug, Serialize)]
pub struct CdpCommand {
    /// Unique message ID for response correlation.
    pub id: u64,
    /// CDP method name (e.g., `Page.printToPDF`).
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    /// Session ID for session-scoped commands.
    #[serde(rename = "sessionId", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Protocol error payload returned by the browser.
#[derive(Debug, Clone, Deserialize)]
pub struct ProtocolError {
    pub code: i64,
    pub message: String,
}

/// A response to a previously sent command (carries an `id`).
#[derive(Debug)]
pub struct CommandResponse {
    pub id: u64,
    pub result: Result<Value, ProtocolError>,
}

/// An asynchronous event emitted by the browser (carries a `method`).
#[derive(Debug, Clone)]
pub struct CdpEvent {
    pub method: String,
    pub params: Value,
    pub session_id: Option<String>,
}

/// A classified incoming message.
pub enum Incoming {
    Response(CommandResponse),
    Event(CdpEvent),
}

/// Raw incoming message as it appears on the wire.
///
/// Every WebSocket text frame deserializes into this union of response and
/// event fields, then [`into_incoming`](Self::into_incoming) sorts it out.
#[derive(Debug, Deserialize)]
pub struct WireMessage {
    pub id: Option<u64>,
    pub method: Option<String>,
    pub params: Option<Value>,
    pub result: Option<Value>,
    pub error: Option<ProtocolError>,
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

impl WireMessage {
    /// Classify: messages with an `id` are responses, messages with a
    /// `method` but no `id` are events. Anything else is unclassifiable
    /// and yields `None`.
    #[must_use]
    pub fn into_incoming(self) -> Option<Incoming> {
        if let Some(id) = self.id {
            let result = match self.error {
                Some(error) => Err(error),
                None => Ok(self.result.unwrap_or(Value::Null)),
            };
            Some(Incoming::Response(CommandResponse { id, result }))
        } else if let Some(method) = self.method {
            Some(Incoming::Event(CdpEvent {
                method,
                params: self.params.unwrap_or(Value::Null),
                session_id: self.session_id,
            }))
        } else {
            None
        }
    }
}
