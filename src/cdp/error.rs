use std::fmt;

/// Errors that can occur while talking CDP to the browser.
#[derive(Debug)]
pub enum CdpError {
    /// A single WebSocket connection attempt failed.
    Connect(String),

    /// A connection attempt exceeded the configured timeout.
    ConnectTimeout,

    /// All connection attempts were exhausted.
    RetriesExhausted {
        attempts: u32,
        last_error: String,
    },

    /// A command did not receive a response within the configured timeout.
    CommandTimeout {
        method: String,
    },

    /// The browser returned a protocol-level error.
    Protocol {
        code: i64,
        message: String,
    },

    /// The WebSocket connection was closed while work was outstanding.
    Closed,

    /// The browser sent a response we could not make sense of.
    BadResponse(String),

    /// Internal error (transport task died, channel closed).
    Internal(String),
}

impl fmt::Display for CdpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect(msg) => write!(f, "CDP connection failed: {msg}"),
            Self::ConnectTimeout => write!(f, "CDP connection attempt timed out"),
            Self::RetriesExhausted {
                attempts,
                last_error,
            } => write!(
                f,
                "could not connect to the browser after {attempts} attempts: {last_error}"
            ),
            Self::CommandTimeout { method } => {
                write!(f, "CDP command timed out: {method}")
            }
            Self::Protocol { code, message } => {
                write!(f, "CDP protocol error ({code}): {message}")
            }
            Self::Closed => write!(f, "CDP connection closed"),
            Self::BadResponse(msg) => write!(f, "unexpected CDP response: {msg}"),
            Self::Internal(msg) => write!(f, "CDP internal error: {msg}"),
        }
    }
}

impl std::error::Error for CdpError {}

impl From<CdpError> for crate::error::AppError {
    fn from(e: CdpError) -> Self {
        use crate::error::ExitCode;
        let code = match &e {
            CdpError::Connect(_) | CdpError::RetriesExhausted { .. } | CdpError::Closed => {
                ExitCode::ConnectionError
            }
            CdpError::ConnectTimeout | CdpError::CommandTimeout { .. } => ExitCode::TimeoutError,
            CdpError::Protocol { .. } => ExitCode::ProtocolError,
            CdpError::BadResponse(_) | CdpError::Internal(_) => ExitCode::GeneralError,
        };
        Self {
            message: e.to_string(),
            code,
        }
    }
}
