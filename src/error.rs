use std::fmt;

#[repr(u8)]
#[derive(Debug, Clone, Copy)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    ConnectionError = 2,
    BrowserError = 3,
    TimeoutError = 4,
    ProtocolError = 5,
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::GeneralError => write!(f, "general error"),
            Self::ConnectionError => write!(f, "connection error"),
            Self::BrowserError => write!(f, "browser error"),
            Self::TimeoutError => write!(f, "timeout error"),
            Self::ProtocolError => write!(f, "protocol error"),
        }
    }
}

#[derive(Debug)]
pub struct AppError {
    pub message: String,
    pub code: ExitCode,
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {}

impl AppError {
    #[must_use]
    pub fn general(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: ExitCode::GeneralError,
        }
    }

    #[must_use]
    pub fn navigation_failed(error_text: &str) -> Self {
        Self {
            message: format!("navigation failed: {error_text}"),
            code: ExitCode::ProtocolError,
        }
    }

    #[must_use]
    pub fn wait_timeout(what: &str, timeout_ms: u64) -> Self {
        Self {
            message: format!("timed out after {timeout_ms}ms waiting for {what}"),
            code: ExitCode::TimeoutError,
        }
    }

    #[must_use]
    pub fn unknown_paper(name: &str, known: &str) -> Self {
        Self {
            message: format!("unknown paper size '{name}'. Known sizes: {known}"),
            code: ExitCode::GeneralError,
        }
    }

    #[must_use]
    pub fn input_not_found(input: &str) -> Self {
        Self {
            message: format!(
                "input '{input}' is not a URL and does not exist as a local file"
            ),
            code: ExitCode::GeneralError,
        }
    }

    #[must_use]
    pub fn output_write_failed(path: &str, detail: &str) -> Self {
        Self {
            message: format!("could not write output to {path}: {detail}"),
            code: ExitCode::GeneralError,
        }
    }

    pub fn print_stderr(&self) {
        eprintln!("error: {}", self.message);
    }
}
