use std::fmt;

/// Errors that can occur during browser discovery and launch.
#[derive(Debug)]
pub enum ChromeError {
    /// No browser executable could be located.
    NotFound(String),

    /// The browser process failed to launch.
    LaunchFailed(String),

    /// The browser did not start accepting connections within the timeout.
    StartupTimeout {
        port: u16,
    },

    /// HTTP request to the browser's debug endpoint failed.
    Http(String),

    /// A response from the browser could not be parsed.
    Parse(String),

    /// An I/O error occurred.
    Io(std::io::Error),
}

impl fmt::Display for ChromeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(msg) => write!(f, "browser not found: {msg}"),
            Self::LaunchFailed(msg) => write!(f, "browser launch failed: {msg}"),
            Self::StartupTimeout { port } => {
                write!(f, "browser startup timed out on port {port}")
            }
            Self::Http(msg) => write!(f, "browser debug endpoint error: {msg}"),
            Self::Parse(msg) => write!(f, "could not parse browser response: {msg}"),
            Self::Io(e) => write!(f, "browser I/O error: {e}"),
        }
    }
}

impl std::error::Error for ChromeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ChromeError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<ChromeError> for crate::error::AppError {
    fn from(e: ChromeError) -> Self {
        use crate::error::ExitCode;
        let code = match &e {
            ChromeError::NotFound(_) | ChromeError::LaunchFailed(_) => ExitCode::BrowserError,
            ChromeError::StartupTimeout { .. } => ExitCode::TimeoutError,
            ChromeError::Http(_) => ExitCode::ConnectionError,
            ChromeError::Parse(_) | ChromeError::Io(_) => ExitCode::GeneralError,
        };
        Self {
            message: e.to_string(),
            code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, ExitCode};

    #[test]
    fn display_not_found() {
        let err = ChromeError::NotFound("set HTML2PDF_BROWSER".into());
        assert_eq!(err.to_string(), "browser not found: set HTML2PDF_BROWSER");
    }

    #[test]
    fn display_startup_timeout() {
        let err = ChromeError::StartupTimeout { port: 9222 };
        assert_eq!(err.to_string(), "browser startup timed out on port 9222");
    }

    #[test]
    fn source_returns_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: &dyn std::error::Error = &ChromeError::Io(io_err);
        assert!(err.source().is_some());
        let plain: &dyn std::error::Error = &ChromeError::NotFound("x".into());
        assert!(plain.source().is_none());
    }

    #[test]
    fn not_found_is_a_browser_error_exit() {
        let app: AppError = ChromeError::NotFound("no chromium".into()).into();
        assert!(matches!(app.code, ExitCode::BrowserError));

        let timeout: AppError = ChromeError::StartupTimeout { port: 1 }.into();
        assert!(matches!(timeout.code, ExitCode::TimeoutError));

        let http: AppError = ChromeError::Http("refused".into()).into();
        assert!(matches!(http.code, ExitCode::ConnectionError));
    }
}
