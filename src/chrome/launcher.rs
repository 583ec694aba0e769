use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Duration;

use tracing::{debug, info};

use super::ChromeError;
use super::discovery::query_version;

/// Hardening flags passed to every launched browser. The profile is
/// throwaway, so sync, extensions, and first-run chrome are all disabled.
const HARDENING_ARGS: &[&str] = &[
    "--disable-default-apps",
    "--disable-extensions",
    "--disable-gpu",
    "--disable-sync",
    "--disable-translate",
    "--hide-scrollbars",
    "--incognito",
    "--metrics-recording-only",
    "--mute-audio",
    "--no-first-run",
    "--safebrowsing-disable-auto-update",
];

/// How long to wait for a launched browser to accept debug connections.
pub const STARTUP_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for launching a browser process.
pub struct LaunchConfig {
    /// Path to the browser executable.
    pub executable: PathBuf,
    /// Port for the remote debugging protocol.
    pub port: u16,
}

/// A handle to a running browser process.
///
/// The process is killed and its temporary profile removed on drop, so
/// failure paths tear the browser down without extra bookkeeping.
pub struct ChromeProcess {
    child: Option<std::process::Child>,
    port: u16,
    _temp_dir: Option<TempDir>,
}

/// A temporary directory that is removed on drop.
struct TempDir {
    path: PathBuf,
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.path);
    }
}

impl ChromeProcess {
    /// The HTTP debug endpoint of this browser.
    #[must_use]
    pub fn debug_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// Kill the browser process and reap it.
    pub fn kill(&mut self) {
        if let Some(child) = self.child.as_mut() {
            debug!("stopping browser (pid {})", child.id());
            let _ = child.kill();
            let _ = child.wait();
        }
        self.child = None;
    }
}

impl Drop for ChromeProcess {
    fn drop(&mut self) {
        self.kill();
    }
}

/// Generate a random hex suffix for temporary profile directory names.
///
/// Reads 8 bytes from `/dev/urandom` on Unix, falling back to a PID +
/// address combination when that is not available.
fn random_suffix() -> String {
    use std::io::Read;
    let mut buf = [0u8; 8];
    if let Ok(mut f) = std::fs::File::open("/dev/urandom") {
        if f.read_exact(&mut buf).is_ok() {
            let mut s = String::with_capacity(16);
            for b in buf {
                use std::fmt::Write;
                let _ = write!(s, "{b:02x}");
            }
            return s;
        }
    }
    let pid = std::process::id();
    let addr = &raw const buf as usize;
    format!("{pid:x}-{addr:x}")
}

/// Find an available TCP port on localhost.
///
/// # Errors
///
/// Returns `ChromeError::LaunchFailed` if binding fails.
pub fn find_available_port() -> Result<u16, ChromeError> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").map_err(|e| {
        ChromeError::LaunchFailed(format!("could not bind to find a free port: {e}"))
    })?;
    let port = listener
        .local_addr()
        .map_err(|e| ChromeError::LaunchFailed(format!("could not get local address: {e}")))?
        .port();
    drop(listener);
    Ok(port)
}

/// Launch a headless browser process with the given configuration.
///
/// Polls the debug endpoint until it responds or [`STARTUP_TIMEOUT`]
/// expires.
///
/// # Errors
///
/// Returns `ChromeError::LaunchFailed` if the process cannot be spawned
/// or exits early, or `ChromeError::StartupTimeout` if the browser does
/// not become ready in time.
pub async fn launch_browser(config: LaunchConfig) -> Result<ChromeProcess, ChromeError> {
    let profile_dir = std::env::temp_dir().join(format!("html2pdf-{}", random_suffix()));
    std::fs::create_dir_all(&profile_dir)?;
    let temp_dir = TempDir {
        path: profile_dir.clone(),
    };

    info!("starting browser {}", config.executable.display());

    let mut cmd = Command::new(&config.executable);
    cmd.arg("--headless=new")
        .arg(format!("--remote-debugging-port={}", config.port))
        .arg(format!("--user-data-dir={}", profile_dir.display()));
    for arg in HARDENING_ARGS {
        cmd.arg(arg);
    }
    cmd.stdout(Stdio::null()).stderr(Stdio::null());

    let child = cmd.spawn().map_err(|e| {
        ChromeError::LaunchFailed(format!(
            "failed to spawn {}: {e}",
            config.executable.display()
        ))
    })?;

    let mut process = ChromeProcess {
        child: Some(child),
        port: config.port,
        _temp_dir: Some(temp_dir),
    };

    let start = tokio::time::Instant::now();
    let poll_interval = Duration::from_millis(100);

    loop {
        if start.elapsed() > STARTUP_TIMEOUT {
            process.kill();
            return Err(ChromeError::StartupTimeout { port: config.port });
        }

        // A crash before readiness would otherwise look like a timeout.
        if let Some(child) = process.child.as_mut() {
            if let Ok(Some(status)) = child.try_wait() {
                return Err(ChromeError::LaunchFailed(format!(
                    "browser exited with status {status} before becoming ready"
                )));
            }
        }

        if query_version("127.0.0.1", config.port).await.is_ok() {
            debug!("browser ready on port {}", config.port);
            return Ok(process);
        }

        tokio::time::sleep(poll_interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_available_port_returns_valid_port() {
        let port = find_available_port().unwrap();
        assert!(port > 0);
    }

    #[test]
    fn random_suffixes_differ() {
        assert_ne!(random_suffix(), random_suffix());
    }

    #[test]
    fn temp_dir_cleanup_on_drop() {
        let path = std::env::temp_dir().join(format!("html2pdf-test-{}", random_suffix()));
        std::fs::create_dir_all(&path).unwrap();
        assert!(path.exists());

        let td = TempDir { path: path.clone() };
        drop(td);

        assert!(!path.exists());
    }

    #[tokio::test]
    async fn spawn_failure_is_launch_failed() {
        let result = launch_browser(LaunchConfig {
            executable: PathBuf::from("/nonexistent/browser-binary"),
            port: 1,
        })
        .await;
        let Err(err) = result else {
            panic!("expected launch to fail");
        };
        assert!(matches!(err, ChromeError::LaunchFailed(_)));
    }
}
