use std::path::PathBuf;

use tokio::time::Duration;
use tracing::info;

use crate::chrome::{LaunchConfig, find_browser, is_remote_url, launch_browser};
use crate::cli::ServeArgs;
use crate::error::AppError;

/// Interval between heartbeat log lines while serving.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(60);

/// Execute the `serve` subcommand: launch a browser with remote
/// debugging on the requested port and idle until Ctrl-C.
///
/// # Errors
///
/// Returns `AppError` when no browser binary can be found or the launch
/// fails.
pub async fn execute_serve(args: &ServeArgs) -> Result<(), AppError> {
    let executable = match args.browser.as_deref() {
        Some(spec) if is_remote_url(spec) => {
            return Err(AppError::general(
                "serve launches a browser itself and needs a binary path, not a URL",
            ));
        }
        Some(path) => PathBuf::from(path),
        None => find_browser()?,
    };

    let chrome = launch_browser(LaunchConfig {
        executable,
        port: args.port,
    })
    .await?;

    info!("listening on {}", chrome.debug_url());

    let mut ticker = tokio::time::interval(HEARTBEAT_INTERVAL);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                info!("heartbeat");
            }
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    return Err(AppError::general(format!(
                        "could not listen for shutdown signal: {e}"
                    )));
                }
                info!("shutting down");
                break;
            }
        }
    }

    drop(chrome);
    Ok(())
}
