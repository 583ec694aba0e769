use std::time::Duration;

use serde::Deserialize;

use super::ChromeError;
use super::platform::is_remote_url;

/// Browser version information returned by `/json/version`.
#[derive(Debug, Deserialize)]
pub struct BrowserVersion {
    /// The browser name and version (e.g. "Chrome/131.0.6778.85").
    #[serde(rename = "Browser")]
    pub browser: String,

    /// The browser-level WebSocket debugger URL.
    #[serde(rename = "webSocketDebuggerUrl")]
    pub ws_debugger_url: String,
}

/// Query a browser's `/json/version` endpoint.
///
/// # Errors
///
/// Returns `ChromeError::Http` on connection failure or
/// `ChromeError::Parse` if the response cannot be deserialized.
pub async fn query_version(host: &str, port: u16) -> Result<BrowserVersion, ChromeError> {
    query_version_at(&format!("http://{host}:{port}")).await
}

/// Query `/json/version` on an explicit `http(s)://` base URL.
///
/// # Errors
///
/// Same as [`query_version`].
pub async fn query_version_at(base_url: &str) -> Result<BrowserVersion, ChromeError> {
    let url = format!("{}/json/version", base_url.trim_end_matches('/'));
    tokio::task::spawn_blocking(move || http_get_version(&url))
        .await
        .map_err(|e| ChromeError::Http(format!("task join failed: {e}")))?
}

/// Resolve a debug endpoint to the WebSocket URL a client can attach to.
///
/// `ws://`/`wss://` endpoints pass through untouched; `http(s)://`
/// endpoints are asked for their `webSocketDebuggerUrl`.
///
/// # Errors
///
/// Returns `ChromeError::Http` for unreachable endpoints or schemes that
/// are neither HTTP nor WebSocket.
pub async fn resolve_ws_url(endpoint: &str) -> Result<String, ChromeError> {
    if endpoint.starts_with("ws://") || endpoint.starts_with("wss://") {
        return Ok(endpoint.to_owned());
    }
    if !is_remote_url(endpoint) {
        return Err(ChromeError::Http(format!(
            "bad debugging URL scheme: {endpoint}"
        )));
    }
    let version = query_version_at(endpoint).await?;
    tracing::debug!("resolved {} at {endpoint}", version.browser);
    Ok(version.ws_debugger_url)
}

fn http_get_version(url: &str) -> Result<BrowserVersion, ChromeError> {
    let config = ureq::Agent::config_builder()
        .timeout_global(Some(Duration::from_secs(5)))
        .build();
    let agent: ureq::Agent = config.into();

    let mut response = agent
        .get(url)
        .call()
        .map_err(|e| ChromeError::Http(format!("GET {url} failed: {e}")))?;
    let body = response
        .body_mut()
        .read_to_string()
        .map_err(|e| ChromeError::Http(format!("reading {url} failed: {e}")))?;
    serde_json::from_str(&body).map_err(|e| ChromeError::Parse(e.to_string()))
}
