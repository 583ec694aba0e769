//! Print orchestration: navigate a page target and ask the browser for a PDF.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time::Duration;
use tracing::{debug, info};

use crate::cdp::{CdpEvent, CdpSession};
use crate::error::AppError;

/// Print parameters for `Page.printToPDF`.
///
/// Every field is optional; absent fields fall back to the browser's
/// print defaults. Lengths are in inches on the wire.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub landscape: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub print_background: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paper_width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paper_height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin_top: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin_bottom: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin_left: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin_right: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_ranges: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header_template: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer_template: Option<String>,
    // The protocol spells this one with CSS in caps.
    #[serde(
        rename = "preferCSSPageSize",
        skip_serializing_if = "Option::is_none"
    )]
    pub prefer_css_page_size: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_header_footer: Option<bool>,
}

/// Navigate the session's page to `url` and print it to PDF.
///
/// The page target starts at `about:blank`; we wait for its network to
/// go idle before navigating, then for `DOMContentLoaded` after, and
/// only then issue the print request.
///
/// # Errors
///
/// Returns an error on navigation failure, on either wait timing out,
/// or on any protocol error from the browser.
pub async fn print_page(
    session: &CdpSession,
    url: &str,
    options: &PrintOptions,
    wait_timeout: Duration,
) -> Result<Vec<u8>, AppError> {
    session.send_command("Page.enable", None).await?;

    // Subscribe before enabling lifecycle events so none slip past.
    let mut lifecycle_rx = session.subscribe("Page.lifecycleEvent").await?;
    session
        .send_command(
            "Page.setLifecycleEventsEnabled",
            Some(serde_json::json!({ "enabled": true })),
        )
        .await?;

    debug!("waiting for network idle");
    wait_for_lifecycle(&mut lifecycle_rx, "networkIdle", wait_timeout).await?;

    let mut dom_rx = session.subscribe("Page.domContentEventFired").await?;
    let result = session
        .send_command("Page.navigate", Some(serde_json::json!({ "url": url })))
        .await?;
    if let Some(error_text) = result["errorText"].as_str() {
        if !error_text.is_empty() {
            return Err(AppError::navigation_failed(error_text));
        }
    }
    wait_for_event(&mut dom_rx, "DOM content loaded", wait_timeout).await?;

    info!("page loaded, printing");
    let params = serde_json::to_value(options)
        .map_err(|e| AppError::general(format!("could not encode print options: {e}")))?;
    let result = session
        .send_command("Page.printToPDF", Some(params))
        .await?;

    let data = result["data"].as_str().ok_or_else(|| {
        AppError::general("Page.printToPDF response missing 'data' field")
    })?;
    let bytes = BASE64
        .decode(data)
        .map_err(|e| AppError::general(format!("could not decode PDF payload: {e}")))?;

    info!("printed {} bytes", bytes.len());
    Ok(bytes)
}

/// Wait until a `Page.lifecycleEvent` with the given name fires.
async fn wait_for_lifecycle(
    rx: &mut mpsc::Receiver<CdpEvent>,
    name: &str,
    timeout: Duration,
) -> Result<(), AppError> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        tokio::select! {
            event = rx.recv() => {
                match event {
                    Some(event) if event.params["name"] == name => return Ok(()),
                    Some(_) => {}
                    None => {
                        return Err(AppError::general(format!(
                            "event channel closed while waiting for {name}"
                        )));
                    }
                }
            }
            () = tokio::time::sleep_until(deadline) => {
                #[allow(clippy::cast_possible_truncation)]
                return Err(AppError::wait_timeout(name, timeout.as_millis() as u64));
            }
        }
    }
}

/// Wait for the next event on `rx`, whatever it carries.
async fn wait_for_event(
    rx: &mut mpsc::Receiver<CdpEvent>,
    what: &str,
    timeout: Duration,
) -> Result<(), AppError> {
    tokio::select! {
        event = rx.recv() => {
            match event {
                Some(_) => Ok(()),
                None => Err(AppError::general(format!(
                    "event channel closed while waiting for {what}"
                ))),
            }
        }
        () = tokio::time::sleep(timeout) => {
            #[allow(clippy::cast_possible_truncation)]
            Err(AppError::wait_timeout(what, timeout.as_millis() as u64))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn default_options_serialize_to_empty_object() {
        let json: Value = serde_json::to_value(PrintOptions::default()).unwrap();
        assert_eq!(json, serde_json::json!({}));
    }

    #[test]
    fn wire_names_are_camel_case() {
        let options = PrintOptions {
            print_background: Some(true),
            paper_width: Some(8.27),
            margin_top: Some(0.5),
            page_ranges: Some("1-3".into()),
            ..PrintOptions::default()
        };
        let json: Value = serde_json::to_value(&options).unwrap();
        assert_eq!(json["printBackground"], true);
        assert!((json["paperWidth"].as_f64().unwrap() - 8.27).abs() < 1e-9);
        assert!((json["marginTop"].as_f64().unwrap() - 0.5).abs() < 1e-9);
        assert_eq!(json["pageRanges"], "1-3");
        assert!(json.get("landscape").is_none());
    }

    #[test]
    fn prefer_css_page_size_uses_protocol_casing() {
        let options = PrintOptions {
            prefer_css_page_size: Some(true),
            ..PrintOptions::default()
        };
        let json: Value = serde_json::to_value(&options).unwrap();
        assert_eq!(json["preferCSSPageSize"], true);
        assert!(json.get("preferCssPageSize").is_none());
    }

    #[test]
    fn header_footer_templates_serialize() {
        let options = PrintOptions {
            header_template: Some("<div>head</div>".into()),
            footer_template: Some("<div>foot</div>".into()),
            display_header_footer: Some(true),
            ..PrintOptions::default()
        };
        let json: Value = serde_json::to_value(&options).unwrap();
        assert_eq!(json["headerTemplate"], "<div>head</div>");
        assert_eq!(json["footerTemplate"], "<div>foot</div>");
        assert_eq!(json["displayHeaderFooter"], true);
    }
}
