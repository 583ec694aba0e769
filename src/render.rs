use std::io::Write as _;
use std::path::PathBuf;

use tokio::time::Duration;
use tracing::{debug, info};
use url::Url;

use crate::cdp::{CdpClient, CdpConfig};
use crate::chrome::{
    LaunchConfig, find_available_port, find_browser, is_remote_url, launch_browser,
    resolve_ws_url,
};
use crate::cli::{PrintArgs, RenderArgs};
use crate::error::AppError;
use crate::papers::{self, MarginSpec};
use crate::pdf::{self, PrintOptions};

/// Execute the `render` subcommand.
///
/// # Errors
///
/// Returns `AppError` on any failure: unknown paper, missing input,
/// browser problems, protocol errors, or output write failures.
pub async fn execute_render(args: &RenderArgs) -> Result<(), AppError> {
    let options = build_print_options(&args.print)?;
    let input_url = to_target_url(&args.input)?;
    let wait_timeout = Duration::from_millis(args.timeout);

    let pdf_bytes = match args.browser.as_deref() {
        Some(endpoint) if is_remote_url(endpoint) => {
            debug!("attaching to browser at {endpoint}");
            render_at(endpoint, &input_url, &options, wait_timeout).await?
        }
        browser => {
            let executable = match browser {
                Some(path) => PathBuf::from(path),
                None => find_browser()?,
            };
            let port = find_available_port()?;
            let chrome = launch_browser(LaunchConfig { executable, port }).await?;
            // The browser dies with `chrome` on every path out of here.
            render_at(&chrome.debug_url(), &input_url, &options, wait_timeout).await?
        }
    };

    write_output(args.output.as_deref(), &pdf_bytes)
}

/// Connect to a debug endpoint, open a fresh target, and print `url`.
async fn render_at(
    endpoint: &str,
    url: &str,
    options: &PrintOptions,
    wait_timeout: Duration,
) -> Result<Vec<u8>, AppError> {
    let ws_url = resolve_ws_url(endpoint).await?;
    let client = CdpClient::connect(&ws_url, CdpConfig::default()).await?;

    let target_id = client.create_target("about:blank").await?;
    let session = client.attach(&target_id).await?;
    debug!("attached to target {target_id} as session {}", session.session_id());

    let result = pdf::print_page(&session, url, options, wait_timeout).await;

    // Best-effort teardown; the conversion result is what matters.
    let _ = client.close_target(&target_id).await;
    let _ = client.close().await;

    result
}

/// Turn the CLI input into something `Page.navigate` accepts: URLs pass
/// through, anything else must be an existing local file and becomes a
/// `file://` URL.
fn to_target_url(input: &str) -> Result<String, AppError> {
    if Url::parse(input).is_ok() {
        return Ok(input.to_owned());
    }
    let absolute = std::fs::canonicalize(input)
        .map_err(|_| AppError::input_not_found(input))?;
    Url::from_file_path(&absolute)
        .map(String::from)
        .map_err(|()| AppError::general(format!("cannot express {input} as a file:// URL")))
}

/// Map the CLI print flags onto protocol print options, converting
/// millimeters to inches at the boundary.
fn build_print_options(print: &PrintArgs) -> Result<PrintOptions, AppError> {
    let (paper_width_mm, paper_height_mm) = papers::resolve_paper(
        print.paper.as_deref(),
        print.paper_width,
        print.paper_height,
    )?;

    let margins = MarginSpec {
        top: print.margin_top,
        bottom: print.margin_bottom,
        left: print.margin_left,
        right: print.margin_right,
        all: print.margin_all,
        horiz: print.margin_horiz,
        vert: print.margin_vert,
    }
    .resolve();

    let has_templates = print.header_template.is_some() || print.footer_template.is_some();

    Ok(PrintOptions {
        landscape: print.landscape.then_some(true),
        print_background: print.print_background.then_some(true),
        scale: print.scale,
        paper_width: papers::mm_to_inch(paper_width_mm),
        paper_height: papers::mm_to_inch(paper_height_mm),
        margin_top: papers::mm_to_inch(margins.map(|m| m.top)),
        margin_bottom: papers::mm_to_inch(margins.map(|m| m.bottom)),
        margin_left: papers::mm_to_inch(margins.map(|m| m.left)),
        margin_right: papers::mm_to_inch(margins.map(|m| m.right)),
        page_ranges: print.page_ranges.clone(),
        header_template: print.header_template.clone(),
        footer_template: print.footer_template.clone(),
        prefer_css_page_size: print.prefer_css_page_size.then_some(true),
        display_header_footer: has_templates.then_some(true),
    })
}

/// Write the PDF bytes to the output file, or to stdout when no file
/// was given.
fn write_output(path: Option<&std::path::Path>, bytes: &[u8]) -> Result<(), AppError> {
    match path {
        Some(p) => {
            std::fs::write(p, bytes).map_err(|e| {
                AppError::output_write_failed(&p.display().to_string(), &e.to_string())
            })?;
            info!("wrote {} bytes to {}", bytes.len(), p.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(bytes)
                .and_then(|()| stdout.flush())
                .map_err(|e| AppError::output_write_failed("stdout", &e.to_string()))?;
        }
    }
    Ok(())
}
