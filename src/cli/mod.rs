use std::fmt::Write as _;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::chrome::{BROWSER_ENV_VAR, BROWSER_EXECUTABLES};
use crate::papers;

#[derive(Parser)]
#[command(
    name = "html2pdf",
    version,
    about = "Convert HTML to PDF using Chrome Headless",
    long_about = "html2pdf converts HTML documents (local files or URLs) to PDF by driving a \
        headless Chrome/Chromium instance over the Chrome DevTools Protocol and invoking its \
        native print-to-PDF capability. It can launch a browser itself or attach to an \
        already-running remote-debuggable one.",
    after_long_help = root_after_help(),
    term_width = 100
)]
pub struct Cli {
    /// Enable verbose (debug) logging on stderr
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Render an HTML document to PDF
    #[command(after_long_help = render_after_help())]
    Render(RenderArgs),

    /// Launch a headless browser and keep it running
    #[command(
        long_about = "Launch a headless browser with remote debugging enabled and keep it \
            running until interrupted, logging a heartbeat. Point later render invocations \
            at it with --browser http://localhost:<port> to skip per-conversion browser \
            startup."
    )]
    Serve(ServeArgs),
}

#[derive(Args)]
pub struct RenderArgs {
    /// Local HTML file or URL to convert
    pub input: String,

    /// Output file (stdout when omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Browser binary path, or http(s):// or ws:// debugging URL of a running browser
    #[arg(long)]
    pub browser: Option<String>,

    /// Timeout in milliseconds for page readiness and navigation waits
    #[arg(long, default_value_t = 30_000)]
    pub timeout: u64,

    #[command(flatten)]
    pub print: PrintArgs,
}

#[derive(Args)]
#[command(next_help_heading = "Print options")]
pub struct PrintArgs {
    /// Print in landscape orientation
    #[arg(long)]
    pub landscape: bool,

    /// Print background graphics
    #[arg(long)]
    pub print_background: bool,

    /// Scale of the webpage rendering (e.g. 0.8)
    #[arg(long)]
    pub scale: Option<f64>,

    /// Named paper size (see the paper sizes list in --help)
    #[arg(long)]
    pub paper: Option<String>,

    /// Paper width in mm (overrides --paper)
    #[arg(long)]
    pub paper_width: Option<f64>,

    /// Paper height in mm (overrides --paper)
    #[arg(long)]
    pub paper_height: Option<f64>,

    /// Top margin in mm
    #[arg(long)]
    pub margin_top: Option<f64>,

    /// Bottom margin in mm
    #[arg(long)]
    pub margin_bottom: Option<f64>,

    /// Left margin in mm
    #[arg(long)]
    pub margin_left: Option<f64>,

    /// Right margin in mm
    #[arg(long)]
    pub margin_right: Option<f64>,

    /// All four margins in mm
    #[arg(long)]
    pub margin_all: Option<f64>,

    /// Left and right margins in mm
    #[arg(long)]
    pub margin_horiz: Option<f64>,

    /// Top and bottom margins in mm
    #[arg(long)]
    pub margin_vert: Option<f64>,

    /// Pages to print, e.g. '1-5, 8, 11-13'
    #[arg(long)]
    pub page_ranges: Option<String>,

    /// HTML template for the print header
    #[arg(long)]
    pub header_template: Option<String>,

    /// HTML template for the print footer
    #[arg(long)]
    pub footer_template: Option<String>,

    /// Prefer page size as defined by CSS over --paper
    #[arg(long)]
    pub prefer_css_page_size: bool,
}

#[derive(Args)]
pub struct ServeArgs {
    /// Port to expose the remote debugging protocol on
    #[arg(long, default_value_t = 9222)]
    pub port: u16,

    /// Browser binary path (auto-discovered when omitted)
    #[arg(long)]
    pub browser: Option<String>,
}

fn root_after_help() -> String {
    format!(
        "EXIT CODES:\n\
         \x20 0  Success\n\
         \x20 1  General error (invalid arguments, internal failure)\n\
         \x20 2  Connection error (debug endpoint unreachable, retries exhausted)\n\
         \x20 3  Browser error (executable not found, launch failed)\n\
         \x20 4  Timeout error (startup, readiness, or command timeout)\n\
         \x20 5  Protocol error (navigation failure, CDP error)\n\n\
         ENVIRONMENT VARIABLES:\n\
         \x20 {BROWSER_ENV_VAR}  Path to the browser executable"
    )
}

fn render_after_help() -> String {
    let mut help = String::from(
        "EXAMPLES:\n\
         \x20 html2pdf render https://example.com/ --output example.pdf\n\
         \x20 html2pdf render --browser http://localhost:9222 page.html --output page.pdf\n\
         \x20 html2pdf render --browser /usr/bin/chromium --paper letter report.html > report.pdf\n\n",
    );
    let _ = writeln!(
        help,
        "BROWSER LOOKUP ORDER:\n\
         \x20 1. --browser\n\
         \x20 2. {BROWSER_ENV_VAR}\n\
         \x20 3. {} on the PATH\n\
         \x20 4. fixed well-known install locations",
        BROWSER_EXECUTABLES.join(", ")
    );
    help.push_str("\nPAPER SIZES:\n");
    for stock in papers::STOCKS.iter() {
        let _ = writeln!(
            help,
            "\x20 {:10} {} x {} mm",
            stock.key, stock.height_mm, stock.width_mm
        );
    }
    help
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn render_parses_print_flags() {
        let cli = Cli::parse_from([
            "html2pdf",
            "render",
            "--landscape",
            "--paper",
            "a4",
            "--margin-all",
            "10",
            "--margin-left",
            "20",
            "--output",
            "out.pdf",
            "page.html",
        ]);
        let Command::Render(args) = cli.command else {
            panic!("expected render");
        };
        assert_eq!(args.input, "page.html");
        assert_eq!(args.output.as_deref(), Some(std::path::Path::new("out.pdf")));
        assert!(args.print.landscape);
        assert_eq!(args.print.paper.as_deref(), Some("a4"));
        assert_eq!(args.print.margin_all, Some(10.0));
        assert_eq!(args.print.margin_left, Some(20.0));
        assert_eq!(args.timeout, 30_000);
    }

    #[test]
    fn render_output_defaults_to_stdout() {
        let cli = Cli::parse_from(["html2pdf", "render", "page.html"]);
        let Command::Render(args) = cli.command else {
            panic!("expected render");
        };
        assert!(args.output.is_none());
        assert!(!args.print.landscape);
    }

    #[test]
    fn serve_defaults_to_port_9222() {
        let cli = Cli::parse_from(["html2pdf", "serve"]);
        let Command::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.port, 9222);
        assert!(args.browser.is_none());
    }

    #[test]
    fn help_lists_every_paper_stock() {
        let help = render_after_help();
        for stock in papers::STOCKS.iter() {
            assert!(help.contains(&stock.key), "missing {}", stock.key);
        }
    }
}
