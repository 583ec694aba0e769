use clap::Parser;

use html2pdf::cli::{Cli, Command};
use html2pdf::error::AppError;
use html2pdf::{render, serve};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(&cli).await {
        e.print_stderr();
        #[allow(clippy::cast_possible_truncation)]
        std::process::exit(e.code as i32);
    }
}

async fn run(cli: &Cli) -> Result<(), AppError> {
    match &cli.command {
        Command::Render(args) => render::execute_render(args).await,
        Command::Serve(args) => serve::execute_serve(args).await,
    }
}

/// Logs go to stderr: stdout is reserved for PDF bytes when no output
/// file is given.
fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("html2pdf=debug")
    } else {
        EnvFilter::new("html2pdf=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}
