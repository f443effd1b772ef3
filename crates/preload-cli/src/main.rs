//! CLI entry point.
//!
//! Loads `.env`, installs logging, parses arguments and dispatches to the
//! command handlers. Errors are mapped to exit codes here.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use preload_cli::{Cli, CliError, Commands, handlers};

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is fine
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            let code = err.downcast_ref::<CliError>().map_or(1, CliError::exit_code);
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Fetch {
            sources,
            queue,
            json,
        } => handlers::fetch::execute(&sources, &queue, json).await,
        Commands::Inspect {
            sources,
            base_path,
            prefer_network,
        } => handlers::inspect::execute(&sources, base_path, prefer_network),
    }
}

/// Log to stderr, filtered by `RUST_LOG`.
///
/// Without `RUST_LOG` only warnings are shown, or queue detail with `-v`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "warn,preload=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
