//! things-mcp CLI - an MCP bridge to the Things 3 todo manager.

use std::process;
use std::time::Duration;

use clap::Parser;

use things_mcp::cli::{Cli, Commands};
use things_mcp::commands;
use things_mcp::things::ThingsApi;

fn main() {
    // Logs go to stderr; stdout carries the MCP transport.
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let timeout = Duration::from_secs(cli.timeout_secs);
    let api = ThingsApi::with_config(&cli.app_name, Some(timeout));

    let result = match cli.command {
        Commands::Serve => commands::serve(api),
        Commands::Manifest => commands::manifest(),
        Commands::Today => commands::today(&api),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
