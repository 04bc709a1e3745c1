//! CLI argument definitions for things-mcp.

use clap::{Parser, Subcommand};

/// things-mcp - an MCP bridge to the Things 3 todo manager.
///
/// Run `things-mcp serve` to expose Things 3 over MCP stdio.
#[derive(Parser, Debug)]
#[command(name = "things-mcp")]
#[command(
    author,
    version,
    about = "MCP server bridging the Things 3 todo manager via AppleScript",
    long_about = None
)]
pub struct Cli {
    /// Script execution timeout in seconds.
    /// Can also be set via the THINGS_MCP_TIMEOUT environment variable.
    #[arg(
        long = "timeout",
        global = true,
        env = "THINGS_MCP_TIMEOUT",
        default_value_t = 30
    )]
    pub timeout_secs: u64,

    /// Name of the host application to automate.
    /// Can also be set via the THINGS_MCP_APP environment variable.
    #[arg(
        long = "app-name",
        global = true,
        env = "THINGS_MCP_APP",
        default_value = "Things3"
    )]
    pub app_name: String,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the MCP stdio server
    Serve,

    /// Print the MCP tool definitions as JSON
    Manifest,

    /// Show the Today list as a text table
    Today,
}
