//! things-mcp - an MCP bridge to the Things 3 todo manager.
//!
//! This library provides the core functionality for the `things-mcp` binary:
//! building AppleScript commands, executing them through `osascript`, parsing
//! the heterogeneous textual output back into typed data, and exposing the
//! resulting todo/project/area/tag operations as MCP tools.

pub mod applescript;
pub mod cli;
pub mod commands;
pub mod mcp;
pub mod models;
pub mod things;

use std::time::Duration;

/// Library-level error type for bridge operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("osascript exited with status {status}: {stderr}")]
    Execution {
        /// Exit status reported by the interpreter (-1 if killed by a signal).
        status: i32,
        /// Captured error stream.
        stderr: String,
        /// The script that was executed, truncated for diagnostics.
        script: String,
    },

    #[error("AppleScript execution timed out after {0:?}")]
    Timeout(Duration),

    #[error("failed to parse AppleScript output with {parser}: {detail}")]
    Parse {
        /// Name of the parser strategy whose predicate matched.
        parser: &'static str,
        /// Description of the underlying failure.
        detail: String,
        /// The raw output that failed to parse, truncated for diagnostics.
        output: String,
    },

    #[error("no statements added to build")]
    EmptyCommand,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for bridge operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Truncate diagnostic text so error values stay readable in logs.
pub(crate) fn truncate_for_diagnostics(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}
