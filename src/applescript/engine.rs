//! AppleScript execution via osascript.
//!
//! One external process per call, script passed inline with `-e` (stdin
//! would make quoting ambiguous against the script's own content). Output is
//! returned raw; parsing belongs to the caller. No retries: object creation
//! is not idempotent, so a failed invocation is never re-run automatically.

use std::io::Read;
use std::process::{Command, Stdio};
use std::time::Duration;

use wait_timeout::ChildExt;

use crate::{Error, Result, truncate_for_diagnostics};

/// Default deadline for a single script execution.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// osascript flags requesting the structured (`-s s`) serialization of
/// record output.
pub const STRUCTURED_FLAGS: &[&str] = &["-s", "s"];

/// Bytes of script text carried inside an execution error.
const ERROR_SCRIPT_LIMIT: usize = 500;

/// Pure AppleScript execution engine.
///
/// Only handles running scripts and returning raw output; no parsing or
/// application-specific logic.
#[derive(Debug, Clone)]
pub struct ScriptEngine {
    program: String,
    timeout: Duration,
}

impl ScriptEngine {
    /// Create an engine with the default timeout.
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Create an engine with a custom default timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            program: "osascript".to_string(),
            timeout,
        }
    }

    /// Override the interpreter binary. Used by tests to substitute a stub
    /// for osascript on machines that don't have it.
    #[cfg(test)]
    pub(crate) fn with_program(program: &str, timeout: Duration) -> Self {
        Self {
            program: program.to_string(),
            timeout,
        }
    }

    /// Execute a script and return its trimmed stdout.
    ///
    /// `flags` are passed before `-e`; `timeout` overrides the engine
    /// default for this call.
    ///
    /// # Errors
    ///
    /// [`Error::Execution`] on non-zero exit, [`Error::Timeout`] if the
    /// process does not complete before the deadline (the child is killed;
    /// no partial output is returned).
    pub fn execute(
        &self,
        script: &str,
        flags: &[&str],
        timeout: Option<Duration>,
    ) -> Result<String> {
        let deadline = timeout.unwrap_or(self.timeout);

        tracing::debug!(program = %self.program, ?flags, ?deadline, "executing script");
        tracing::trace!(script, "script content");

        let mut child = Command::new(&self.program)
            .args(flags)
            .arg("-e")
            .arg(script)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        // Drain both pipes on background threads so a chatty child can't
        // fill a pipe and deadlock against our wait below.
        let stdout_handle = spawn_reader(child.stdout.take());
        let stderr_handle = spawn_reader(child.stderr.take());

        let status = match child.wait_timeout(deadline)? {
            Some(status) => status,
            None => {
                tracing::error!(?deadline, "script execution timed out");
                let _ = child.kill();
                let _ = child.wait();
                return Err(Error::Timeout(deadline));
            }
        };

        let stdout = stdout_handle.join().unwrap_or_default();
        let stderr = stderr_handle.join().unwrap_or_default();

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr).trim().to_string();
            tracing::error!(?status, %stderr, "script execution failed");
            return Err(Error::Execution {
                status: status.code().unwrap_or(-1),
                stderr,
                script: truncate_for_diagnostics(script, ERROR_SCRIPT_LIMIT),
            });
        }

        let output = String::from_utf8_lossy(&stdout).trim().to_string();
        tracing::debug!(bytes = output.len(), "script output received");
        Ok(output)
    }

    /// Execute with the structured output flags (`-s s`).
    pub fn execute_structured(&self, script: &str, timeout: Option<Duration>) -> Result<String> {
        self.execute(script, STRUCTURED_FLAGS, timeout)
    }

    /// The engine's default timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for ScriptEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn spawn_reader<R: Read + Send + 'static>(
    source: Option<R>,
) -> std::thread::JoinHandle<Vec<u8>> {
    std::thread::spawn(move || {
        let mut buffer = Vec::new();
        if let Some(mut source) = source {
            let _ = source.read_to_end(&mut buffer);
        }
        buffer
    })
}
