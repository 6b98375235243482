//! Bounded shell command execution
//!
//! Runs a command line through `sh -c` with optional environment variables
//! and a mandatory timeout, capturing stdout and stderr.

use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, error};

pub const EXEC_DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("Failed to spawn command: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("Command exited with code {code}: {stderr}")]
    NonZeroExit { code: i32, stderr: String },
    #[error("Command timed out after {0:?}")]
    Timeout(Duration),
}

/// Run `command` with the given environment variables, rejecting on
/// non-zero exit or when `timeout` elapses. Captured stdout is logged at
/// debug level, stderr at error level.
pub async fn exec_async(
    command: &str,
    env: &[(String, String)],
    timeout: Duration,
) -> Result<(), ExecError> {
    let mut cmd = Command::new("sh");
    cmd.arg("-c")
        .arg(command)
        .stdin(Stdio::null())
        .kill_on_drop(true);
    for (key, value) in env {
        cmd.env(key, value);
    }

    let output = tokio::time::timeout(timeout, cmd.output())
        .await
        .map_err(|_| ExecError::Timeout(timeout))??;

    let stdout = String::from_utf8_lossy(&output.stdout);
    if !stdout.trim().is_empty() {
        debug!("{}", stdout.trim());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.trim().is_empty() {
        error!("{}", stderr.trim());
    }

    if !output.status.success() {
        return Err(ExecError::NonZeroExit {
            code: output.status.code().unwrap_or(-1),
            stderr: stderr.trim().to_string(),
        });
    }

    Ok(())
}
