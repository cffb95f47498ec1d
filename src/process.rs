//! Subprocess execution with captured output.

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::trace;

use crate::error::{Error, Result};

/// Run `program args...`, optionally inside `cwd`, and return trimmed stdout.
///
/// A non-zero exit status is [`Error::CommandExecution`] carrying trimmed stderr;
/// failing to spawn at all is [`Error::CommandFailed`].
pub async fn run_captured(program: &str, args: &[&str], cwd: Option<&Path>) -> Result<String> {
    let command_line = format!("{} {}", program, args.join(" "));
    trace!("Executing command: {}", command_line);

    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(cwd) = cwd {
        trace!("Working directory: {}", cwd.display());
        command.current_dir(cwd);
    }

    let output = command
        .output()
        .await
        .map_err(|e| Error::command_failed(command_line.clone(), e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(Error::command_exec(command_line, stderr));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
