//! Local CLI executor
//!
//! Runs a supported executor binary with the agent's system prompt and the
//! user input on stdin, and captures stdout as the artifact output. No token
//! accounting happens here; CLI executions store zero tokens and zero cost.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;

use crate::error::{EngineError, Result};

const EXECUTOR_TIMEOUT_SECS: u64 = 180;

/// Executor binaries the workbench knows how to drive.
pub const SUPPORTED_EXECUTORS: &[&str] = &["codex", "claude"];

/// Result of one executor run.
#[derive(Debug, Clone)]
pub struct ExecutorOutput {
    pub stdout: String,
    pub duration_ms: u64,
    /// Resolved absolute path of the executor binary.
    pub command: String,
}

/// Run `executor` with the prompt document on stdin and collect stdout.
pub async fn run_executor(
    executor: &str,
    system_prompt: &str,
    user_input: &str,
) -> Result<ExecutorOutput> {
    let name = executor.trim();
    if !SUPPORTED_EXECUTORS.contains(&name) {
        return Err(EngineError::UnsupportedExecutor);
    }

    let command = resolve_executor(name)?;
    let document = format!(
        "system_prompt:\n{}\n\nuser_input:\n{}\n",
        system_prompt, user_input
    );

    let start = Instant::now();
    let mut child = Command::new(&command)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|err| EngineError::ExecutorFailed {
            name: name.to_string(),
            detail: err.to_string(),
        })?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(document.as_bytes())
            .await
            .map_err(|err| EngineError::ExecutorFailed {
                name: name.to_string(),
                detail: format!("write stdin: {}", err),
            })?;
        // Dropping the handle closes the pipe so the child sees EOF.
    }

    let output = timeout(
        Duration::from_secs(EXECUTOR_TIMEOUT_SECS),
        child.wait_with_output(),
    )
    .await
    .map_err(|_| EngineError::ExecutorTimeout {
        name: name.to_string(),
        timeout_secs: EXECUTOR_TIMEOUT_SECS,
    })?
    .map_err(|err| EngineError::ExecutorFailed {
        name: name.to_string(),
        detail: err.to_string(),
    })?;

    let duration_ms = start.elapsed().as_millis() as u64;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(EngineError::ExecutorFailed {
            name: name.to_string(),
            detail: stderr.trim().to_string(),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    tracing::debug!(executor = name, duration_ms, bytes = stdout.len(), "executor run complete");

    Ok(ExecutorOutput {
        stdout,
        duration_ms,
        command,
    })
}

/// Resolve an executor name to an absolute path by searching `PATH`.
pub fn resolve_executor(name: &str) -> Result<String> {
    let path_var = std::env::var_os("PATH").unwrap_or_default();
    for dir in std::env::split_paths(&path_var) {
        if dir.as_os_str().is_empty() {
            continue;
        }
        let candidate: PathBuf = dir.join(name);
        if candidate.is_file() {
            return Ok(candidate.to_string_lossy().into_owned());
        }
    }
    Err(EngineError::ExecutorNotFound(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_executor_rejected() {
        let err = tokio::runtime::Runtime::new()
            .unwrap()
            .block_on(run_executor("vim", "prompt", "input"))
            .unwrap_err();
        assert_eq!(err.to_string(), "executor must be one of: codex, claude");
    }

    #[test]
    fn test_resolve_executor_finds_binaries_on_path() {
        // `sh` exists on any unix host this suite runs on.
        let path_var = std::env::var_os("PATH").unwrap_or_default();
        let found = std::env::split_paths(&path_var).any(|dir| dir.join("sh").is_file());
        if found {
            let resolved = resolve_executor("sh").unwrap();
            assert!(resolved.ends_with("/sh"));
        }
    }

    #[test]
    fn test_resolve_executor_reports_missing_binary() {
        let err = resolve_executor("definitely-not-a-real-binary-4f2a").unwrap_err();
        assert!(err.to_string().contains("not found on PATH"));
    }
}
