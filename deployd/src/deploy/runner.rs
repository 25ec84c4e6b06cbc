//! Child-process supervisor for deploy commands
//!
//! Runs the build tool as a child process, accumulating stdout and stderr
//! while mirroring each chunk to the service log as it arrives. The runner
//! reports outcomes only through its return value; it has no access to any
//! HTTP response, which by the time a deploy runs has already been sent.

use std::fmt;
use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{error, info, warn};

/// Result of a finished deploy command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutcome {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Ways a deploy command can fail
#[derive(Error, Debug)]
pub enum RunError {
    /// The command could not be started at all
    #[error("failed to start `{command}`: {message}")]
    SpawnFailed { command: String, message: String },

    /// The command started but its exit status could not be collected
    #[error("failed to await `{command}`: {message}")]
    WaitFailed { command: String, message: String },

    /// The command ran and exited nonzero; captured output is preserved
    /// for post-mortem logging
    #[error("`{command}` exited with code {exit_code}")]
    ProcessFailed {
        command: String,
        exit_code: i32,
        stdout: String,
        stderr: String,
    },
}

/// Executes a deploy command to completion
#[async_trait]
pub trait DeployRunner: Send + Sync {
    async fn run(
        &self,
        command: &str,
        args: &[String],
        cwd: &Path,
    ) -> Result<ProcessOutcome, RunError>;
}

/// Real runner backed by `tokio::process`
pub struct CommandRunner;

#[async_trait]
impl DeployRunner for CommandRunner {
    async fn run(
        &self,
        command: &str,
        args: &[String],
        cwd: &Path,
    ) -> Result<ProcessOutcome, RunError> {
        info!("Running `{}` {:?} in {}", command, args, cwd.display());

        let mut child = Command::new(command)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| RunError::SpawnFailed {
                command: command.to_string(),
                message: e.to_string(),
            })?;

        let stdout = child.stdout.take().ok_or_else(|| RunError::SpawnFailed {
            command: command.to_string(),
            message: "stdout pipe unavailable".to_string(),
        })?;
        let stderr = child.stderr.take().ok_or_else(|| RunError::SpawnFailed {
            command: command.to_string(),
            message: "stderr pipe unavailable".to_string(),
        })?;

        let (stdout, stderr, status) = tokio::join!(
            collect_stream(stdout, StreamKind::Stdout, command),
            collect_stream(stderr, StreamKind::Stderr, command),
            child.wait(),
        );

        let status = status.map_err(|e| RunError::WaitFailed {
            command: command.to_string(),
            message: e.to_string(),
        })?;

        // None means the process was killed by a signal
        let exit_code = status.code().unwrap_or(-1);
        info!("`{}` exited with code {}", command, exit_code);

        if status.success() {
            Ok(ProcessOutcome {
                exit_code,
                stdout,
                stderr,
            })
        } else {
            Err(RunError::ProcessFailed {
                command: command.to_string(),
                exit_code,
                stdout,
                stderr,
            })
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum StreamKind {
    Stdout,
    Stderr,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamKind::Stdout => write!(f, "stdout"),
            StreamKind::Stderr => write!(f, "stderr"),
        }
    }
}

/// Accumulate a stream to EOF, mirroring each chunk to the service log.
///
/// Accumulation is byte-wise and converted once at EOF, so a multibyte
/// sequence split across read boundaries survives intact; only the mirrored
/// log line uses a per-chunk lossy conversion.
async fn collect_stream<R>(mut reader: R, kind: StreamKind, command: &str) -> String
where
    R: AsyncRead + Unpin,
{
    let mut collected: Vec<u8> = Vec::new();
    let mut buf = [0u8; 8192];

    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                let chunk = String::from_utf8_lossy(&buf[..n]);
                match kind {
                    StreamKind::Stdout => info!("[{}] {}", command, chunk.trim_end()),
                    StreamKind::Stderr => warn!("[{}] {}", command, chunk.trim_end()),
                }
                collected.extend_from_slice(&buf[..n]);
            }
            Err(e) => {
                error!("Error reading {} of `{}`: {}", kind, command, e);
                break;
            }
        }
    }

    String::from_utf8_lossy(&collected).into_owned()
}
