//! Remote command execution.
//!
//! Stdout is forwarded to the deployment log as it arrives. Stderr is
//! collected, and a command fails if and only if it wrote anything to
//! stderr; the exit status is logged but never consulted.

use tokio::sync::mpsc;
use tracing::debug;

use crate::error::DeployError;
use crate::logger::DeployLogger;
use crate::session::RemoteSession;
use crate::types::OutputChunk;

/// Runs `command` and judges it by its stderr output.
pub async fn run_command<S>(
    session: &S,
    command: &str,
    logger: &DeployLogger,
) -> Result<(), DeployError>
where
    S: RemoteSession + ?Sized,
{
    debug!(command = %command, "running remote command");

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut stderr = Vec::new();

    let exec = session.exec(command, tx);
    let drain = async {
        while let Some(chunk) = rx.recv().await {
            match chunk {
                OutputChunk::Stdout(data) => logger.log(&String::from_utf8_lossy(&data)),
                OutputChunk::Stderr(data) => stderr.extend_from_slice(&data),
            }
        }
    };

    let (status, ()) = tokio::join!(exec, drain);
    let status = status?;

    debug!(command = %command, exit_status = ?status, stderr_bytes = stderr.len(), "remote command closed");

    if stderr.is_empty() {
        Ok(())
    } else {
        Err(DeployError::Command {
            command: command.to_string(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
        })
    }
}
