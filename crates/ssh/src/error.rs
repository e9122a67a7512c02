//! Error types for the SSH transport.

use sshdeploy_core::DeployError;

/// Errors produced by the SSH transport.
#[derive(Debug, thiserror::Error)]
pub enum SshError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ssh error: {0}")]
    Ssh(#[from] ssh2::Error),

    #[error("cannot resolve {0}")]
    Resolve(String),

    #[error("connection to {addr} timed out")]
    Timeout { addr: String },

    #[error("authentication failed for {user}@{host}: {reason}")]
    AuthFailed {
        user: String,
        host: String,
        reason: String,
    },

    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("session already closed")]
    Closed,
}

impl From<SshError> for DeployError {
    fn from(err: SshError) -> Self {
        DeployError::transport(err)
    }
}
