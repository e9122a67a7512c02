//! SSH/SFTP transport for deployments.
//!
//! Implements the `sshdeploy_core` session traits on top of libssh2:
//! commands run over exec channels, files go over one shared SFTP
//! channel. libssh2 is blocking, so every call hops onto
//! `tokio::task::spawn_blocking`.

pub mod connect;
pub mod error;
pub mod session;

pub use connect::SshConnector;
pub use error::SshError;
pub use session::SshSession;

use std::time::Duration;

use sshdeploy_core::{DeployConfig, DeployError, DeployOrchestrator};

/// Handshake and authentication deadline when the config sets none.
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_millis(20_000);

/// Sleep between polls of an exec channel with no pending output.
pub const EXEC_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Read/copy buffer size (32 KB, the SFTP packet payload limit).
pub const COPY_BUFFER_SIZE: usize = 32 * 1024;

/// Mode for directories created on the remote host.
pub const DIR_MODE: i32 = 0o755;

/// Runs one deployment over SSH, logging to stdout.
pub async fn deploy(config: &DeployConfig) -> Result<(), DeployError> {
    DeployOrchestrator::new().deploy(config, &SshConnector).await
}
