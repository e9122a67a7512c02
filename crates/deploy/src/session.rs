//! Remote session traits.
//!
//! The SSH transport crate implements these on top of libssh2. Keeping
//! the deploy logic behind traits decouples it from the transport and
//! makes every phase testable with mocks.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use tokio::sync::mpsc::UnboundedSender;

use crate::config::AuthConfig;
use crate::error::DeployError;
use crate::types::OutputChunk;

/// Future returned by every remote operation.
pub type SessionFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, DeployError>> + Send + 'a>>;

/// Directory queries and creation on the remote host.
pub trait RemoteFs: Send + Sync {
    /// Whether `path` can be opened as a directory.
    ///
    /// `Ok(false)` means the server answered and the directory is not
    /// there (or is not a directory). `Err` is reserved for transport
    /// failures.
    fn dir_exists<'a>(&'a self, path: &'a str) -> SessionFuture<'a, bool>;

    /// Creates a single directory. Parents must already exist.
    fn mkdir<'a>(&'a self, path: &'a str) -> SessionFuture<'a, ()>;
}

/// An authenticated connection to the deploy target.
pub trait RemoteSession: RemoteFs {
    /// Uploads the content of `local` to `remote`, returning bytes written.
    fn upload<'a>(&'a self, local: &'a Path, remote: &'a str) -> SessionFuture<'a, u64>;

    /// Runs `command` in a remote shell.
    ///
    /// Output is pushed to `output` chunk by chunk as it arrives; the
    /// sender is dropped when the remote stream closes. Resolves to the
    /// exit status if the server reported one.
    fn exec<'a>(
        &'a self,
        command: &'a str,
        output: UnboundedSender<OutputChunk>,
    ) -> SessionFuture<'a, Option<i32>>;

    /// Disconnects.
    fn close(&self) -> SessionFuture<'_, ()>;
}

/// Opens remote sessions.
pub trait Connector: Send + Sync {
    fn connect<'a>(&'a self, auth: &'a AuthConfig) -> SessionFuture<'a, Box<dyn RemoteSession>>;
}
