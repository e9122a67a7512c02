//! File deployment over a remote shell session.
//!
//! This crate implements the **deploy logic**: it has no network code.
//! A transport crate provides [`Connector`] and [`RemoteSession`]
//! implementations; everything here runs against those traits.
//!
//! # Pipeline
//!
//! 1. **Validate** — reject configs with nothing to do
//! 2. **Connect** — open one authenticated session
//! 3. **preDeploy** — run commands in order
//! 4. **Transfer** — resolve local files, ensure remote directories, upload
//! 5. **postDeploy** — run commands in order
//! 6. **Close** — always, exactly once, when a session was opened

pub mod command;
pub mod config;
pub mod deploy;
pub mod error;
pub mod logger;
pub mod remote_dir;
pub mod resolver;
pub mod session;
pub mod transfer;
pub mod types;

#[cfg(test)]
mod mock;

// Re-export primary types for convenience.
pub use command::run_command;
pub use config::{AuthConfig, DeployConfig, LocalFiles};
pub use deploy::DeployOrchestrator;
pub use error::{BoxError, DeployError};
pub use logger::{DeployLogger, LogSink};
pub use remote_dir::RemoteDirectoryEnsurer;
pub use resolver::resolve;
pub use session::{Connector, RemoteFs, RemoteSession, SessionFuture};
pub use transfer::transfer_all;
pub use types::{DeployEvent, FilePathPair, OutputChunk, Phase};
