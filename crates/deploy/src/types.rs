//! Data types for the deploy flow.

use std::fmt;
use std::path::PathBuf;

/// A local file and the remote path it is uploaded to.
///
/// Built once by the resolver; never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePathPair {
    pub local: PathBuf,
    pub remote: String,
}

impl FilePathPair {
    pub fn new(local: impl Into<PathBuf>, remote: impl Into<String>) -> Self {
        Self {
            local: local.into(),
            remote: remote.into(),
        }
    }

    /// Parent directory of the remote path (`/` for top-level files).
    pub fn remote_dir(&self) -> &str {
        match self.remote.rfind('/') {
            Some(0) => "/",
            Some(idx) => &self.remote[..idx],
            None => ".",
        }
    }
}

/// A piece of remote command output, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputChunk {
    Stdout(Vec<u8>),
    Stderr(Vec<u8>),
}

/// Sequential stage of one deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Validating,
    Connecting,
    PreDeploy,
    Transfer,
    PostDeploy,
    Closing,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Validating => "validating",
            Self::Connecting => "connecting",
            Self::PreDeploy => "preDeploy",
            Self::Transfer => "transfer",
            Self::PostDeploy => "postDeploy",
            Self::Closing => "closing",
        };
        f.write_str(name)
    }
}

/// Progress event emitted during deployment.
///
/// Events are informational; they never change the outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum DeployEvent {
    PhaseStarted(Phase),
    PhaseCompleted(Phase),
    /// A remote command finished without writing to stderr.
    CommandFinished { phase: Phase, command: String },
    FileCopied { local: PathBuf, remote: String },
    /// The deployment failed in `phase`.
    Failed { phase: Phase, error: String },
    Completed,
}
