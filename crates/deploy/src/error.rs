//! Deploy error types.

/// Boxed cause carried by transport failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors produced during a deployment.
///
/// Each variant names the kind of failure so callers can branch on it
/// instead of inspecting messages. The orchestrator returns these unchanged.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("config error: {0}")]
    Config(String),

    #[error("transport error: {0}")]
    Transport(#[source] BoxError),

    #[error("{0}")]
    Path(String),

    #[error("command `{command}` wrote to stderr: {stderr}")]
    Command { command: String, stderr: String },

    #[error("glob error: {0}")]
    Glob(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DeployError {
    /// Wraps any transport-level failure, keeping the original cause.
    pub fn transport(err: impl Into<BoxError>) -> Self {
        Self::Transport(err.into())
    }

    /// Short tag naming the error kind (for logs and exit codes).
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Transport(_) => "transport",
            Self::Path(_) => "path",
            Self::Command { .. } => "command",
            Self::Glob(_) => "glob",
            Self::Io(_) => "io",
        }
    }

    /// Accumulated stderr for a failed command.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            Self::Command { stderr, .. } => Some(stderr),
            _ => None,
        }
    }
}

impl From<glob::PatternError> for DeployError {
    fn from(err: glob::PatternError) -> Self {
        Self::Glob(err.to_string())
    }
}

impl From<glob::GlobError> for DeployError {
    fn from(err: glob::GlobError) -> Self {
        Self::Glob(err.to_string())
    }
}
