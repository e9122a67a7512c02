//! Deployment log sink.
//!
//! Remote stdout and file progress lines go to a `DeployLogger` handed to
//! each component, so concurrent deployments never share a sink.

use std::fmt;
use std::io::Write;
use std::sync::Arc;

/// Callback receiving one message at a time, in production order.
pub type LogSink = Arc<dyn Fn(&str) + Send + Sync>;

/// Cheaply clonable handle to a log sink.
#[derive(Clone)]
pub struct DeployLogger {
    sink: Option<LogSink>,
}

impl DeployLogger {
    /// Writes every message to standard output.
    pub fn stdout() -> Self {
        Self::from_fn(|msg| {
            let mut out = std::io::stdout().lock();
            let _ = if msg.ends_with('\n') {
                out.write_all(msg.as_bytes())
            } else {
                writeln!(out, "{msg}")
            };
            let _ = out.flush();
        })
    }

    /// Drops every message.
    pub fn silent() -> Self {
        Self { sink: None }
    }

    pub fn from_fn(f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        Self {
            sink: Some(Arc::new(f)),
        }
    }

    pub fn is_silent(&self) -> bool {
        self.sink.is_none()
    }

    pub fn log(&self, msg: &str) {
        if let Some(sink) = &self.sink {
            sink(msg);
        }
    }
}

impl Default for DeployLogger {
    fn default() -> Self {
        Self::stdout()
    }
}

impl fmt::Debug for DeployLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeployLogger")
            .field("silent", &self.is_silent())
            .finish()
    }
}
