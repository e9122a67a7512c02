//! Remote directory creation.
//!
//! Finds the deepest ancestor of a remote directory that already exists
//! and creates only the missing suffix, one level at a time.

use std::collections::HashSet;

use tracing::debug;

use crate::error::DeployError;
use crate::session::RemoteFs;

/// Ensures remote directories exist, remembering the ones it has seen.
///
/// One instance lives for a single deployment.
#[derive(Debug, Default)]
pub struct RemoteDirectoryEnsurer {
    known: HashSet<String>,
}

impl RemoteDirectoryEnsurer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes sure `dir` exists on the remote host.
    ///
    /// Fails with [`DeployError::Path`] when no ancestor (including `dir`
    /// itself) can be opened. Errors from `mkdir` and transport errors
    /// while checking are propagated as-is.
    pub async fn ensure<F>(&mut self, fs: &F, dir: &str) -> Result<(), DeployError>
    where
        F: RemoteFs + ?Sized,
    {
        if self.known.contains(dir) {
            return Ok(());
        }

        let chain = ancestor_chain(dir);

        let mut existing = None;
        for (depth, candidate) in chain.iter().enumerate().rev() {
            if self.known.contains(candidate) || fs.dir_exists(candidate).await? {
                existing = Some(depth);
                break;
            }
        }

        let Some(depth) = existing else {
            return Err(DeployError::Path(format!("Incorrect remotePath: {dir}")));
        };

        for missing in &chain[depth + 1..] {
            debug!(dir = %missing, "creating remote directory");
            fs.mkdir(missing).await?;
        }

        self.known.extend(chain);
        Ok(())
    }
}

/// Prefixes of `dir`, shallowest first.
///
/// `/a/b/c` gives `["/", "/a", "/a/b", "/a/b/c"]`; `a/b` gives
/// `["a", "a/b"]`. Empty segments from repeated or trailing slashes are
/// skipped.
fn ancestor_chain(dir: &str) -> Vec<String> {
    let absolute = dir.starts_with('/');
    let mut chain = Vec::new();
    let mut current = String::new();

    if absolute {
        chain.push("/".to_string());
    }

    for segment in dir.split('/').filter(|s| !s.is_empty()) {
        if absolute || !current.is_empty() {
            current.push('/');
        }
        current.push_str(segment);
        chain.push(current.clone());
    }

    chain
}
