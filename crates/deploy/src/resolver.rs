//! Local-to-remote path resolution.
//!
//! A glob pattern keeps the tail of each matched path below the
//! "last common slash index"; an explicit list is flattened into the
//! remote base by file name.

use std::path::{Path, PathBuf};

use crate::config::LocalFiles;
use crate::error::DeployError;
use crate::types::FilePathPair;

/// Resolves `files` against `remote_base`.
pub fn resolve(files: &LocalFiles, remote_base: &str) -> Result<Vec<FilePathPair>, DeployError> {
    match files {
        LocalFiles::Pattern(pattern) => {
            let matches = expand_glob(pattern)?;
            tracing::debug!(pattern = %pattern, matched = matches.len(), "glob expanded");
            Ok(map_glob_matches(&matches, remote_base))
        }
        LocalFiles::List(paths) => map_explicit_list(paths, remote_base),
    }
}

/// Expands `pattern` into absolute paths of regular files, sorted.
pub fn expand_glob(pattern: &str) -> Result<Vec<PathBuf>, DeployError> {
    let mut files = Vec::new();
    for entry in glob::glob(pattern)? {
        let path = entry?;
        if path.is_file() {
            files.push(std::path::absolute(&path)?);
        }
    }
    files.sort();
    Ok(files)
}

/// Maps glob matches onto `remote_base`.
///
/// The cut point is the minimum, over all matches, of each path's own
/// last `/` offset. This is a character offset, not a common prefix:
/// files at different depths keep different amounts of their tail.
pub fn map_glob_matches(matches: &[PathBuf], remote_base: &str) -> Vec<FilePathPair> {
    let normalized: Vec<String> = matches.iter().map(|p| slash_path(p)).collect();

    let Some(cut) = normalized.iter().map(|p| p.rfind('/').unwrap_or(0)).min() else {
        return Vec::new();
    };

    let base = trim_base(remote_base);
    matches
        .iter()
        .zip(&normalized)
        .map(|(local, path)| {
            let tail = path.get(cut..).unwrap_or_default();
            FilePathPair::new(local.clone(), format!("{base}{tail}"))
        })
        .collect()
}

/// Maps explicit paths to `remote_base/<file name>`.
pub fn map_explicit_list(
    paths: &[String],
    remote_base: &str,
) -> Result<Vec<FilePathPair>, DeployError> {
    let base = trim_base(remote_base);
    paths
        .iter()
        .map(|p| {
            let local = std::path::absolute(Path::new(p))?;
            let name = local
                .file_name()
                .ok_or_else(|| DeployError::Config(format!("not a file path: {p}")))?;
            let remote = format!("{base}/{}", name.to_string_lossy());
            Ok(FilePathPair::new(local, remote))
        })
        .collect()
}

/// Path as a string with `/` separators.
fn slash_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Strips trailing slashes so joins never produce `//`.
fn trim_base(remote_base: &str) -> &str {
    remote_base.trim_end_matches('/')
}
