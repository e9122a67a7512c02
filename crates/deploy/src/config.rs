//! Deployment configuration.
//!
//! A config can be built in code or parsed from TOML/JSON. Keys are
//! snake_case; the camelCase spellings (`localFiles`, `remotePath`,
//! `preDeploy`, `postDeploy`) are accepted as aliases.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::DeployError;

/// Connection and authentication parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthConfig {
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Also the sole answer to keyboard-interactive challenges.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    #[serde(
        default,
        alias = "privateKey",
        skip_serializing_if = "Option::is_none"
    )]
    pub private_key: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passphrase: Option<String>,

    /// Try the local ssh-agent.
    #[serde(default)]
    pub agent: bool,

    #[serde(
        default,
        alias = "readyTimeout",
        skip_serializing_if = "Option::is_none"
    )]
    pub ready_timeout_ms: Option<u64>,

    /// Transport options this crate does not interpret.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

fn default_port() -> u16 {
    22
}

impl AuthConfig {
    /// Minimal auth config for `host` on port 22.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: default_port(),
            username: None,
            password: None,
            private_key: None,
            passphrase: None,
            agent: false,
            ready_timeout_ms: None,
            extra: BTreeMap::new(),
        }
    }
}

/// Which local files to upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LocalFiles {
    /// One glob pattern; relative directory structure is kept.
    Pattern(String),
    /// Explicit paths; uploaded flat into the remote base.
    List(Vec<String>),
}

/// Everything one deployment needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeployConfig {
    pub auth: AuthConfig,

    #[serde(default, alias = "localFiles", skip_serializing_if = "Option::is_none")]
    pub local_files: Option<LocalFiles>,

    #[serde(default, alias = "remotePath", skip_serializing_if = "Option::is_none")]
    pub remote_path: Option<String>,

    #[serde(default, alias = "preDeploy", skip_serializing_if = "Option::is_none")]
    pub pre_deploy: Option<Vec<String>>,

    #[serde(default, alias = "postDeploy", skip_serializing_if = "Option::is_none")]
    pub post_deploy: Option<Vec<String>>,

    /// Suppresses the deployment log sink.
    #[serde(default)]
    pub silent: bool,
}

impl DeployConfig {
    /// A config that deploys nothing yet; fill in files or commands.
    pub fn new(auth: AuthConfig) -> Self {
        Self {
            auth,
            local_files: None,
            remote_path: None,
            pre_deploy: None,
            post_deploy: None,
            silent: false,
        }
    }

    /// Parses a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, DeployError> {
        toml::from_str(content).map_err(|e| DeployError::Config(e.to_string()))
    }

    /// Parses a JSON document.
    pub fn from_json_str(content: &str) -> Result<Self, DeployError> {
        serde_json::from_str(content).map_err(|e| DeployError::Config(e.to_string()))
    }

    /// Loads a config file; `.json` files are JSON, everything else TOML.
    pub fn load(path: &Path) -> Result<Self, DeployError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            DeployError::Config(format!("cannot read {}: {e}", path.display()))
        })?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let config = if is_json {
            Self::from_json_str(&content)?
        } else {
            Self::from_toml_str(&content)?
        };

        tracing::debug!(path = %path.display(), "deploy config loaded");
        Ok(config)
    }

    /// Checks the invariants that must hold before any connection is made.
    pub fn validate(&self) -> Result<(), DeployError> {
        if self.auth.host.trim().is_empty() {
            return Err(DeployError::Config("auth.host is required".into()));
        }

        if self.local_files.is_none() && self.pre_deploy.is_none() && self.post_deploy.is_none()
        {
            return Err(DeployError::Config(
                "nothing to deploy: set localFiles, preDeploy or postDeploy".into(),
            ));
        }

        if self.local_files.is_some() {
            match self.remote_path.as_deref() {
                None => {
                    return Err(DeployError::Config(
                        "remotePath is required when localFiles is set".into(),
                    ));
                }
                Some(p) if p.trim().is_empty() => {
                    return Err(DeployError::Config("remotePath must not be empty".into()));
                }
                Some(_) => {}
            }
        }

        Ok(())
    }
}
