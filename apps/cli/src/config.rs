//! Config file loading and command-line overrides.

use sshdeploy_core::{DeployConfig, DeployError};

use crate::cli::Cli;

/// Loads the config file named on the command line and applies overrides.
pub fn load(cli: &Cli) -> Result<DeployConfig, DeployError> {
    let mut config = DeployConfig::load(&cli.config)?;
    apply_overrides(&mut config, cli, |var| std::env::var(var).ok())?;
    tracing::debug!(path = %cli.config.display(), host = %config.auth.host, "configuration loaded");
    Ok(config)
}

/// Command-line values win over the file. `env` looks up the password
/// variable.
pub fn apply_overrides(
    config: &mut DeployConfig,
    cli: &Cli,
    env: impl Fn(&str) -> Option<String>,
) -> Result<(), DeployError> {
    if let Some(host) = &cli.host {
        config.auth.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.auth.port = port;
    }
    if let Some(user) = &cli.user {
        config.auth.username = Some(user.clone());
    }
    if let Some(var) = &cli.password_env {
        let password = env(var).ok_or_else(|| {
            DeployError::Config(format!("environment variable {var} is not set"))
        })?;
        config.auth.password = Some(password);
    }
    if cli.silent {
        config.silent = true;
    }
    Ok(())
}
