//! Runs one deployment for the parsed command line.

use sshdeploy_core::{DeployError, DeployOrchestrator};
use sshdeploy_ssh::SshConnector;

use crate::cli::Cli;
use crate::config;

pub async fn run(cli: &Cli) -> Result<(), DeployError> {
    let config = config::load(cli)?;

    let mut orchestrator = DeployOrchestrator::new();
    let mut events = orchestrator.take_events();

    let result = orchestrator.deploy(&config, &SshConnector).await;

    if let Some(rx) = events.as_mut() {
        while let Ok(event) = rx.try_recv() {
            tracing::debug!(?event, "deploy event");
        }
    }
    result
}

/// Process exit code for a failed run.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<DeployError>() {
        Some(DeployError::Config(_)) => 2,
        _ => 1,
    }
}
