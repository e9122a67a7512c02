//! Deploy orchestrator.
//!
//! Runs one deployment end to end: validate, connect, preDeploy
//! commands, file transfer, postDeploy commands, close. Every phase is
//! sequential and the first failure aborts everything after it. The
//! session is closed exactly once whenever it was opened.

use tokio::sync::mpsc;
use tracing::{Instrument, error, info, info_span, warn};

use crate::command::run_command;
use crate::config::DeployConfig;
use crate::error::DeployError;
use crate::logger::DeployLogger;
use crate::resolver::resolve;
use crate::session::{Connector, RemoteSession};
use crate::transfer::transfer_all;
use crate::types::{DeployEvent, Phase};

/// Orchestrates deployments and reports their progress as events.
pub struct DeployOrchestrator {
    logger: DeployLogger,
    /// Set once a receiver has been handed out; events are dropped before.
    events_tx: Option<mpsc::UnboundedSender<DeployEvent>>,
}

impl Default for DeployOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl DeployOrchestrator {
    /// Creates an orchestrator that logs to stdout.
    pub fn new() -> Self {
        Self::with_logger(DeployLogger::stdout())
    }

    pub fn with_logger(logger: DeployLogger) -> Self {
        Self {
            logger,
            events_tx: None,
        }
    }

    /// Takes the event receiver. Can only be called once.
    ///
    /// Only events emitted after this call are delivered.
    pub fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<DeployEvent>> {
        if self.events_tx.is_some() {
            return None;
        }
        let (tx, rx) = mpsc::unbounded_channel();
        self.events_tx = Some(tx);
        Some(rx)
    }

    /// Runs one deployment through `connector`.
    ///
    /// Returns the error of the failing phase unchanged.
    pub async fn deploy(
        &self,
        config: &DeployConfig,
        connector: &dyn Connector,
    ) -> Result<(), DeployError> {
        let span = info_span!(
            "deploy",
            id = %uuid::Uuid::new_v4(),
            host = %config.auth.host,
            port = config.auth.port,
        );
        self.deploy_inner(config, connector).instrument(span).await
    }

    async fn deploy_inner(
        &self,
        config: &DeployConfig,
        connector: &dyn Connector,
    ) -> Result<(), DeployError> {
        let logger = if config.silent {
            DeployLogger::silent()
        } else {
            self.logger.clone()
        };

        self.enter(Phase::Validating);
        if let Err(e) = config.validate() {
            return Err(self.fail(Phase::Validating, e));
        }
        self.leave(Phase::Validating);

        self.enter(Phase::Connecting);
        let session = match connector.connect(&config.auth).await {
            Ok(session) => session,
            Err(e) => return Err(self.fail(Phase::Connecting, e)),
        };
        self.leave(Phase::Connecting);
        info!("session ready");

        let outcome = self.run_phases(session.as_ref(), config, &logger).await;

        self.enter(Phase::Closing);
        match session.close().await {
            Ok(()) => self.leave(Phase::Closing),
            Err(e) => warn!(error = %e, "failed to close session"),
        }

        match outcome {
            Ok(()) => {
                info!("deploy completed");
                self.emit(DeployEvent::Completed);
                Ok(())
            }
            Err((phase, e)) => Err(self.fail(phase, e)),
        }
    }

    /// Everything between connect and close.
    async fn run_phases(
        &self,
        session: &dyn RemoteSession,
        config: &DeployConfig,
        logger: &DeployLogger,
    ) -> Result<(), (Phase, DeployError)> {
        if let Some(commands) = &config.pre_deploy {
            self.run_commands(session, Phase::PreDeploy, commands, logger)
                .await
                .map_err(|e| (Phase::PreDeploy, e))?;
        }

        if let (Some(files), Some(remote_path)) = (&config.local_files, &config.remote_path) {
            self.enter(Phase::Transfer);
            let pairs = resolve(files, remote_path).map_err(|e| (Phase::Transfer, e))?;
            info!(files = pairs.len(), remote = %remote_path, "transferring files");
            transfer_all(session, &pairs, logger, self.events_tx.as_ref())
                .await
                .map_err(|e| (Phase::Transfer, e))?;
            self.leave(Phase::Transfer);
        }

        if let Some(commands) = &config.post_deploy {
            self.run_commands(session, Phase::PostDeploy, commands, logger)
                .await
                .map_err(|e| (Phase::PostDeploy, e))?;
        }

        Ok(())
    }

    async fn run_commands(
        &self,
        session: &dyn RemoteSession,
        phase: Phase,
        commands: &[String],
        logger: &DeployLogger,
    ) -> Result<(), DeployError> {
        self.enter(phase);
        for command in commands {
            run_command(session, command, logger).await?;
            self.emit(DeployEvent::CommandFinished {
                phase,
                command: command.clone(),
            });
        }
        self.leave(phase);
        Ok(())
    }

    fn emit(&self, event: DeployEvent) {
        if let Some(tx) = &self.events_tx {
            let _ = tx.send(event);
        }
    }

    fn enter(&self, phase: Phase) {
        self.emit(DeployEvent::PhaseStarted(phase));
    }

    fn leave(&self, phase: Phase) {
        self.emit(DeployEvent::PhaseCompleted(phase));
    }

    fn fail(&self, phase: Phase, err: DeployError) -> DeployError {
        error!(phase = %phase, kind = err.kind(), error = %err, "deploy failed");
        self.emit(DeployEvent::Failed {
            phase,
            error: err.to_string(),
        });
        err
    }
}
