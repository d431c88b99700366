use crate::core::command::LaunchCommand;
use crate::domain::model::ExitOutcome;
use crate::domain::ports::Launcher;
use crate::utils::error::{LaunchError, Result};
use async_trait::async_trait;
use std::sync::Mutex;
use tokio::process::Command;

/// Spawns the launch tool as a child process sharing this terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessLauncher;

impl ProcessLauncher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Launcher for ProcessLauncher {
    async fn launch(&self, command: &LaunchCommand) -> Result<ExitOutcome> {
        tracing::debug!("Spawning: {}", command.display());

        let status = Command::new(&command.program)
            .args(command.args())
            .envs(command.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .status()
            .await
            .map_err(|source| LaunchError::SpawnError {
                program: command.program.clone(),
                source,
            })?;

        let outcome = ExitOutcome::from(status);
        tracing::debug!("Launcher on port {} finished: {:?}", command.master_port, outcome);
        Ok(outcome)
    }
}

/// Records commands instead of running them; every launch "succeeds".
#[derive(Debug, Default)]
pub struct DryRunLauncher {
    issued: Mutex<Vec<LaunchCommand>>,
}

impl DryRunLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issued(&self) -> Vec<LaunchCommand> {
        self.issued
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Launcher for DryRunLauncher {
    async fn launch(&self, command: &LaunchCommand) -> Result<ExitOutcome> {
        tracing::info!("🔍 Would run: {}", command.display());
        if let Ok(mut issued) = self.issued.lock() {
            issued.push(command.clone());
        }
        Ok(ExitOutcome::Success)
    }
}
