use crate::core::command::LaunchCommand;
use crate::domain::model::ExitOutcome;
use crate::utils::error::Result;
use async_trait::async_trait;

/// Runs the external distributed-launch tool once and reports how it exited.
///
/// A tool that could not be started at all is an `Err`, not a failed outcome:
/// trying another port will not help.
#[async_trait]
pub trait Launcher: Send + Sync {
    async fn launch(&self, command: &LaunchCommand) -> Result<ExitOutcome>;
}

/// Asks the operator whether to keep searching after a failed launch.
#[async_trait]
pub trait Confirm: Send {
    async fn confirm(&mut self, message: &str) -> Result<bool>;
}

#[async_trait]
impl<C: Confirm + ?Sized> Confirm for &mut C {
    async fn confirm(&mut self, message: &str) -> Result<bool> {
        (**self).confirm(message).await
    }
}

/// Pre-flight check for whether a port can still be bound locally.
pub trait PortCheck: Send + Sync {
    fn is_available(&self, port: u16) -> bool;
}
