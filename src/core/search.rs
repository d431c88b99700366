use crate::core::plan::LaunchPlan;
use crate::core::port_range::TcpPortCheck;
use crate::domain::model::{Attempt, ExitOutcome, SearchOutcome, SearchStatus};
use crate::domain::ports::{Confirm, Launcher, PortCheck};
use crate::utils::error::Result;
use chrono::Utc;
use std::time::Instant;

/// Walks the plan's port range, launching once per port until one run exits
/// cleanly, the range runs out, or the operator stops the search.
pub struct PortSearch<L, C, P = TcpPortCheck> {
    launcher: L,
    confirm: C,
    port_check: P,
}

impl<L: Launcher, C: Confirm> PortSearch<L, C, TcpPortCheck> {
    pub fn new(launcher: L, confirm: C) -> Self {
        Self {
            launcher,
            confirm,
            port_check: TcpPortCheck,
        }
    }
}

impl<L: Launcher, C: Confirm, P: PortCheck> PortSearch<L, C, P> {
    pub fn with_port_check<Q: PortCheck>(self, port_check: Q) -> PortSearch<L, C, Q> {
        PortSearch {
            launcher: self.launcher,
            confirm: self.confirm,
            port_check,
        }
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    pub async fn run(&mut self, plan: &LaunchPlan) -> Result<SearchOutcome> {
        let range = plan.ports;
        let total = range.len();
        let mut attempts = Vec::new();
        let mut prompts_shown = 0;
        let mut status = SearchStatus::Exhausted;
        let mut selected_port = None;

        tracing::info!(
            "🚀 Launching {} process(es) per node on devices [{}], ports {}",
            plan.nproc_per_node(),
            plan.devices,
            range
        );

        let mut ports = range.iter().enumerate();
        let mut next = self.next_candidate(&mut ports, plan, &mut attempts);
        while let Some((index, port)) = next.take() {
            let command = plan.command_for(port);
            tracing::info!("🔌 Trying master port {} ({}/{})", port, index + 1, total);

            let started_at = Utc::now();
            let timer = Instant::now();
            let outcome = self.launcher.launch(&command).await?;
            attempts.push(Attempt {
                port,
                outcome: outcome.into(),
                started_at,
                elapsed_ms: u64::try_from(timer.elapsed().as_millis()).unwrap_or(u64::MAX),
            });

            match outcome {
                ExitOutcome::Success => {
                    tracing::info!("✅ Launch on port {} finished successfully", port);
                    status = SearchStatus::Found;
                    selected_port = Some(port);
                    break;
                }
                ExitOutcome::Signaled => {
                    tracing::warn!("🛑 Launch on port {} was terminated by a signal", port);
                    status = SearchStatus::Interrupted;
                    break;
                }
                ExitOutcome::Failed { code } => {
                    tracing::warn!(
                        "❌ Launch on port {} exited with code {} (port in use or startup failure)",
                        port,
                        code
                    );

                    // No prompt when nothing launchable is left.
                    next = self.next_candidate(&mut ports, plan, &mut attempts);
                    if next.is_none() {
                        break;
                    }

                    if plan.prompt_policy.should_prompt(prompts_shown) {
                        prompts_shown += 1;
                        let message = format!(
                            "Launch failed on port {} (exit code {}). \
                             Press Enter to keep searching, or Ctrl-C to abort.",
                            port, code
                        );
                        if !self.confirm.confirm(&message).await? {
                            tracing::info!("Operator stopped the port search");
                            status = SearchStatus::Declined;
                            break;
                        }
                    }
                }
            }
        }

        if status == SearchStatus::Exhausted {
            tracing::error!("No usable master port found in {}", range);
        }

        Ok(SearchOutcome {
            status,
            selected_port,
            nproc_per_node: plan.nproc_per_node(),
            range,
            attempts,
            prompts_shown,
        })
    }

    /// Advances to the next port worth launching on, recording busy ports
    /// skipped along the way.
    fn next_candidate<I>(
        &self,
        ports: &mut I,
        plan: &LaunchPlan,
        attempts: &mut Vec<Attempt>,
    ) -> Option<(usize, u16)>
    where
        I: Iterator<Item = (usize, u16)>,
    {
        for (index, port) in ports.by_ref() {
            if plan.skip_busy_ports && !self.port_check.is_available(port) {
                tracing::warn!("⏭️ Port {} is already in use, skipping", port);
                attempts.push(Attempt::skipped(port));
                continue;
            }
            return Some((index, port));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::command::LaunchCommand;
    use crate::core::devices::DeviceList;
    use crate::core::port_range::PortRange;
    use crate::core::prompt::{AutoConfirm, PromptPolicy};
    use crate::domain::model::AttemptOutcome;
    use async_trait::async_trait;

    struct FailUntil {
        succeed_on: Option<u16>,
    }

    #[async_trait]
    impl Launcher for FailUntil {
        async fn launch(&self, command: &LaunchCommand) -> Result<ExitOutcome> {
            match self.succeed_on {
                Some(port) if command.master_port >= port => Ok(ExitOutcome::Success),
                _ => Ok(ExitOutcome::Failed { code: 1 }),
            }
        }
    }

    fn plan(start: u16, end: u16) -> LaunchPlan {
        let mut plan = LaunchPlan::new(DeviceList::parse("0,1").unwrap());
        plan.ports = PortRange::new(start, end).unwrap();
        plan
    }

    #[tokio::test]
    async fn test_first_port_success_needs_no_prompt() {
        let launcher = FailUntil {
            succeed_on: Some(100),
        };
        let mut search = PortSearch::new(launcher, AutoConfirm::new(false));
        let outcome = search.run(&plan(100, 105)).await.unwrap();

        assert_eq!(outcome.status, SearchStatus::Found);
        assert_eq!(outcome.selected_port, Some(100));
        assert_eq!(outcome.prompts_shown, 0);
        assert_eq!(outcome.attempts.len(), 1);
        assert_eq!(outcome.nproc_per_node, 2);
    }

    #[tokio::test]
    async fn test_declining_the_prompt_stops_the_search() {
        let launcher = FailUntil {
            succeed_on: Some(103),
        };
        let mut search = PortSearch::new(launcher, AutoConfirm::new(false));
        let outcome = search.run(&plan(100, 105)).await.unwrap();

        assert_eq!(outcome.status, SearchStatus::Declined);
        assert_eq!(outcome.selected_port, None);
        assert_eq!(outcome.launched_ports(), vec![100]);
        assert_eq!(outcome.exit_code(), 130);
    }

    #[tokio::test]
    async fn test_single_failing_port_is_exhausted_without_prompt() {
        let mut search = PortSearch::new(FailUntil { succeed_on: None }, AutoConfirm::new(true));
        let outcome = search.run(&plan(100, 100)).await.unwrap();

        assert_eq!(outcome.status, SearchStatus::Exhausted);
        assert_eq!(outcome.prompts_shown, 0);
        assert_eq!(outcome.attempts[0].outcome, AttemptOutcome::Failed { code: 1 });
    }

    #[tokio::test]
    async fn test_never_policy_searches_silently() {
        let mut plan = plan(100, 104);
        plan.prompt_policy = PromptPolicy::Never;
        let launcher = FailUntil {
            succeed_on: Some(104),
        };
        let mut search = PortSearch::new(launcher, AutoConfirm::new(false));
        let outcome = search.run(&plan).await.unwrap();

        assert_eq!(outcome.selected_port, Some(104));
        assert_eq!(outcome.prompts_shown, 0);
    }
}
