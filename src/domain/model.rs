use crate::core::port_range::PortRange;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::process::ExitStatus;

/// How one invocation of the external launch tool ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExitOutcome {
    Success,
    Failed { code: i32 },
    /// Terminated without an exit code (killed by a signal).
    Signaled,
}

impl From<ExitStatus> for ExitOutcome {
    fn from(status: ExitStatus) -> Self {
        if status.success() {
            return ExitOutcome::Success;
        }
        match status.code() {
            Some(code) => ExitOutcome::Failed { code },
            None => ExitOutcome::Signaled,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Succeeded,
    Failed { code: i32 },
    Signaled,
    /// Port was already bound locally; the launcher was not invoked.
    SkippedBusy,
}

impl From<ExitOutcome> for AttemptOutcome {
    fn from(outcome: ExitOutcome) -> Self {
        match outcome {
            ExitOutcome::Success => AttemptOutcome::Succeeded,
            ExitOutcome::Failed { code } => AttemptOutcome::Failed { code },
            ExitOutcome::Signaled => AttemptOutcome::Signaled,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attempt {
    pub port: u16,
    pub outcome: AttemptOutcome,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

impl Attempt {
    pub fn skipped(port: u16) -> Self {
        Self {
            port,
            outcome: AttemptOutcome::SkippedBusy,
            started_at: Utc::now(),
            elapsed_ms: 0,
        }
    }

    pub fn launched(&self) -> bool {
        self.outcome != AttemptOutcome::SkippedBusy
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStatus {
    /// An invocation exited with status zero.
    Found,
    /// Every port in the range failed or was skipped.
    Exhausted,
    /// The operator chose not to keep searching.
    Declined,
    /// The launch tool was killed by a signal.
    Interrupted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub status: SearchStatus,
    pub selected_port: Option<u16>,
    pub nproc_per_node: usize,
    pub range: PortRange,
    pub attempts: Vec<Attempt>,
    pub prompts_shown: usize,
}

impl SearchOutcome {
    /// Ports handed to the launcher, in the order they were tried.
    pub fn launched_ports(&self) -> Vec<u16> {
        self.attempts
            .iter()
            .filter(|a| a.launched())
            .map(|a| a.port)
            .collect()
    }

    pub fn exit_code(&self) -> i32 {
        match self.status {
            SearchStatus::Found => 0,
            SearchStatus::Exhausted => 1,
            SearchStatus::Declined | SearchStatus::Interrupted => 130,
        }
    }
}
