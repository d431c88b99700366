use crate::utils::error::{LaunchError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Per-process thread count exported to the children as `OMP_NUM_THREADS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawThreadSetting", into = "RawThreadSetting")]
pub enum ThreadSetting {
    /// Split the machine's logical CPUs evenly across the worker processes.
    Auto,
    Fixed(usize),
}

impl Default for ThreadSetting {
    fn default() -> Self {
        ThreadSetting::Fixed(1)
    }
}

impl ThreadSetting {
    pub fn resolve(self, nproc_per_node: usize) -> usize {
        match self {
            ThreadSetting::Fixed(n) => n,
            ThreadSetting::Auto => threads_per_process(logical_cpus(), nproc_per_node),
        }
    }
}

impl FromStr for ThreadSetting {
    type Err = LaunchError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("auto") {
            return Ok(ThreadSetting::Auto);
        }

        match trimmed.parse::<usize>() {
            Ok(n) if n > 0 => Ok(ThreadSetting::Fixed(n)),
            _ => Err(LaunchError::InvalidConfigValueError {
                field: "omp_num_threads".to_string(),
                value: s.to_string(),
                reason: "Expected a positive integer or 'auto'".to_string(),
            }),
        }
    }
}

impl fmt::Display for ThreadSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThreadSetting::Auto => write!(f, "auto"),
            ThreadSetting::Fixed(n) => write!(f, "{}", n),
        }
    }
}

// TOML allows either `omp_num_threads = 4` or `omp_num_threads = "auto"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawThreadSetting {
    Count(usize),
    Keyword(String),
}

impl TryFrom<RawThreadSetting> for ThreadSetting {
    type Error = LaunchError;

    fn try_from(raw: RawThreadSetting) -> Result<Self> {
        match raw {
            RawThreadSetting::Count(n) => n.to_string().parse(),
            RawThreadSetting::Keyword(s) => s.parse(),
        }
    }
}

impl From<ThreadSetting> for RawThreadSetting {
    fn from(setting: ThreadSetting) -> Self {
        match setting {
            ThreadSetting::Auto => RawThreadSetting::Keyword("auto".to_string()),
            ThreadSetting::Fixed(n) => RawThreadSetting::Count(n),
        }
    }
}

pub fn threads_per_process(logical_cpus: usize, nproc_per_node: usize) -> usize {
    (logical_cpus / nproc_per_node.max(1)).max(1)
}

#[cfg(feature = "cli")]
pub fn logical_cpus() -> usize {
    let mut system = sysinfo::System::new();
    system.refresh_cpu_all();
    let count = system.cpus().len();
    tracing::debug!("Detected {} logical CPUs", count);
    count.max(1)
}

// 非CLI環境沒有 sysinfo
#[cfg(not(feature = "cli"))]
pub fn logical_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
