pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use config::resolve::{resolve_plan, EnvSnapshot, PlanOverrides};
pub use config::toml_config::LaunchFile;
pub use core::{
    command::LaunchCommand,
    devices::DeviceList,
    launcher::{DryRunLauncher, ProcessLauncher},
    plan::LaunchPlan,
    port_range::PortRange,
    prompt::{AutoConfirm, PromptPolicy, StdinConfirm},
    search::PortSearch,
};
pub use utils::error::{LaunchError, Result};
