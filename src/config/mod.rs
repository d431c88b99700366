pub mod resolve;
pub mod toml_config;

#[cfg(feature = "cli")]
use crate::config::resolve::PlanOverrides;
#[cfg(feature = "cli")]
use crate::core::prompt::PromptPolicy;
#[cfg(feature = "cli")]
use crate::utils::logger::LogFormat;
#[cfg(feature = "cli")]
use crate::utils::threads::ThreadSetting;
#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "ddp-launch")]
#[command(about = "Launch distributed training, searching a port range for a usable master port")]
pub struct CliConfig {
    /// Path to a launch.toml configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Comma-separated accelerator ids (defaults to $CUDA_VISIBLE_DEVICES)
    #[arg(long)]
    pub devices: Option<String>,

    /// First master port to try
    #[arg(long)]
    pub port_start: Option<u16>,

    /// Last master port to try (inclusive)
    #[arg(long)]
    pub port_end: Option<u16>,

    /// Launch tool and its leading arguments, e.g. "python -m torch.distributed.launch"
    #[arg(long)]
    pub launcher: Option<String>,

    /// Training entry point handed to the launch tool
    #[arg(long)]
    pub entry: Option<String>,

    /// Keyword placed before the training parameters
    #[arg(long)]
    pub params_prefix: Option<String>,

    /// Forward training parameters without a prefix keyword
    #[arg(long, conflicts_with = "params_prefix")]
    pub no_params_prefix: bool,

    /// When to ask before trying the next port
    #[arg(long, value_enum)]
    pub prompt: Option<PromptPolicy>,

    /// OMP_NUM_THREADS for each worker: a number or "auto"
    #[arg(long)]
    pub threads: Option<ThreadSetting>,

    /// Skip ports that are already bound locally without launching
    #[arg(long)]
    pub skip_busy_ports: bool,

    /// Print the launch commands without running them
    #[arg(long)]
    pub dry_run: bool,

    /// Write a JSON report of every attempt to this path
    #[arg(long)]
    pub report: Option<PathBuf>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,

    /// Training parameters, forwarded verbatim
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub params: Vec<String>,
}

#[cfg(feature = "cli")]
impl CliConfig {
    pub fn overrides(&self) -> PlanOverrides {
        PlanOverrides {
            devices: self.devices.clone(),
            port_start: self.port_start,
            port_end: self.port_end,
            launcher: self.launcher.clone(),
            entry: self.entry.clone(),
            params_prefix: self.params_prefix.clone(),
            no_params_prefix: self.no_params_prefix,
            prompt: self.prompt,
            threads: self.threads,
            skip_busy_ports: self.skip_busy_ports,
            params: self.params.clone(),
        }
    }
}
