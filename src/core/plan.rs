use crate::core::command::LaunchCommand;
use crate::core::devices::{DeviceList, DEFAULT_DEVICE_ENV};
use crate::core::port_range::PortRange;
use crate::core::prompt::PromptPolicy;
use crate::utils::error::{LaunchError, Result};
use crate::utils::validation::{
    validate_env_var_name, validate_non_empty_string, validate_positive_number, Validate,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_LAUNCHER: &str = "torchrun";
pub const DEFAULT_ENTRY: &str = "train.py";
pub const DEFAULT_PARAMS_PREFIX: &str = "with";
pub const OMP_THREADS_ENV: &str = "OMP_NUM_THREADS";

/// Fully resolved settings for one port search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchPlan {
    /// Launcher program followed by its leading arguments.
    pub launcher: Vec<String>,
    pub entry: String,
    pub params_prefix: Option<String>,
    pub params: Vec<String>,
    pub devices: DeviceList,
    pub device_env: String,
    pub omp_num_threads: usize,
    pub ports: PortRange,
    pub skip_busy_ports: bool,
    pub prompt_policy: PromptPolicy,
    pub extra_env: BTreeMap<String, String>,
}

impl LaunchPlan {
    /// Plan with default launcher settings for the given devices.
    pub fn new(devices: DeviceList) -> Self {
        Self {
            launcher: vec![DEFAULT_LAUNCHER.to_string()],
            entry: DEFAULT_ENTRY.to_string(),
            params_prefix: Some(DEFAULT_PARAMS_PREFIX.to_string()),
            params: Vec::new(),
            devices,
            device_env: DEFAULT_DEVICE_ENV.to_string(),
            omp_num_threads: 1,
            ports: PortRange::default(),
            skip_busy_ports: false,
            prompt_policy: PromptPolicy::default(),
            extra_env: BTreeMap::new(),
        }
    }

    pub fn nproc_per_node(&self) -> usize {
        self.devices.nproc_per_node()
    }

    /// Environment forwarded to every launch; extra pairs never shadow the
    /// device and thread variables.
    pub fn env(&self) -> Vec<(String, String)> {
        let mut env = vec![
            (self.device_env.clone(), self.devices.to_env_value()),
            (OMP_THREADS_ENV.to_string(), self.omp_num_threads.to_string()),
        ];
        env.extend(
            self.extra_env
                .iter()
                .filter(|(key, _)| **key != self.device_env && key.as_str() != OMP_THREADS_ENV)
                .map(|(key, value)| (key.clone(), value.clone())),
        );
        env
    }

    pub fn command_for(&self, port: u16) -> LaunchCommand {
        let (program, launcher_args) = match self.launcher.split_first() {
            Some((program, rest)) => (program.clone(), rest.to_vec()),
            None => (DEFAULT_LAUNCHER.to_string(), Vec::new()),
        };

        LaunchCommand {
            program,
            launcher_args,
            nproc_per_node: self.nproc_per_node(),
            master_port: port,
            entry: self.entry.clone(),
            params_prefix: self.params_prefix.clone(),
            params: self.params.clone(),
            env: self.env(),
        }
    }
}

impl Validate for LaunchPlan {
    fn validate(&self) -> Result<()> {
        match self.launcher.first() {
            Some(program) => validate_non_empty_string("launch.launcher", program)?,
            None => {
                return Err(LaunchError::MissingConfigError {
                    field: "launch.launcher".to_string(),
                })
            }
        }
        validate_non_empty_string("launch.entry", &self.entry)?;
        if let Some(prefix) = &self.params_prefix {
            validate_non_empty_string("launch.params_prefix", prefix)?;
        }
        validate_env_var_name("devices.env_var", &self.device_env)?;
        validate_positive_number("threads.omp_num_threads", self.omp_num_threads, 1)?;
        for name in self.extra_env.keys() {
            validate_env_var_name("env", name)?;
        }
        Ok(())
    }
}
