//! Layers defaults, the TOML file, the environment and command-line overrides
//! into a single [`LaunchPlan`]. Later layers win.

use crate::config::toml_config::LaunchFile;
use crate::core::devices::{DeviceList, DEFAULT_DEVICE_ENV};
use crate::core::plan::{LaunchPlan, OMP_THREADS_ENV};
use crate::core::port_range::{PortRange, DEFAULT_PORT_END, DEFAULT_PORT_START};
use crate::core::prompt::PromptPolicy;
use crate::utils::error::{LaunchError, Result};
use crate::utils::threads::ThreadSetting;
use std::collections::HashMap;

/// Captured process environment; empty values count as unset.
#[derive(Debug, Clone, Default)]
pub struct EnvSnapshot {
    vars: HashMap<String, String>,
}

impl EnvSnapshot {
    pub fn from_process() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars
            .get(name)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }
}

/// Command-line settings; `None` leaves the lower layers untouched.
#[derive(Debug, Clone, Default)]
pub struct PlanOverrides {
    pub devices: Option<String>,
    pub port_start: Option<u16>,
    pub port_end: Option<u16>,
    pub launcher: Option<String>,
    pub entry: Option<String>,
    pub params_prefix: Option<String>,
    pub no_params_prefix: bool,
    pub prompt: Option<PromptPolicy>,
    pub threads: Option<ThreadSetting>,
    pub skip_busy_ports: bool,
    pub params: Vec<String>,
}

pub fn resolve_plan(
    file: Option<&LaunchFile>,
    env: &EnvSnapshot,
    overrides: &PlanOverrides,
) -> Result<LaunchPlan> {
    let default_file = LaunchFile::default();
    let file = file.unwrap_or(&default_file);

    let device_env = file
        .devices
        .env_var
        .clone()
        .unwrap_or_else(|| DEFAULT_DEVICE_ENV.to_string());

    let raw_devices = overrides
        .devices
        .as_deref()
        .or_else(|| env.get(&device_env))
        .or(file.devices.list.as_deref())
        .ok_or_else(|| LaunchError::MissingConfigError {
            field: "devices".to_string(),
        })?;
    let devices = DeviceList::parse(raw_devices)?;

    let mut plan = LaunchPlan::new(devices);
    plan.device_env = device_env;

    if let Some(launcher) = overrides.launcher.as_deref() {
        plan.launcher = launcher.split_whitespace().map(String::from).collect();
    } else if let Some(spec) = &file.launch.launcher {
        plan.launcher = spec.to_argv();
    }

    if let Some(entry) = overrides.entry.as_ref().or(file.launch.entry.as_ref()) {
        plan.entry = entry.clone();
    }

    if overrides.no_params_prefix {
        plan.params_prefix = None;
    } else if let Some(prefix) = overrides
        .params_prefix
        .as_ref()
        .or(file.launch.params_prefix.as_ref())
    {
        plan.params_prefix = Some(prefix.clone()).filter(|p| !p.trim().is_empty());
    }

    // 設定檔參數在前，命令列參數在後
    plan.params = file.launch.params.clone().unwrap_or_default();
    plan.params.extend(overrides.params.iter().cloned());

    let start = overrides.port_start.or(file.ports.start);
    let end = overrides.port_end.or(file.ports.end);
    plan.ports = match (start, end) {
        (Some(start), Some(end)) => PortRange::new(start, end)?,
        // 只指定起始埠時，結束埠跟著平移，保持預設的搜尋寬度
        (Some(start), None) => PortRange::new(
            start,
            start.saturating_add(DEFAULT_PORT_END - DEFAULT_PORT_START),
        )?,
        (None, Some(end)) => PortRange::new(DEFAULT_PORT_START, end)?,
        (None, None) => PortRange::default(),
    };
    plan.skip_busy_ports = overrides.skip_busy_ports || file.ports.skip_busy.unwrap_or(false);

    if let Some(policy) = overrides.prompt.or(file.prompt.policy) {
        plan.prompt_policy = policy;
    }

    let threads = match overrides.threads {
        Some(setting) => setting,
        None => match env.get(OMP_THREADS_ENV) {
            Some(value) => value.parse()?,
            None => file.threads.omp_num_threads.unwrap_or_default(),
        },
    };
    plan.omp_num_threads = threads.resolve(plan.nproc_per_node());

    plan.extra_env = file.env.clone();

    tracing::debug!("Resolved launch plan: {:?}", plan);
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn devices_env(list: &str) -> EnvSnapshot {
        EnvSnapshot::from_pairs([("CUDA_VISIBLE_DEVICES", list)])
    }

    #[test]
    fn test_defaults_with_env_devices() {
        let plan = resolve_plan(None, &devices_env("0,1"), &PlanOverrides::default()).unwrap();

        assert_eq!(plan.nproc_per_node(), 2);
        assert_eq!(plan.ports.start(), DEFAULT_PORT_START);
        assert_eq!(plan.ports.end(), DEFAULT_PORT_END);
        assert_eq!(plan.launcher, vec!["torchrun"]);
        assert_eq!(plan.entry, "train.py");
        assert_eq!(plan.params_prefix.as_deref(), Some("with"));
        assert_eq!(plan.omp_num_threads, 1);
        assert_eq!(plan.prompt_policy, PromptPolicy::Once);
    }

    #[test]
    fn test_missing_devices() {
        let err = resolve_plan(None, &EnvSnapshot::default(), &PlanOverrides::default())
            .unwrap_err();
        assert!(matches!(err, LaunchError::MissingConfigError { ref field } if field == "devices"));
    }

    #[test]
    fn test_empty_env_value_counts_as_unset() {
        let env = devices_env("");
        assert!(resolve_plan(None, &env, &PlanOverrides::default()).is_err());
    }

    #[test]
    fn test_cli_beats_env_beats_file() {
        let file = LaunchFile::from_toml_str("[devices]\nlist = \"0\"\n").unwrap();
        let env = devices_env("0,1");

        let from_env = resolve_plan(Some(&file), &env, &PlanOverrides::default()).unwrap();
        assert_eq!(from_env.nproc_per_node(), 2);

        let overrides = PlanOverrides {
            devices: Some("0,1,2,3".to_string()),
            ..Default::default()
        };
        let from_cli = resolve_plan(Some(&file), &env, &overrides).unwrap();
        assert_eq!(from_cli.nproc_per_node(), 4);

        let from_file =
            resolve_plan(Some(&file), &EnvSnapshot::default(), &PlanOverrides::default())
                .unwrap();
        assert_eq!(from_file.nproc_per_node(), 1);
    }

    #[test]
    fn test_custom_device_env_var() {
        let file =
            LaunchFile::from_toml_str("[devices]\nenv_var = \"HIP_VISIBLE_DEVICES\"\n").unwrap();
        let env = EnvSnapshot::from_pairs([("HIP_VISIBLE_DEVICES", "0,1,2")]);
        let plan = resolve_plan(Some(&file), &env, &PlanOverrides::default()).unwrap();

        assert_eq!(plan.nproc_per_node(), 3);
        assert_eq!(plan.command_for(29500).env_value("HIP_VISIBLE_DEVICES"), Some("0,1,2"));
    }

    #[test]
    fn test_params_are_appended() {
        let file = LaunchFile::from_toml_str("[launch]\nparams = [\"data.root=/data\"]\n").unwrap();
        let overrides = PlanOverrides {
            params: vec!["trainer.lr=0.01".to_string()],
            ..Default::default()
        };
        let plan = resolve_plan(Some(&file), &devices_env("0"), &overrides).unwrap();
        assert_eq!(plan.params, vec!["data.root=/data", "trainer.lr=0.01"]);
    }

    #[test]
    fn test_params_prefix_can_be_disabled() {
        let overrides = PlanOverrides {
            no_params_prefix: true,
            ..Default::default()
        };
        let plan = resolve_plan(None, &devices_env("0"), &overrides).unwrap();
        assert_eq!(plan.params_prefix, None);

        let file = LaunchFile::from_toml_str("[launch]\nparams_prefix = \"\"\n").unwrap();
        let plan = resolve_plan(Some(&file), &devices_env("0"), &PlanOverrides::default()).unwrap();
        assert_eq!(plan.params_prefix, None);
    }

    #[test]
    fn test_thread_layers() {
        let env = EnvSnapshot::from_pairs([
            ("CUDA_VISIBLE_DEVICES", "0,1"),
            ("OMP_NUM_THREADS", "6"),
        ]);
        let plan = resolve_plan(None, &env, &PlanOverrides::default()).unwrap();
        assert_eq!(plan.omp_num_threads, 6);

        let overrides = PlanOverrides {
            threads: Some(ThreadSetting::Fixed(2)),
            ..Default::default()
        };
        let plan = resolve_plan(None, &env, &overrides).unwrap();
        assert_eq!(plan.omp_num_threads, 2);

        let bad = EnvSnapshot::from_pairs([
            ("CUDA_VISIBLE_DEVICES", "0"),
            ("OMP_NUM_THREADS", "lots"),
        ]);
        assert!(resolve_plan(None, &bad, &PlanOverrides::default()).is_err());
    }

    #[test]
    fn test_port_overrides_are_validated() {
        let overrides = PlanOverrides {
            port_start: Some(30000),
            port_end: Some(29000),
            ..Default::default()
        };
        assert!(resolve_plan(None, &devices_env("0"), &overrides).is_err());

        let overrides = PlanOverrides {
            port_start: Some(40000),
            port_end: Some(40009),
            launcher: Some("python -m torch.distributed.launch".to_string()),
            ..Default::default()
        };
        let plan = resolve_plan(None, &devices_env("0"), &overrides).unwrap();
        assert_eq!(plan.ports.len(), 10);
        assert_eq!(plan.launcher, vec!["python", "-m", "torch.distributed.launch"]);
    }

    #[test]
    fn test_lone_port_start_keeps_default_width() {
        let overrides = PlanOverrides {
            port_start: Some(30000),
            ..Default::default()
        };
        let plan = resolve_plan(None, &devices_env("0"), &overrides).unwrap();
        assert_eq!(plan.ports.start(), 30000);
        assert_eq!(plan.ports.end(), 30099);
        assert_eq!(plan.ports.len(), 100);

        let file = LaunchFile::from_toml_str("[ports]\nstart = 65500\n").unwrap();
        let plan = resolve_plan(Some(&file), &devices_env("0"), &PlanOverrides::default()).unwrap();
        assert_eq!(plan.ports.start(), 65500);
        assert_eq!(plan.ports.end(), u16::MAX);

        let overrides = PlanOverrides {
            port_end: Some(29510),
            ..Default::default()
        };
        let plan = resolve_plan(None, &devices_env("0"), &overrides).unwrap();
        assert_eq!(plan.ports.start(), DEFAULT_PORT_START);
        assert_eq!(plan.ports.end(), 29510);
    }
}
