use crate::core::prompt::PromptPolicy;
use crate::utils::error::{LaunchError, Result};
use crate::utils::threads::ThreadSetting;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// `launch.toml` 設定檔
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LaunchFile {
    #[serde(default)]
    pub launch: LaunchSection,
    #[serde(default)]
    pub devices: DevicesSection,
    #[serde(default)]
    pub ports: PortsSection,
    #[serde(default)]
    pub prompt: PromptSection,
    #[serde(default)]
    pub threads: ThreadsSection,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LaunchSection {
    pub launcher: Option<LauncherSpec>,
    pub entry: Option<String>,
    /// Empty string disables the prefix.
    pub params_prefix: Option<String>,
    pub params: Option<Vec<String>>,
}

/// Either `launcher = "python -m torch.distributed.launch"` or an explicit argv list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LauncherSpec {
    Line(String),
    Argv(Vec<String>),
}

impl LauncherSpec {
    pub fn to_argv(&self) -> Vec<String> {
        match self {
            LauncherSpec::Line(line) => line.split_whitespace().map(String::from).collect(),
            LauncherSpec::Argv(argv) => argv.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DevicesSection {
    pub list: Option<String>,
    pub env_var: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortsSection {
    pub start: Option<u16>,
    pub end: Option<u16>,
    pub skip_busy: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PromptSection {
    pub policy: Option<PromptPolicy>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThreadsSection {
    pub omp_num_threads: Option<ThreadSetting>,
}

impl LaunchFile {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| LaunchError::ConfigParseError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            LaunchError::ConfigError { message } => LaunchError::ConfigParseError {
                path: path.display().to_string(),
                message,
            },
            other => other,
        })
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| LaunchError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${MASTER_PORT_START})，未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| LaunchError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }
}
