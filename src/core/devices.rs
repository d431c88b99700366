use crate::utils::error::{LaunchError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_DEVICE_ENV: &str = "CUDA_VISIBLE_DEVICES";

/// Accelerator identifiers visible to the training job, in launch order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceList {
    devices: Vec<String>,
}

impl DeviceList {
    /// Parse a comma-separated list such as `"0,1,2,3"`.
    pub fn parse(raw: &str) -> Result<Self> {
        let invalid = |reason: &str| LaunchError::InvalidConfigValueError {
            field: "devices".to_string(),
            value: raw.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(invalid("Device list cannot be empty"));
        }

        let mut devices: Vec<String> = Vec::new();
        for entry in trimmed.split(',').map(str::trim) {
            if entry.is_empty() {
                return Err(invalid("Device list contains an empty entry"));
            }
            if devices.iter().any(|d| d == entry) {
                return Err(invalid(&format!("Device '{}' is listed twice", entry)));
            }
            devices.push(entry.to_string());
        }

        Ok(Self { devices })
    }

    /// One worker process per listed device.
    pub fn nproc_per_node(&self) -> usize {
        self.devices.len()
    }

    pub fn to_env_value(&self) -> String {
        self.devices.join(",")
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.devices.iter().map(String::as_str)
    }
}

impl FromStr for DeviceList {
    type Err = LaunchError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DeviceList {
    type Error = LaunchError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<DeviceList> for String {
    fn from(list: DeviceList) -> Self {
        list.to_env_value()
    }
}

impl fmt::Display for DeviceList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_env_value())
    }
}
