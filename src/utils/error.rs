use thiserror::Error;

#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Failed to parse config '{path}': {message}")]
    ConfigParseError { path: String, message: String },

    #[error("Invalid value for '{field}': '{value}' ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Failed to spawn launcher '{program}': {source}")]
    SpawnError {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Operator prompt failed: {message}")]
    PromptError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Launch,
    Io,
    Operator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl LaunchError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            LaunchError::ConfigError { .. }
            | LaunchError::ConfigParseError { .. }
            | LaunchError::InvalidConfigValueError { .. }
            | LaunchError::MissingConfigError { .. } => ErrorCategory::Configuration,
            LaunchError::SpawnError { .. } => ErrorCategory::Launch,
            LaunchError::IoError(_) | LaunchError::SerializationError(_) => ErrorCategory::Io,
            LaunchError::PromptError { .. } => ErrorCategory::Operator,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Configuration => ErrorSeverity::Medium,
            ErrorCategory::Io | ErrorCategory::Operator => ErrorSeverity::High,
            ErrorCategory::Launch => ErrorSeverity::Critical,
        }
    }

    /// Process exit code for this error, keyed on severity.
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            LaunchError::MissingConfigError { field } if field == "devices" => {
                "Set CUDA_VISIBLE_DEVICES or pass --devices 0,1".to_string()
            }
            LaunchError::MissingConfigError { field } => {
                format!("Provide a value for '{}' in the config file or on the command line", field)
            }
            LaunchError::InvalidConfigValueError { field, .. } => {
                format!("Check the value of '{}'", field)
            }
            LaunchError::ConfigParseError { path, .. } => {
                format!("Make sure '{}' exists and is valid TOML", path)
            }
            LaunchError::ConfigError { .. } => "Review the launch configuration".to_string(),
            LaunchError::SpawnError { program, .. } => format!(
                "Make sure '{}' is installed and on PATH, or pass --launcher",
                program
            ),
            LaunchError::IoError(_) | LaunchError::SerializationError(_) => {
                "Check file permissions and available disk space".to_string()
            }
            LaunchError::PromptError { .. } => {
                "Run with --prompt never for non-interactive sessions".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            LaunchError::MissingConfigError { field } => {
                format!("No {} configured", field.replace('_', " "))
            }
            LaunchError::SpawnError { program, source } => {
                format!("Could not start '{}': {}", program, source)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LaunchError>;
