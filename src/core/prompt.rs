use crate::domain::ports::Confirm;
use crate::utils::error::{LaunchError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::str::FromStr;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

/// When to ask the operator before trying the next port.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum PromptPolicy {
    /// Ask after the first failure, then keep searching silently.
    #[default]
    Once,
    Always,
    Never,
}

impl PromptPolicy {
    pub fn should_prompt(&self, prompts_shown: usize) -> bool {
        match self {
            PromptPolicy::Once => prompts_shown == 0,
            PromptPolicy::Always => true,
            PromptPolicy::Never => false,
        }
    }

    /// Nobody can answer a prompt on a non-terminal stdin.
    pub fn for_terminal(self, interactive: bool) -> Self {
        if interactive {
            self
        } else {
            PromptPolicy::Never
        }
    }
}

impl FromStr for PromptPolicy {
    type Err = LaunchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "once" => Ok(PromptPolicy::Once),
            "always" => Ok(PromptPolicy::Always),
            "never" => Ok(PromptPolicy::Never),
            _ => Err(LaunchError::InvalidConfigValueError {
                field: "prompt.policy".to_string(),
                value: s.to_string(),
                reason: "Expected one of: once, always, never".to_string(),
            }),
        }
    }
}

/// Reads the operator's answer from stdin. Any line continues the search;
/// end of input stops it. Ctrl-C terminates the launcher outright.
pub struct StdinConfirm {
    lines: Lines<BufReader<Stdin>>,
}

impl StdinConfirm {
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }
}

impl Default for StdinConfirm {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Confirm for StdinConfirm {
    async fn confirm(&mut self, message: &str) -> Result<bool> {
        let mut stderr = std::io::stderr();
        write!(stderr, "{} ", message)?;
        stderr.flush()?;

        match self.lines.next_line().await {
            Ok(Some(_)) => Ok(true),
            Ok(None) => Ok(false),
            Err(e) => Err(LaunchError::PromptError {
                message: e.to_string(),
            }),
        }
    }
}

/// Answers every prompt the same way without blocking.
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirm {
    answer: bool,
}

impl AutoConfirm {
    pub fn new(answer: bool) -> Self {
        Self { answer }
    }
}

#[async_trait]
impl Confirm for AutoConfirm {
    async fn confirm(&mut self, message: &str) -> Result<bool> {
        tracing::debug!("Auto-answering prompt ({}): {}", self.answer, message);
        Ok(self.answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_once_prompts_only_first_time() {
        assert!(PromptPolicy::Once.should_prompt(0));
        assert!(!PromptPolicy::Once.should_prompt(1));
        assert!(PromptPolicy::Always.should_prompt(5));
        assert!(!PromptPolicy::Never.should_prompt(0));
    }

    #[test]
    fn test_non_interactive_never_prompts() {
        assert_eq!(PromptPolicy::Once.for_terminal(false), PromptPolicy::Never);
        assert_eq!(PromptPolicy::Always.for_terminal(true), PromptPolicy::Always);
    }

    #[test]
    fn test_parse_policy() {
        assert_eq!("Once".parse::<PromptPolicy>().unwrap(), PromptPolicy::Once);
        assert_eq!("never".parse::<PromptPolicy>().unwrap(), PromptPolicy::Never);
        assert!("sometimes".parse::<PromptPolicy>().is_err());
    }

    #[test]
    fn test_auto_confirm() {
        assert!(tokio_test::block_on(AutoConfirm::new(true).confirm("continue?")).unwrap());
        assert!(!tokio_test::block_on(AutoConfirm::new(false).confirm("continue?")).unwrap());
    }
}
