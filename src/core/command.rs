use serde::{Deserialize, Serialize};

/// One fully-specified invocation of the distributed-launch tool.
///
/// Arguments are laid out as
/// `<program> <launcher_args..> --nproc_per_node=N --master_port=P <entry> [prefix] <params..>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchCommand {
    pub program: String,
    pub launcher_args: Vec<String>,
    pub nproc_per_node: usize,
    pub master_port: u16,
    pub entry: String,
    pub params_prefix: Option<String>,
    pub params: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl LaunchCommand {
    pub fn args(&self) -> Vec<String> {
        let mut args = self.launcher_args.clone();
        args.push(format!("--nproc_per_node={}", self.nproc_per_node));
        args.push(format!("--master_port={}", self.master_port));
        args.push(self.entry.clone());

        if !self.params.is_empty() {
            if let Some(prefix) = &self.params_prefix {
                args.push(prefix.clone());
            }
            args.extend(self.params.iter().cloned());
        }

        args
    }

    pub fn env_value(&self, name: &str) -> Option<&str> {
        self.env
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Shell-like rendering for logs and dry runs.
    pub fn display(&self) -> String {
        let env = self
            .env
            .iter()
            .map(|(key, value)| format!("{}={}", key, shell_quote(value)));
        let program = std::iter::once(shell_quote(&self.program));
        let args = self.args().into_iter().map(|arg| shell_quote(&arg));

        env.chain(program).chain(args).collect::<Vec<_>>().join(" ")
    }
}

fn shell_quote(value: &str) -> String {
    let plain = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,+@%".contains(c));
    if plain {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}
