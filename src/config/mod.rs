use crate::policy::ExecutionPolicy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

pub const CONFIG_FILE_NAME: &str = ".foreman.yaml";
pub const DEFAULT_STEP_TIMEOUT_SECONDS: u64 = 60;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid config value for `{field}`: {reason}")]
    Invalid { field: String, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    AllowList,
    DenyAll,
}

/// Policy selection, fixed at construction time and never mutated mid-run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyConfig {
    pub kind: PolicyKind,
    #[serde(default)]
    pub allowed_binaries: Vec<String>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            kind: PolicyKind::DenyAll,
            allowed_binaries: Vec::new(),
        }
    }
}

impl PolicyConfig {
    pub fn build(&self) -> ExecutionPolicy {
        match self.kind {
            PolicyKind::AllowList => {
                ExecutionPolicy::allow_list(self.allowed_binaries.iter().cloned())
            }
            PolicyKind::DenyAll => ExecutionPolicy::DenyAll,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct RunConfig {
    pub policy: PolicyConfig,
    pub step_timeout_seconds: u64,
    /// Named verification tools: name to argv form.
    pub verifiers: BTreeMap<String, Vec<String>>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            policy: PolicyConfig::default(),
            step_timeout_seconds: DEFAULT_STEP_TIMEOUT_SECONDS,
            verifiers: BTreeMap::new(),
        }
    }
}

impl RunConfig {
    pub fn step_timeout(&self) -> Duration {
        Duration::from_secs(self.step_timeout_seconds)
    }
}

/// Loads `.foreman.yaml` from the project root when present, otherwise the
/// built-in defaults (deny-all, 60s timeout, no verifiers). The
/// `FOREMAN_STEP_TIMEOUT_SECONDS` environment variable overrides the file.
pub fn load_run_config(project_root: &Path) -> Result<RunConfig, ConfigError> {
    let path = project_root.join(CONFIG_FILE_NAME);
    let mut config = if path.exists() {
        let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?
    } else {
        RunConfig::default()
    };
    apply_env_overrides(&mut config, std::env::var("FOREMAN_STEP_TIMEOUT_SECONDS").ok());
    validate(&config)?;
    Ok(config)
}

fn apply_env_overrides(config: &mut RunConfig, step_timeout_seconds: Option<String>) {
    if let Some(seconds) = step_timeout_seconds
        .and_then(|raw| raw.parse::<u64>().ok())
        .filter(|value| *value > 0)
    {
        config.step_timeout_seconds = seconds;
    }
}

fn validate(config: &RunConfig) -> Result<(), ConfigError> {
    if config.step_timeout_seconds == 0 {
        return Err(ConfigError::Invalid {
            field: "step_timeout_seconds".to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    for (tool, argv) in &config.verifiers {
        if argv.is_empty() {
            return Err(ConfigError::Invalid {
                field: format!("verifiers.{tool}"),
                reason: "command must not be empty".to_string(),
            });
        }
    }
    Ok(())
}
