use anyhow::{bail, Context, Result};
use opsmcp_core::DispatchConfig;
use opsmcp_providers::ollama::DEFAULT_OLLAMA_HOST;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/opsmcp.yaml";
pub const DEFAULT_ENV_FILE: &str = "/etc/opsmcp.env";
pub const ENV_API_KEY: &str = "OLLAMA_API_KEY";
pub const ENV_IDLE_TIMEOUT: &str = "OPSMCP_IDLE_TIMEOUT";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    #[default]
    Ollama,
    OpenaiCompatible,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub provider: ProviderKind,
    pub api_host: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub request_timeout_secs: u64,

    /// Relative paths below resolve against this directory.
    pub data_dir: PathBuf,
    pub error_log: PathBuf,
    pub heartbeat_file: PathBuf,
    pub patterns_file: PathBuf,
    pub boot_report_file: PathBuf,

    pub heartbeat_interval_secs: u64,
    pub watch_interval_secs: u64,
    pub idle_timeout_secs: u64,
    pub health_max_age_secs: u64,
    pub service_unit: String,

    pub command_timeout_secs: u64,
    pub boot_probe_timeout_secs: u64,
    pub require_root: bool,

    pub dispatch: DispatchConfig,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Ollama,
            api_host: DEFAULT_OLLAMA_HOST.to_string(),
            api_key: None,
            request_timeout_secs: 120,
            data_dir: PathBuf::from("/var/lib/opsmcp"),
            error_log: PathBuf::from("error.log"),
            heartbeat_file: PathBuf::from("state.json"),
            patterns_file: PathBuf::from("patterns.json"),
            boot_report_file: PathBuf::from("boot_report.json"),
            heartbeat_interval_secs: 10,
            watch_interval_secs: 60,
            idle_timeout_secs: 1800,
            health_max_age_secs: 30,
            service_unit: opsmcp_liveness::DEFAULT_SERVICE_UNIT.to_string(),
            command_timeout_secs: 90,
            boot_probe_timeout_secs: 30,
            require_root: true,
            dispatch: DispatchConfig::default(),
        }
    }
}

impl AgentConfig {
    /// Defaults, then the YAML file, then environment overrides.
    ///
    /// An explicit path must exist; the default path is optional. Ignored
    /// environment overrides are returned as notices for the caller to log
    /// once logging is up. The `dispatch` section is only checked when a
    /// dispatcher is built in [`crate::bootstrap::build_dispatcher`].
    pub fn load(explicit: Option<&Path>) -> Result<(Self, Vec<String>)> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_PATH);
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };

        let notices = config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok((config, notices))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_yaml_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Apply environment overrides. A malformed value keeps the current
    /// setting and is reported in the returned notices.
    pub fn apply_env<F>(&mut self, lookup: F) -> Vec<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut notices = Vec::new();

        if let Some(key) = lookup(ENV_API_KEY).filter(|k| !k.trim().is_empty()) {
            self.api_key = Some(key.trim().to_string());
        }

        if let Some(raw) = lookup(ENV_IDLE_TIMEOUT) {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => self.idle_timeout_secs = secs,
                _ => notices.push(format!(
                    "Ignoring {}={:?}: expected a positive number of seconds, keeping {}",
                    ENV_IDLE_TIMEOUT, raw, self.idle_timeout_secs
                )),
            }
        }

        notices
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_host.trim().is_empty() {
            bail!("api_host cannot be empty");
        }
        if self.service_unit.trim().is_empty() {
            bail!("service_unit cannot be empty");
        }

        let durations = [
            ("request_timeout_secs", self.request_timeout_secs),
            ("heartbeat_interval_secs", self.heartbeat_interval_secs),
            ("watch_interval_secs", self.watch_interval_secs),
            ("idle_timeout_secs", self.idle_timeout_secs),
            ("health_max_age_secs", self.health_max_age_secs),
            ("command_timeout_secs", self.command_timeout_secs),
            ("boot_probe_timeout_secs", self.boot_probe_timeout_secs),
        ];
        for (name, value) in durations {
            if value == 0 {
                bail!("{} must be greater than zero", name);
            }
        }

        Ok(())
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.data_dir.join(path)
        }
    }

    pub fn error_log_path(&self) -> PathBuf {
        self.resolve(&self.error_log)
    }

    pub fn heartbeat_path(&self) -> PathBuf {
        self.resolve(&self.heartbeat_file)
    }

    pub fn patterns_path(&self) -> PathBuf {
        self.resolve(&self.patterns_file)
    }

    pub fn boot_report_path(&self) -> PathBuf {
        self.resolve(&self.boot_report_file)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn watch_interval(&self) -> Duration {
        Duration::from_secs(self.watch_interval_secs)
    }

    pub fn idle_limit(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn health_max_age(&self) -> Duration {
        Duration::from_secs(self.health_max_age_secs)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    pub fn boot_probe_timeout(&self) -> Duration {
        Duration::from_secs(self.boot_probe_timeout_secs)
    }
}

/// Load `KEY=VALUE` pairs from `path` without overriding variables that are
/// already set. Returns whether a file was read.
pub fn load_env_file(path: &Path) -> bool {
    match dotenvy::from_path(path) {
        Ok(()) => true,
        Err(e) if e.not_found() => false,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to load env file");
            false
        }
    }
}
