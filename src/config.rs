//! Layered configuration for the review console.
//!
//! Settings are resolved in order, later layers winning:
//! built-in defaults → `auditor.toml` → environment → CLI flags.
//!
//! # Configuration File Format
//!
//! ```toml
//! [api]
//! url = "http://localhost:7071/api"
//! timeout_secs = 30
//!
//! [polling]
//! interval_ms = 3000
//!
//! [defaults]
//! client_id = "MAF"
//! mapping_path = "data/MAF/mapping.xlsx"
//! data_path = "data/MAF/transactions.xlsx"
//!
//! [logging]
//! level = "info"
//! dir = "/var/log/auditor"
//! ```
//!
//! The file is looked up at `./.auditor/auditor.toml`, then
//! `<config dir>/auditor/auditor.toml`. A missing file is not an error.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE_NAME: &str = "auditor.toml";
pub const PROJECT_CONFIG_DIR: &str = ".auditor";

pub const ENV_API_URL: &str = "AUDITOR_API_URL";
pub const ENV_POLL_INTERVAL_MS: &str = "AUDITOR_POLL_INTERVAL_MS";
pub const ENV_TIMEOUT_SECS: &str = "AUDITOR_TIMEOUT_SECS";
pub const ENV_LOG_DIR: &str = "AUDITOR_LOG_DIR";

/// Orchestrator API settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL the `/transform` endpoints hang off
    #[serde(default = "default_api_url")]
    pub url: String,
    /// Per-request timeout enforced by the HTTP client
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_api_url() -> String {
    "http://localhost:7071/api".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: default_api_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Interval between refetches of status and messages
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

fn default_interval_ms() -> u64 {
    3000
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
        }
    }
}

/// Development defaults used by `auditor start` when flags are omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default = "default_client_id")]
    pub client_id: String,
    #[serde(default = "default_mapping_path")]
    pub mapping_path: String,
    #[serde(default = "default_data_path")]
    pub data_path: String,
}

fn default_client_id() -> String {
    "MAF".to_string()
}

fn default_mapping_path() -> String {
    "data/MAF/mapping.xlsx".to_string()
}

fn default_data_path() -> String {
    "data/MAF/transactions.xlsx".to_string()
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            client_id: default_client_id(),
            mapping_path: default_mapping_path(),
            data_path: default_data_path(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Directory for rolling log files; stderr only when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            dir: None,
        }
    }
}

/// Complete console configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditorConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub defaults: DefaultsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Values passed on the command line. `None` leaves the lower layer untouched.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub api_url: Option<String>,
    pub poll_interval_ms: Option<u64>,
}

impl AuditorConfig {
    /// Load the effective configuration for a working directory.
    pub fn load(
        work_dir: &Path,
        explicit_path: Option<&Path>,
        overrides: &CliOverrides,
    ) -> Result<Self> {
        let mut config = match explicit_path {
            Some(path) => Self::from_file(path)?,
            None => match Self::discover(work_dir) {
                Some(path) => Self::from_file(&path)?,
                None => Self::default(),
            },
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.apply_overrides(overrides);
        config.validate()?;
        Ok(config)
    }

    /// Parse a config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid TOML configuration")
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }

    /// First existing config file: project-local, then user-level.
    pub fn discover(work_dir: &Path) -> Option<PathBuf> {
        let project = Self::project_path(work_dir);
        if project.exists() {
            return Some(project);
        }
        let user = dirs::config_dir()?.join("auditor").join(CONFIG_FILE_NAME);
        user.exists().then_some(user)
    }

    pub fn project_path(work_dir: &Path) -> PathBuf {
        work_dir.join(PROJECT_CONFIG_DIR).join(CONFIG_FILE_NAME)
    }

    /// Apply environment overrides. `lookup` is injected so tests need not touch the
    /// process environment.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.is_empty()) {
            self.api.url = url;
        }
        if let Some(raw) = lookup(ENV_POLL_INTERVAL_MS) {
            self.polling.interval_ms = raw
                .parse()
                .with_context(|| format!("{} must be an integer, got '{}'", ENV_POLL_INTERVAL_MS, raw))?;
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            self.api.timeout_secs = raw
                .parse()
                .with_context(|| format!("{} must be an integer, got '{}'", ENV_TIMEOUT_SECS, raw))?;
        }
        if let Some(dir) = lookup(ENV_LOG_DIR).filter(|v| !v.is_empty()) {
            self.logging.dir = Some(PathBuf::from(dir));
        }
        Ok(())
    }

    pub fn apply_overrides(&mut self, overrides: &CliOverrides) {
        if let Some(url) = &overrides.api_url {
            self.api.url = url.clone();
        }
        if let Some(ms) = overrides.poll_interval_ms {
            self.polling.interval_ms = ms;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.polling.interval_ms == 0 {
            anyhow::bail!("polling.interval_ms must be greater than zero");
        }
        if self.api.timeout_secs == 0 {
            anyhow::bail!("api.timeout_secs must be greater than zero");
        }
        if !(self.api.url.starts_with("http://") || self.api.url.starts_with("https://")) {
            anyhow::bail!(
                "api.url must start with http:// or https://, got '{}'",
                self.api.url
            );
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.polling.interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }
}
