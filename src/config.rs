//! Agent configuration
//!
//! Settings are layered: JSON config file, then `KAIPO_AGENT_*` environment
//! variables, then command-line overrides applied by the caller.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Environment variable prefix, e.g. `KAIPO_AGENT_SERVER_URL`
pub const ENV_PREFIX: &str = "KAIPO_AGENT";

/// Default report interval in seconds
pub const DEFAULT_REPORT_INTERVAL: u64 = 300;

/// Longest accepted report interval in seconds (one day)
pub const MAX_REPORT_INTERVAL: u64 = 24 * 60 * 60;

/// Minimum token length accepted by `configure`
pub const MIN_TOKEN_LEN: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentConfig {
    #[serde(default)]
    pub server_url: String,
    #[serde(default)]
    pub token: String,
    /// Seconds between report cycles; the server may change it at runtime
    #[serde(default = "default_report_interval")]
    pub report_interval: u64,
    /// Overrides the discovered hostname in reports
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
}

fn default_report_interval() -> u64 {
    DEFAULT_REPORT_INTERVAL
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            server_url: String::new(),
            token: String::new(),
            report_interval: DEFAULT_REPORT_INTERVAL,
            hostname: None,
        }
    }
}

impl AgentConfig {
    /// Loads the config file (if present) and environment overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        debug!("Loading configuration from {}", path.display());

        let settings = config::Config::builder()
            .add_source(
                config::File::from(path)
                    .format(config::FileFormat::Json)
                    .required(false),
            )
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;

        let cfg: AgentConfig = settings.try_deserialize()?;
        Ok(cfg)
    }

    /// Applies command-line overrides on top of file and environment values.
    pub fn with_overrides(mut self, server_url: Option<String>, token: Option<String>) -> Self {
        if let Some(url) = server_url.filter(|u| !u.is_empty()) {
            self.server_url = url;
        }
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            self.token = token;
        }
        self
    }

    /// Checks the settings the report engine needs before it starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server_url.trim().is_empty() {
            return Err(ConfigError::Missing("server_url"));
        }
        if self.token.trim().is_empty() {
            return Err(ConfigError::Missing("token"));
        }
        if !(self.server_url.starts_with("https://") || self.server_url.starts_with("http://")) {
            return Err(ConfigError::InvalidUrl(self.server_url.clone()));
        }
        if self.report_interval == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        if self.report_interval > MAX_REPORT_INTERVAL {
            return Err(ConfigError::IntervalTooLong {
                secs: self.report_interval,
                max: MAX_REPORT_INTERVAL,
            });
        }
        if self.server_url.starts_with("http://") {
            warn!("Server URL {} is not using HTTPS", self.server_url);
        }
        Ok(())
    }

    /// Stricter validation used when the operator saves new settings.
    pub fn validate_for_save(&self) -> Result<(), ConfigError> {
        self.validate()?;
        if self.token.len() < MIN_TOKEN_LEN {
            return Err(ConfigError::TokenTooShort { min: MIN_TOKEN_LEN });
        }
        Ok(())
    }

    /// Writes the config as JSON, readable only by the owner on unix.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
        }

        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// Strips a trailing `/` and `/api` so the report path can be appended.
pub fn normalize_server_url(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    trimmed.strip_suffix("/api").unwrap_or(trimmed).to_string()
}

/// Platform config file location: system-wide for root, per-user otherwise.
pub fn default_config_path() -> PathBuf {
    #[cfg(unix)]
    {
        if nix::unistd::geteuid().is_root() {
            return PathBuf::from("/etc/kaipo-agent/config.json");
        }
    }

    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(".kaipo-agent").join("config.json"),
        None => std::env::temp_dir().join("kaipo-agent").join("config.json"),
    }
}
