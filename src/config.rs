use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application-level constants
pub const APP_NAME: &str = "Skinsight";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default remote request timeout.
pub const DEFAULT_REMOTE_TIMEOUT_SECS: u64 = 30;

/// Environment overrides, applied on top of the config file.
pub const ENV_REMOTE_ENDPOINT: &str = "SKINSIGHT_REMOTE_ENDPOINT";
pub const ENV_REMOTE_TIMEOUT_SECS: &str = "SKINSIGHT_REMOTE_TIMEOUT_SECS";
pub const ENV_OFFLINE: &str = "SKINSIGHT_OFFLINE";

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "skinsight=info,skinsight_lib=info,warn"
}

/// Get the application config directory
/// (`~/.config/skinsight` on Linux, platform equivalent elsewhere).
pub fn app_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("skinsight"))
}

/// Default config file location.
pub fn default_config_path() -> Option<PathBuf> {
    app_config_dir().map(|dir| dir.join("config.toml"))
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Remote endpoint must be an http(s) URL: {0}")]
    InvalidEndpoint(String),

    #[error("Invalid value for {name}: {value}")]
    InvalidEnv { name: &'static str, value: String },
}

/// Options injected into the analyzer at construction.
///
/// Nothing in the pipeline reads global or environment state; everything
/// it needs arrives through this struct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Scoring provider URL. `None` means local-only.
    pub remote_endpoint: Option<String>,
    /// HTTP timeout for the provider call.
    pub remote_timeout_secs: u64,
    /// Skip the provider even when an endpoint is configured.
    pub offline: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            remote_endpoint: None,
            remote_timeout_secs: DEFAULT_REMOTE_TIMEOUT_SECS,
            offline: false,
        }
    }
}

impl AnalyzerConfig {
    /// Parse and validate TOML config text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file. A missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_toml_str(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file, using defaults");
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Apply overrides from a key lookup (normally `std::env::var`).
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(endpoint) = lookup(ENV_REMOTE_ENDPOINT) {
            let endpoint = endpoint.trim().to_string();
            self.remote_endpoint = if endpoint.is_empty() {
                None
            } else {
                Some(endpoint)
            };
        }
        if let Some(value) = lookup(ENV_REMOTE_TIMEOUT_SECS) {
            self.remote_timeout_secs =
                value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                    name: ENV_REMOTE_TIMEOUT_SECS,
                    value: value.clone(),
                })?;
        }
        if let Some(value) = lookup(ENV_OFFLINE) {
            self.offline = matches!(
                value.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }
        self.validate()?;
        Ok(self)
    }

    /// Overrides from the process environment.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(endpoint) = &self.remote_endpoint {
            if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                return Err(ConfigError::InvalidEndpoint(endpoint.clone()));
            }
        }
        Ok(())
    }

    /// Whether the remote scorer should be attempted at all.
    pub fn remote_enabled(&self) -> bool {
        !self.offline && self.remote_endpoint.is_some()
    }
}
