/// Configuration for both binaries
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::poller::{PollerSettings, QuietHours};
use crate::push::FcmConfig;
use crate::soc::SocConfig;

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "TRACKER_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config: {message}")]
    Invalid { message: String },
}

/// Top-level configuration. Every field has a default, so a partial file is fine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub db_path: String,
    /// Single-line file naming the primary season (`fall` or `spring`)
    pub season_file: PathBuf,
    pub poll_interval_secs: u64,
    pub dispatch_concurrency: usize,
    pub refresh_concurrency: usize,
    /// How often the watcher checks for commits from other processes
    pub feed_probe_interval_ms: u64,
    /// Skip polling in this local window. `null` disables it.
    pub quiet_hours: Option<QuietHours>,
    pub soc: SocConfig,
    pub push: FcmConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: "data/tracker.db".to_string(),
            season_file: PathBuf::from("season.txt"),
            poll_interval_secs: 15,
            dispatch_concurrency: 4,
            refresh_concurrency: 8,
            feed_probe_interval_ms: 1000,
            quiet_hours: Some(QuietHours::default()),
            soc: SocConfig::default(),
            push: FcmConfig::default(),
        }
    }
}

impl Config {
    /// Loads the config named by `TRACKER_CONFIG`, or `config.json`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load(Path::new(&path))
    }

    /// Loads and validates a config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            info!("No config at {}, using defaults", path.display());
            let config = Self::default();
            config.validate()?;
            return Ok(config);
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::parse(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |message: &str| ConfigError::Invalid {
            message: message.to_string(),
        };

        if self.poll_interval_secs == 0 {
            return Err(invalid("poll_interval_secs must be greater than zero"));
        }
        if self.dispatch_concurrency == 0 || self.refresh_concurrency == 0 {
            return Err(invalid("concurrency limits must be greater than zero"));
        }
        if self.feed_probe_interval_ms == 0 {
            return Err(invalid("feed_probe_interval_ms must be greater than zero"));
        }
        if self.soc.request_timeout_secs == 0 || self.push.request_timeout_secs == 0 {
            return Err(invalid("request timeouts must be greater than zero"));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn feed_probe_interval(&self) -> Duration {
        Duration::from_millis(self.feed_probe_interval_ms)
    }

    pub fn poller_settings(&self) -> PollerSettings {
        PollerSettings {
            interval: self.poll_interval(),
            dispatch_concurrency: self.dispatch_concurrency,
            quiet_hours: self.quiet_hours,
        }
    }
}
