//! Configuration for shardmap components

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default config file name (without extension), looked up in the working directory
const CONFIG_FILE: &str = "shardmap";

/// Environment variable prefix (`SHARDMAP_LOG_LEVEL`, `SHARDMAP_TOPOLOGY_PATH`, ...)
const ENV_PREFIX: &str = "SHARDMAP";

/// Global configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging level (EnvFilter directive)
    pub log_level: String,

    /// Topology document (JSON) published by the coordination store
    pub topology_path: PathBuf,

    /// Newline-separated live node ids
    pub live_nodes_path: PathBuf,

    /// Poll interval for `watch`
    pub refresh_interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            topology_path: PathBuf::from("./clusterstate.json"),
            live_nodes_path: PathBuf::from("./live_nodes"),
            refresh_interval_ms: 1_000,
        }
    }
}

impl Config {
    /// Load from `shardmap.toml` (optional) and `SHARDMAP_*` env vars.
    ///
    /// A missing file means defaults; a present but invalid one is an error.
    pub fn try_load() -> crate::Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::with_name(CONFIG_FILE).required(false))
            .add_source(::config::Environment::with_prefix(ENV_PREFIX))
            .build()?;
        let config: Config = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load from an explicit file; env vars still override it.
    pub fn load_from(path: impl AsRef<Path>) -> crate::Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::from(path.as_ref()).required(true))
            .add_source(::config::Environment::with_prefix(ENV_PREFIX))
            .build()?;
        let config: Config = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.refresh_interval_ms == 0 {
            return Err(crate::Error::InvalidConfig(
                "refresh_interval_ms must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }
}
