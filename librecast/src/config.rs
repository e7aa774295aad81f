//! Configuration management for Recast

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{ConfigError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub scheduling: SchedulingConfig,
    #[serde(default)]
    pub platform: PlatformConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path to the app-data JSON document. Defaults to the XDG data dir.
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulingConfig {
    /// How often the daemon evaluates schedules, in minutes. Also the width
    /// of the due window behind "now".
    #[serde(default = "default_tick_interval_minutes")]
    pub tick_interval_minutes: u64,

    /// Minimum spacing between publish calls, in milliseconds.
    #[serde(default = "default_governor_interval_ms")]
    pub governor_interval_ms: u64,

    /// Publish attempts per account before giving up.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Pause between publish attempts, in seconds.
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
}

fn default_tick_interval_minutes() -> u64 {
    1
}

fn default_governor_interval_ms() -> u64 {
    1000
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay_secs() -> u64 {
    5
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            tick_interval_minutes: default_tick_interval_minutes(),
            governor_interval_ms: default_governor_interval_ms(),
            max_attempts: default_max_attempts(),
            retry_delay_secs: default_retry_delay_secs(),
        }
    }
}

impl SchedulingConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_minutes.max(1) * 60)
    }

    pub fn governor_interval(&self) -> Duration {
        Duration::from_millis(self.governor_interval_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// External posting command invoked per publish. The account is appended
    /// as `--account <name>` and the post content arrives on stdin.
    pub command: Option<String>,
}

impl Config {
    /// Load configuration from the default location. A missing config file
    /// yields the defaults; a malformed one is an error.
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path()?;
        if !config_path.exists() {
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config: Config = toml::from_str(&content).map_err(ConfigError::ParseError)?;
        Ok(config)
    }

    /// Resolve the app-data document path, falling back to the XDG data dir.
    pub fn store_path(&self) -> Result<PathBuf> {
        match &self.store.path {
            Some(path) => Ok(PathBuf::from(shellexpand::tilde(path).to_string())),
            None => Ok(resolve_data_path()?.join("appdata.json")),
        }
    }
}

/// Resolve the configuration file path following XDG Base Directory spec
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("RECAST_CONFIG") {
        return Ok(PathBuf::from(shellexpand::tilde(&path).to_string()));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("recast").join("config.toml"))
}

/// Resolve the data directory path following XDG Base Directory spec
pub fn resolve_data_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
        .ok_or_else(|| ConfigError::MissingField("data directory".to_string()))?;

    Ok(data_dir.join("recast"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.scheduling.tick_interval_minutes, 1);
        assert_eq!(config.scheduling.governor_interval_ms, 1000);
        assert_eq!(config.scheduling.max_attempts, 3);
        assert_eq!(config.scheduling.retry_delay_secs, 5);
        assert!(config.store.path.is_none());
        assert!(config.platform.command.is_none());
    }

    #[test]
    fn test_load_from_path_partial_file_fills_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[store]
path = "/tmp/recast-test/appdata.json"

[scheduling]
tick_interval_minutes = 5
"#
        )
        .unwrap();

        let config = Config::load_from_path(&file.path().to_path_buf()).unwrap();
        assert_eq!(
            config.store.path.as_deref(),
            Some("/tmp/recast-test/appdata.json")
        );
        assert_eq!(config.scheduling.tick_interval_minutes, 5);
        assert_eq!(config.scheduling.max_attempts, 3);
    }

    #[test]
    fn test_load_from_path_rejects_malformed_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[scheduling\ntick_interval_minutes = 5").unwrap();

        let result = Config::load_from_path(&file.path().to_path_buf());
        assert!(result.is_err());
    }

    #[test]
    fn test_tick_interval_floor_is_one_minute() {
        let scheduling = SchedulingConfig {
            tick_interval_minutes: 0,
            ..Default::default()
        };
        assert_eq!(scheduling.tick_interval(), Duration::from_secs(60));
    }

    #[test]
    fn test_store_path_expands_tilde() {
        let config = Config {
            store: StoreConfig {
                path: Some("~/recast/appdata.json".to_string()),
            },
            ..Default::default()
        };
        let path = config.store_path().unwrap();
        assert!(!path.to_string_lossy().starts_with('~'));
        assert!(path.ends_with("recast/appdata.json"));
    }

    #[test]
    #[serial]
    fn test_resolve_config_path_env_override() {
        std::env::set_var("RECAST_CONFIG", "/tmp/recast-test/config.toml");
        let path = resolve_config_path().unwrap();
        assert_eq!(path, PathBuf::from("/tmp/recast-test/config.toml"));
        std::env::remove_var("RECAST_CONFIG");
    }

    #[test]
    #[serial]
    fn test_resolve_config_path_default_location() {
        std::env::remove_var("RECAST_CONFIG");
        let path = resolve_config_path().unwrap();
        assert!(path.ends_with("recast/config.toml"));
    }
}
