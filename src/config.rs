use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StrataConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub decay: DecaySettings,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub log_level: String,
    /// `"text"` or `"json"`.
    pub log_format: String,
    /// Where the logger persists the audit JSONL, if anywhere.
    pub audit_log_path: Option<String>,
    /// Include sanitized debug fields in error responses.
    pub debug: bool,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    /// Durable root. One `<layer>_memory.db` file per layer lives here.
    pub data_dir: String,
    /// Optional volatile root (e.g. a tmpfs mount). Enables dual-write.
    pub cache_dir: Option<String>,
}

/// Knobs for the temporal-decay engine.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DecaySettings {
    pub enabled: bool,
    /// Base decay rate per day.
    pub base_rate: f64,
    /// Records whose materialized effective importance falls below this are
    /// hidden from default reads.
    pub threshold: f64,
    /// Records at or above this importance never decay.
    pub immortal_threshold: f64,
    pub sweep_interval_minutes: u64,
    pub sweep_batch_size: usize,
}

impl Default for StrataConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            decay: DecaySettings::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
            log_format: "text".into(),
            audit_log_path: None,
            debug: false,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let data_dir = default_strata_dir()
            .join("memory")
            .to_string_lossy()
            .into_owned();
        Self {
            data_dir,
            cache_dir: None,
        }
    }
}

impl Default for DecaySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            base_rate: 0.01,
            threshold: 0.1,
            immortal_threshold: 0.9,
            sweep_interval_minutes: 60,
            sweep_batch_size: 1000,
        }
    }
}

/// Returns `~/.strata/`
pub fn default_strata_dir() -> PathBuf {
    dirs::home_dir()
        .expect("home directory must exist")
        .join(".strata")
}

/// Returns the default config file path: `~/.strata/config.toml`
pub fn default_config_path() -> PathBuf {
    default_strata_dir().join("config.toml")
}

impl StrataConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            StrataConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply `STRATA_*` environment variable overrides.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("STRATA_DATA_DIR") {
            self.storage.data_dir = val;
        }
        if let Ok(val) = std::env::var("STRATA_CACHE_DIR") {
            self.storage.cache_dir = if val.is_empty() { None } else { Some(val) };
        }
        if let Ok(val) = std::env::var("STRATA_LOG_LEVEL") {
            self.server.log_level = val;
        }
        if let Ok(val) = std::env::var("STRATA_LOG_FORMAT") {
            self.server.log_format = val;
        }
        if let Ok(val) = std::env::var("STRATA_AUDIT_LOG") {
            self.server.audit_log_path = if val.is_empty() { None } else { Some(val) };
        }
        if let Ok(val) = std::env::var("STRATA_DEBUG") {
            self.server.debug = matches!(val.as_str(), "1" | "true" | "yes");
        }
        if let Ok(val) = std::env::var("STRATA_DECAY_ENABLED") {
            self.decay.enabled = !matches!(val.as_str(), "0" | "false" | "no");
        }
        if let Ok(val) = std::env::var("STRATA_DECAY_BASE_RATE") {
            if let Ok(parsed) = val.parse() {
                self.decay.base_rate = parsed;
            }
        }
        if let Ok(val) = std::env::var("STRATA_DECAY_THRESHOLD") {
            if let Ok(parsed) = val.parse() {
                self.decay.threshold = parsed;
            }
        }
        if let Ok(val) = std::env::var("STRATA_IMMORTAL_THRESHOLD") {
            if let Ok(parsed) = val.parse() {
                self.decay.immortal_threshold = parsed;
            }
        }
        if let Ok(val) = std::env::var("STRATA_SWEEP_INTERVAL_MINUTES") {
            if let Ok(parsed) = val.parse() {
                self.decay.sweep_interval_minutes = parsed;
            }
        }
        if let Ok(val) = std::env::var("STRATA_SWEEP_BATCH_SIZE") {
            if let Ok(parsed) = val.parse() {
                self.decay.sweep_batch_size = parsed;
            }
        }
    }

    /// Resolve the durable root, expanding `~` if needed.
    pub fn resolved_data_dir(&self) -> PathBuf {
        expand_tilde(&self.storage.data_dir)
    }

    /// Resolve the cache root, expanding `~` if needed.
    pub fn resolved_cache_dir(&self) -> Option<PathBuf> {
        self.storage.cache_dir.as_deref().map(expand_tilde)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir()
            .expect("home directory must exist")
            .join(rest)
    } else {
        PathBuf::from(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = StrataConfig::default();
        assert_eq!(config.server.log_level, "info");
        assert_eq!(config.server.log_format, "text");
        assert!(config.storage.cache_dir.is_none());
        assert!(config.decay.enabled);
        assert!((config.decay.base_rate - 0.01).abs() < f64::EPSILON);
        assert!((config.decay.threshold - 0.1).abs() < f64::EPSILON);
        assert!((config.decay.immortal_threshold - 0.9).abs() < f64::EPSILON);
        assert_eq!(config.decay.sweep_interval_minutes, 60);
        assert_eq!(config.decay.sweep_batch_size, 1000);
        assert!(config.storage.data_dir.ends_with("memory"));
    }

    #[test]
    fn parse_toml_config() {
        let toml_str = r#"
[server]
log_level = "debug"
log_format = "json"

[storage]
data_dir = "/tmp/strata-test"
cache_dir = "/dev/shm/strata-test"

[decay]
base_rate = 0.02
sweep_batch_size = 250
"#;
        let config: StrataConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.log_level, "debug");
        assert_eq!(config.server.log_format, "json");
        assert_eq!(config.storage.data_dir, "/tmp/strata-test");
        assert_eq!(config.storage.cache_dir.as_deref(), Some("/dev/shm/strata-test"));
        assert!((config.decay.base_rate - 0.02).abs() < f64::EPSILON);
        assert_eq!(config.decay.sweep_batch_size, 250);
        // defaults still apply for unset fields
        assert_eq!(config.decay.sweep_interval_minutes, 60);
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = StrataConfig::default();
        std::env::set_var("STRATA_DATA_DIR", "/tmp/override");
        std::env::set_var("STRATA_CACHE_DIR", "/dev/shm/override");
        std::env::set_var("STRATA_LOG_LEVEL", "trace");
        std::env::set_var("STRATA_DECAY_ENABLED", "false");
        std::env::set_var("STRATA_SWEEP_BATCH_SIZE", "42");

        config.apply_env_overrides();

        assert_eq!(config.storage.data_dir, "/tmp/override");
        assert_eq!(config.storage.cache_dir.as_deref(), Some("/dev/shm/override"));
        assert_eq!(config.server.log_level, "trace");
        assert!(!config.decay.enabled);
        assert_eq!(config.decay.sweep_batch_size, 42);

        // Clean up
        std::env::remove_var("STRATA_DATA_DIR");
        std::env::remove_var("STRATA_CACHE_DIR");
        std::env::remove_var("STRATA_LOG_LEVEL");
        std::env::remove_var("STRATA_DECAY_ENABLED");
        std::env::remove_var("STRATA_SWEEP_BATCH_SIZE");
    }
}
