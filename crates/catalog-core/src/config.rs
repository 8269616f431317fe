//! catalog.toml configuration parser.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub store: StoreConfig,
    pub watch: WatchConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding the database file. `None` keeps state in memory.
    pub data_dir: Option<PathBuf>,
    pub file_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// How long a blocking query waits before giving up (e.g. "30s", "5m").
    pub default_timeout: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directives used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            file_name: "catalog.redb".to_string(),
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            default_timeout: "5m".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info,catalog_state=debug".to_string(),
        }
    }
}

impl CatalogConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: CatalogConfig = toml::from_str(content)?;
        config.watch.timeout()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

impl StoreConfig {
    /// Full database path, or `None` for an in-memory store.
    pub fn db_path(&self) -> Option<PathBuf> {
        self.data_dir.as_ref().map(|dir| dir.join(&self.file_name))
    }
}

impl WatchConfig {
    pub fn timeout(&self) -> anyhow::Result<Duration> {
        parse_duration(&self.default_timeout)
            .ok_or_else(|| anyhow::anyhow!("invalid watch timeout: {:?}", self.default_timeout))
    }
}

/// Parse a duration: a whole number followed by `ms`, `s`, `m` or `h`.
/// A bare number is seconds. Values that overflow are rejected.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let (amount, unit) = s.split_at(split);
    let amount: u64 = amount.parse().ok()?;
    let secs = match unit.trim() {
        "ms" => return Some(Duration::from_millis(amount)),
        "" | "s" => amount,
        "m" => amount.checked_mul(60)?,
        "h" => amount.checked_mul(3600)?,
        _ => return None,
    };
    Some(Duration::from_secs(secs))
}
