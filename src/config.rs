//! Runtime configuration for the sampling and persistence cadences.
//!
//! All values have defaults matching the shipped behaviour: a full update
//! every 60 seconds, a live refresh every second, a snapshot flush every
//! 5 minutes, and a 48-hour retention horizon. A config file is optional;
//! when present it is TOML with the same field names.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Hours of history kept in memory and on disk.
pub const RETENTION_HOURS: i64 = 48;

/// Configuration for the history service.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Cadence of the full update tick (battery + all-app CPU + append).
    #[serde(with = "duration_secs")]
    pub update_interval: Duration,
    /// Cadence of the live current-app refresh.
    #[serde(with = "duration_secs")]
    pub live_interval: Duration,
    /// Cadence of the automatic asynchronous snapshot save.
    #[serde(with = "duration_secs")]
    pub save_interval: Duration,
    /// Delay before the post-wake update; hardware may not report sensors
    /// immediately after resume.
    #[serde(with = "duration_secs")]
    pub wake_delay: Duration,
    /// Location of the persisted history snapshot.
    pub history_path: PathBuf,
    /// Process name of the embedding binary, excluded from attribution.
    pub own_process_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            update_interval: Duration::from_secs(60),
            live_interval: Duration::from_secs(1),
            save_interval: Duration::from_secs(300),
            wake_delay: Duration::from_secs(1),
            history_path: PathBuf::from("history.json"),
            own_process_name: "drainwatch".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw).map_err(|e| Error::invalid_data(format!("config {}: {e}", path.display())))
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(d)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_shipping_cadences() {
        let config = Config::default();
        assert_eq!(config.update_interval, Duration::from_secs(60));
        assert_eq!(config.live_interval, Duration::from_secs(1));
        assert_eq!(config.save_interval, Duration::from_secs(300));
    }

    #[test]
    fn partial_toml_overrides_defaults() {
        let config: Config = toml::from_str(
            r#"
            update_interval = 30
            history_path = "/tmp/history.json"
            "#,
        )
        .unwrap();
        assert_eq!(config.update_interval, Duration::from_secs(30));
        assert_eq!(config.history_path, PathBuf::from("/tmp/history.json"));
        assert_eq!(config.live_interval, Duration::from_secs(1));
    }
}
