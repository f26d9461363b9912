use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::common::types::AnyResult;
use crate::configs::*;

const CONFIG_CANDIDATES: [&str; 2] = ["config.toml", "config.default.toml"];

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
    #[serde(default)]
    pub metadata: MetadataConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Loads the first config file found, returning it with the path used.
    pub fn load() -> AnyResult<(Self, &'static str)> {
        let Some(config_path) = CONFIG_CANDIDATES
            .into_iter()
            .find(|p| Path::new(p).exists())
        else {
            return Err("config.toml or config.default.toml not found".into());
        };

        let config_str = std::fs::read_to_string(config_path)?;
        if config_str.trim().is_empty() {
            return Err(format!("{} is empty", config_path).into());
        }

        Ok((Self::parse(&config_str)?, config_path))
    }

    pub fn parse(raw: &str) -> AnyResult<Self> {
        Ok(toml::from_str(raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_partial_file_fills_defaults() {
        let config = Config::parse(
            r#"
            [server]
            port = 4000

            [playback]
            fast_interval_ms = 250
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 4000);
        assert_eq!(config.server.path, "/");
        let timing = config.playback.timing();
        assert_eq!(timing.fast_interval, Duration::from_millis(250));
        assert_eq!(timing.base_interval, Duration::from_secs(5));
        assert_eq!(timing.idle_interval, Duration::from_secs(15));
        assert!(config.metadata.enabled);
        assert_eq!(config.metadata.retries, 1);
    }

    #[test]
    fn test_logging_file_section() {
        let config = Config::parse(
            r#"
            [logging]
            level = "debug"

            [logging.file]
            path = "logs/room.log"
            "#,
        )
        .unwrap();

        let file = config.logging.file.unwrap();
        assert_eq!(file.path, "logs/room.log");
        assert_eq!(file.max_lines, 10_000);
    }

    #[test]
    fn test_fast_threshold_is_clamped() {
        let config = Config::parse("[playback]\nfast_threshold = 3.0\n").unwrap();
        assert_eq!(config.playback.timing().fast_threshold, 1.0);
    }

    #[test]
    fn test_rejects_malformed_toml() {
        assert!(Config::parse("[server\nport = 1").is_err());
    }
}
