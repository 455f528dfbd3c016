/// Host configuration
use crate::error::{CliError, Result};
use beat_playback::PlaybackConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file read when no path is given (optional)
pub const DEFAULT_CONFIG_FILE: &str = "beat.toml";

/// Default tracing filter when neither `RUST_LOG` nor the config sets one
pub const DEFAULT_LOG_FILTER: &str = "beat_cli=info,beat_playback=info,beat_catalog=info";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct BeatConfig {
    #[serde(default)]
    pub playback: PlaybackConfig,

    #[serde(default = "default_catalog")]
    pub catalog: CatalogSettings,

    #[serde(default = "default_device")]
    pub device: DeviceSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogSettings {
    #[serde(default = "default_catalog_path")]
    pub path: PathBuf,

    /// Profile whose new-user flag is followed
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Simulated device timings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeviceSettings {
    #[serde(default = "default_load_latency_ms")]
    pub load_latency_ms: u64,

    #[serde(default = "default_track_length_ms")]
    pub track_length_ms: u64,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoggingSettings {
    /// `EnvFilter` directives; `RUST_LOG` wins when set
    #[serde(default)]
    pub filter: Option<String>,
}

impl BeatConfig {
    /// Load configuration from file and environment
    ///
    /// An explicit `path` must exist; otherwise `beat.toml` in the working
    /// directory is read if present. `BEAT_`-prefixed variables override the
    /// file, with `__` between levels (`BEAT_PLAYBACK__VOLUME=40`).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(CliError::Config(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                settings = settings.add_source(config::File::from(path));
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    settings = settings.add_source(config::File::from(default_path));
                }
            }
        }

        // Override with environment variables (prefixed with BEAT_)
        settings = settings.add_source(
            config::Environment::with_prefix("BEAT")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.playback.volume > 100 {
            return Err(CliError::Config(format!(
                "playback.volume must be 0-100, got {}",
                self.playback.volume
            )));
        }

        if self.playback.sync_interval_ms == 0 {
            return Err(CliError::Config(
                "playback.sync_interval_ms must be greater than 0".to_string(),
            ));
        }

        if self.playback.event_capacity == 0 || self.playback.command_capacity == 0 {
            return Err(CliError::Config(
                "playback channel capacities must be greater than 0".to_string(),
            ));
        }

        if self.device.track_length_ms == 0 {
            return Err(CliError::Config(
                "device.track_length_ms must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Tracing filter directives from the config or the built-in default
    pub fn log_filter(&self) -> &str {
        self.logging.filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }
}

// Default values
fn default_catalog() -> CatalogSettings {
    CatalogSettings {
        path: default_catalog_path(),
        user_id: None,
    }
}

fn default_catalog_path() -> PathBuf {
    PathBuf::from("./catalog.json")
}

fn default_device() -> DeviceSettings {
    DeviceSettings {
        load_latency_ms: default_load_latency_ms(),
        track_length_ms: default_track_length_ms(),
    }
}

fn default_load_latency_ms() -> u64 {
    150
}

fn default_track_length_ms() -> u64 {
    30_000
}

impl Default for CatalogSettings {
    fn default() -> Self {
        default_catalog()
    }
}

impl Default for DeviceSettings {
    fn default() -> Self {
        default_device()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = BeatConfig::default();

        assert!(config.validate().is_ok());
        assert_eq!(config.catalog.path, PathBuf::from("./catalog.json"));
        assert_eq!(config.device.load_latency_ms, 150);
        assert_eq!(config.device.track_length_ms, 30_000);
        assert_eq!(config.playback.sync_interval_ms, 1000);
        assert_eq!(config.log_filter(), DEFAULT_LOG_FILTER);
    }

    #[test]
    fn file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[playback]
volume = 40
shuffle = true

[catalog]
path = "/srv/songs.json"
user_id = "listener-1"

[logging]
filter = "beat_playback=debug"
"#
        )
        .unwrap();

        let config = BeatConfig::load(Some(file.path())).unwrap();

        assert_eq!(config.playback.volume, 40);
        assert!(config.playback.shuffle);
        assert_eq!(config.playback.sync_interval_ms, 1000);
        assert_eq!(config.catalog.path, PathBuf::from("/srv/songs.json"));
        assert_eq!(config.catalog.user_id.as_deref(), Some("listener-1"));
        assert_eq!(config.device.track_length_ms, 30_000);
        assert_eq!(config.log_filter(), "beat_playback=debug");
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let result = BeatConfig::load(Some(Path::new("/definitely/not/here.toml")));
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut config = BeatConfig::default();
        config.playback.volume = 101;
        assert!(config.validate().is_err());

        let mut config = BeatConfig::default();
        config.playback.sync_interval_ms = 0;
        assert!(config.validate().is_err());

        let mut config = BeatConfig::default();
        config.device.track_length_ms = 0;
        assert!(config.validate().is_err());
    }
}
