//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use crate::ingest::SourceLayout;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub ingest: IngestConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where source data lives and where reports go
#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    /// Directory that manifest entries are resolved against
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// File listing one source file name per line
    #[serde(default = "default_manifest")]
    pub manifest: String,

    /// Directory for generated report files
    #[serde(default = "default_report_dir")]
    pub report_dir: String,
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_manifest() -> String {
    "data/met_index.txt".to_string()
}

fn default_report_dir() -> String {
    ".".to_string()
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            manifest: default_manifest(),
            report_dir: default_report_dir(),
        }
    }
}

impl DataConfig {
    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir)
    }

    pub fn manifest_path(&self) -> PathBuf {
        PathBuf::from(&self.manifest)
    }

    /// Default report path for a year: `<report_dir>/MonthlyStats_<year>.txt`
    pub fn report_path(&self, year: i32) -> PathBuf {
        Path::new(&self.report_dir).join(format!("MonthlyStats_{}.txt", year))
    }
}

/// Ingestion pipeline configuration
#[derive(Debug, Clone, Deserialize)]
pub struct IngestConfig {
    /// Field delimiter of the source files (single ASCII character)
    #[serde(default = "default_delimiter")]
    pub delimiter: char,

    /// Randomise insertion order to keep the tree shallow
    #[serde(default = "default_shuffle")]
    pub shuffle: bool,

    /// Fixed shuffle seed; a clock-derived seed is used when absent
    #[serde(default)]
    pub shuffle_seed: Option<u64>,

    #[serde(default)]
    pub layout: SourceLayout,
}

fn default_delimiter() -> char {
    ','
}

fn default_shuffle() -> bool {
    true
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            shuffle: default_shuffle(),
            shuffle_seed: None,
            layout: SourceLayout::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content).map_err(|e| match e {
            ConfigError::Parse { error, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                error,
            },
            other => other,
        })
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: PathBuf::new(),
            error: e.to_string(),
        })
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("weatherstore").join("config.toml")),
            Some(PathBuf::from("./weatherstore.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        tracing::debug!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        if let Ok(data_dir) = std::env::var("WEATHERSTORE_DATA_DIR") {
            self.data.data_dir = data_dir;
        }
        if let Ok(manifest) = std::env::var("WEATHERSTORE_MANIFEST") {
            self.data.manifest = manifest;
        }

        if let Ok(seed) = std::env::var("WEATHERSTORE_SEED") {
            match seed.parse() {
                Ok(s) => self.ingest.shuffle_seed = Some(s),
                Err(_) => tracing::warn!("Ignoring non-numeric WEATHERSTORE_SEED: {}", seed),
            }
        }

        if let Ok(level) = std::env::var("WEATHERSTORE_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("WEATHERSTORE_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# weatherstore configuration
#
# Environment variables override these settings:
# - WEATHERSTORE_DATA_DIR
# - WEATHERSTORE_MANIFEST
# - WEATHERSTORE_SEED
# - WEATHERSTORE_LOG_LEVEL
# - WEATHERSTORE_LOG_FORMAT

[data]
# Directory that manifest entries are resolved against
data_dir = "data"

# File listing one source file name per line
manifest = "data/met_index.txt"

# Directory for generated MonthlyStats_<year>.txt reports
report_dir = "."

[ingest]
# Field delimiter of the source files
delimiter = ","

# Shuffle rows before inserting them (keeps the tree shallow)
shuffle = true

# Fixed seed for a reproducible insertion order
# shuffle_seed = 42

[ingest.layout]
# Zero-based column positions
timestamp_column = 0
wind_speed_column = 10
solar_radiation_column = 11
temperature_column = 17

# Rows with fewer fields are skipped
min_fields = 18

# Token for values the station did not record (read as 0.0)
missing_token = "N/A"

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for terminals) or json (for log collectors)
format = "pretty"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.data.data_dir, "data");
        assert_eq!(config.ingest.delimiter, ',');
        assert!(config.ingest.shuffle);
        assert_eq!(config.ingest.shuffle_seed, None);
        assert_eq!(config.ingest.layout, SourceLayout::default());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_default_template_parses() {
        let config = Config::parse(&generate_default_config()).unwrap();
        assert_eq!(config.data.manifest, "data/met_index.txt");
        assert_eq!(config.ingest.layout.temperature_column, 17);
        assert_eq!(config.ingest.layout.missing_token, "N/A");
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config = Config::parse(
            r#"
            [ingest]
            shuffle_seed = 7

            [ingest.layout]
            min_fields = 20
            "#,
        )
        .unwrap();

        assert_eq!(config.ingest.shuffle_seed, Some(7));
        assert!(config.ingest.shuffle);
        assert_eq!(config.ingest.layout.min_fields, 20);
        assert_eq!(config.ingest.layout.wind_speed_column, 10);
        assert_eq!(config.data.data_dir, "data");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[data]\ndata_dir = \"/srv/met\"").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.data.data_dir, "/srv/met");
    }

    #[test]
    fn test_load_errors() {
        let err = Config::load(Path::new("/nonexistent/weatherstore.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[data\nbroken").unwrap();
        match Config::load(file.path()).unwrap_err() {
            ConfigError::Parse { path, .. } => assert_eq!(path, file.path()),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_report_path() {
        let data = DataConfig {
            report_dir: "out".to_string(),
            ..DataConfig::default()
        };
        assert_eq!(data.report_path(2010), PathBuf::from("out/MonthlyStats_2010.txt"));
    }
}
