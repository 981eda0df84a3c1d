//! Bootstrap configuration loaded from TOML
//!
//! Settings sources, highest priority first:
//! 1. Command-line arguments
//! 2. Environment variables (`CROPREC_*`, handled by each binary's clap args)
//! 3. TOML configuration file
//! 4. Built-in defaults (code constants below)
//!
//! A missing TOML file is not an error: a warning is logged and defaults
//! apply. A file that exists but cannot be parsed is an error.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use crate::artifact::DEFAULT_ARTIFACT_PATH;
use crate::rainfall::{StaticRainfallTable, BUILTIN_RAINFALL_MM, DEFAULT_RAINFALL_MM};
use crate::Result;

/// Environment variable naming the TOML file
pub const CONFIG_ENV_VAR: &str = "CROPREC_CONFIG";

/// Service configuration file contents
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TomlConfig {
    /// Interface the HTTP server binds to
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Path to the model artifact written by croprec-train
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,

    /// Refuse to start when the artifact's soil encoding differs from the
    /// serving encoding (otherwise only a warning is logged)
    #[serde(default)]
    pub strict_encoding: bool,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub rainfall: RainfallConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Rainfall table overrides
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RainfallConfig {
    /// Rainfall (mm) for cities not in the table
    #[serde(default = "default_rainfall_mm")]
    pub default_mm: f64,

    /// City → rainfall (mm); when non-empty, replaces the built-in cities
    #[serde(default)]
    pub cities: HashMap<String, f64>,
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_model_path() -> PathBuf {
    PathBuf::from(DEFAULT_ARTIFACT_PATH)
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_rainfall_mm() -> f64 {
    DEFAULT_RAINFALL_MM
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            model_path: default_model_path(),
            strict_encoding: false,
            logging: LoggingConfig::default(),
            rainfall: RainfallConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for RainfallConfig {
    fn default() -> Self {
        Self {
            default_mm: default_rainfall_mm(),
            cities: HashMap::new(),
        }
    }
}

impl RainfallConfig {
    /// Build the lookup table these settings describe
    pub fn to_table(&self) -> StaticRainfallTable {
        if self.cities.is_empty() {
            StaticRainfallTable::new(BUILTIN_RAINFALL_MM, self.default_mm)
        } else {
            StaticRainfallTable::new(
                self.cities.iter().map(|(city, mm)| (city.clone(), *mm)),
                self.default_mm,
            )
        }
    }
}

impl TomlConfig {
    /// Parse TOML text
    pub fn parse(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Load from `path`; a missing file yields defaults
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                let config = Self::parse(&contents)?;
                info!("Loaded TOML configuration from {}", path.display());
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(
                    "Config file {} not found, using built-in defaults",
                    path.display()
                );
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Load from an explicit path, else the platform default location, else defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path.map(Path::to_path_buf).or_else(default_config_path) {
            Some(p) => Self::load(&p),
            None => {
                warn!("No config directory on this platform, using built-in defaults");
                Ok(Self::default())
            }
        }
    }
}

/// `<config dir>/croprec/config.toml` (e.g. ~/.config/croprec/config.toml on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("croprec").join("config.toml"))
}
