//! Configuration for croprec-api
//!
//! Resolution priority, highest first:
//! 1. Command-line arguments
//! 2. Environment variables (`CROPREC_PORT`, `CROPREC_BIND`, `CROPREC_MODEL_PATH`,
//!    `CROPREC_CONFIG`)
//! 3. TOML config file (see [`croprec_common::config::TomlConfig`])
//! 4. Built-in defaults

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use croprec_common::config::{RainfallConfig, TomlConfig, CONFIG_ENV_VAR};

/// Command-line arguments for croprec-api
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "croprec-api")]
#[command(about = "Crop recommendation prediction service")]
#[command(version)]
pub struct Args {
    /// TOML configuration file (default: <config dir>/croprec/config.toml)
    #[arg(short, long, env = CONFIG_ENV_VAR)]
    pub config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "CROPREC_PORT")]
    pub port: Option<u16>,

    /// Address to bind to
    #[arg(short, long, env = "CROPREC_BIND")]
    pub bind: Option<String>,

    /// Model artifact written by croprec-train
    #[arg(short, long, env = "CROPREC_MODEL_PATH")]
    pub model: Option<PathBuf>,
}

impl Args {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            bind_address: self.bind.clone(),
            port: self.port,
            model_path: self.model.clone(),
        }
    }
}

/// Command-line (or environment) values that win over the TOML file
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub model_path: Option<PathBuf>,
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub bind_address: String,
    pub port: u16,
    pub model_path: PathBuf,
    pub strict_encoding: bool,
    pub log_level: String,
    pub rainfall: RainfallConfig,
}

impl ServiceConfig {
    /// Merge TOML values with overrides
    pub fn resolve(toml_config: TomlConfig, overrides: ConfigOverrides) -> Self {
        Self {
            bind_address: overrides.bind_address.unwrap_or(toml_config.bind_address),
            port: overrides.port.unwrap_or(toml_config.port),
            model_path: overrides.model_path.unwrap_or(toml_config.model_path),
            strict_encoding: toml_config.strict_encoding,
            log_level: toml_config.logging.level,
            rainfall: toml_config.rainfall,
        }
    }

    /// Load the TOML file named by `args` (or the default location) and apply overrides
    pub fn load(args: &Args) -> Result<Self> {
        let toml_config = TomlConfig::load_or_default(args.config.as_deref())
            .context("Failed to load configuration file")?;
        Ok(Self::resolve(toml_config, args.overrides()))
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.bind_address, self.port)
            .parse()
            .with_context(|| format!("Invalid bind address {}:{}", self.bind_address, self.port))
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::resolve(TomlConfig::default(), ConfigOverrides::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServiceConfig::default();
        assert_eq!(config.port, 8000);
        assert_eq!(config.model_path, PathBuf::from("crop_recommender.json"));
        assert_eq!(config.socket_addr().unwrap().to_string(), "127.0.0.1:8000");
    }

    #[test]
    fn test_overrides_win() {
        let toml_config = TomlConfig::parse("port = 9000\nmodel_path = \"toml.json\"\n").unwrap();
        let overrides = ConfigOverrides {
            port: Some(9100),
            ..ConfigOverrides::default()
        };
        let config = ServiceConfig::resolve(toml_config, overrides);
        assert_eq!(config.port, 9100);
        assert_eq!(config.model_path, PathBuf::from("toml.json"));
    }

    #[test]
    fn test_invalid_bind_address() {
        let config = ServiceConfig {
            bind_address: "not an address".to_string(),
            ..ServiceConfig::default()
        };
        assert!(config.socket_addr().is_err());
    }
}
