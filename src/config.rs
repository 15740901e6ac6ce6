//! Configuration module for the spectrosim server.
//!
//! Supports both command-line arguments and TOML configuration file.
//! CLI arguments take precedence over config file values. All settings
//! are resolved at startup and immutable for the process lifetime.

use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;

/// Command-line arguments for the spectrometer server
#[derive(Parser, Debug)]
#[command(name = "spectrosim")]
#[command(version = "0.1.0")]
#[command(about = "A TCP server that simulates a laboratory spectrometer", long_about = None)]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Host address to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Lower bound of the wavelength axis in nm
    #[arg(long)]
    pub wavelength_min: Option<f64>,

    /// Upper bound of the wavelength axis in nm
    #[arg(long)]
    pub wavelength_max: Option<f64>,

    /// Number of samples per spectrum
    #[arg(short, long)]
    pub num_points: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// TOML configuration file structure
#[derive(Debug, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub spectrum: SpectrumConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server-related configuration
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Spectrum-generation configuration
#[derive(Debug, Deserialize)]
pub struct SpectrumConfig {
    /// Lower bound of the wavelength axis in nm
    #[serde(default = "default_wavelength_min")]
    pub wavelength_min: f64,
    /// Upper bound of the wavelength axis in nm
    #[serde(default = "default_wavelength_max")]
    pub wavelength_max: f64,
    /// Number of samples per spectrum
    #[serde(default = "default_num_points")]
    pub num_points: usize,
}

impl Default for SpectrumConfig {
    fn default() -> Self {
        Self {
            wavelength_min: default_wavelength_min(),
            wavelength_max: default_wavelength_max(),
            num_points: default_num_points(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    12345
}

fn default_wavelength_min() -> f64 {
    400.0
}

fn default_wavelength_max() -> f64 {
    800.0
}

fn default_num_points() -> usize {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Final resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub wavelength_min: f64,
    pub wavelength_max: f64,
    pub num_points: usize,
    pub log_level: String,
}

impl Config {
    /// Load configuration from CLI args and optional TOML file.
    /// CLI arguments take precedence over TOML file values.
    pub fn load() -> Result<Self, ConfigError> {
        Self::resolve(CliArgs::parse())
    }

    fn resolve(cli: CliArgs) -> Result<Self, ConfigError> {
        // Load TOML config if specified
        let toml_config = if let Some(ref config_path) = cli.config {
            let contents = std::fs::read_to_string(config_path)
                .map_err(|e| ConfigError::FileRead(config_path.clone(), e))?;
            toml::from_str(&contents)
                .map_err(|e| ConfigError::TomlParse(config_path.clone(), e))?
        } else {
            TomlConfig::default()
        };

        // Merge CLI args with TOML config (CLI takes precedence)
        let config = Config {
            host: cli.host.unwrap_or(toml_config.server.host),
            port: cli.port.unwrap_or(toml_config.server.port),
            wavelength_min: cli
                .wavelength_min
                .unwrap_or(toml_config.spectrum.wavelength_min),
            wavelength_max: cli
                .wavelength_max
                .unwrap_or(toml_config.spectrum.wavelength_max),
            num_points: cli.num_points.unwrap_or(toml_config.spectrum.num_points),
            log_level: if cli.log_level != "info" {
                cli.log_level
            } else {
                toml_config.logging.level
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the generator cannot work with.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.num_points < 2 {
            return Err(ConfigError::Invalid(format!(
                "num_points must be at least 2, got {}",
                self.num_points
            )));
        }
        if self.wavelength_min >= self.wavelength_max {
            return Err(ConfigError::Invalid(format!(
                "wavelength range is empty: {} >= {}",
                self.wavelength_min, self.wavelength_max
            )));
        }
        Ok(())
    }

    /// Socket address string for binding.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Configuration loading errors
#[derive(Debug)]
pub enum ConfigError {
    FileRead(PathBuf, std::io::Error),
    TomlParse(PathBuf, toml::de::Error),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::FileRead(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::TomlParse(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::Invalid(msg) => write!(f, "Invalid configuration: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    impl Config {
        /// Defaults with an ephemeral port, for tests.
        pub fn for_tests() -> Self {
            Config {
                host: default_host(),
                port: 0,
                wavelength_min: default_wavelength_min(),
                wavelength_max: default_wavelength_max(),
                num_points: default_num_points(),
                log_level: default_log_level(),
            }
        }
    }

    #[test]
    fn test_default_config() {
        let config = TomlConfig::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 12345);
        assert_eq!(config.spectrum.wavelength_min, 400.0);
        assert_eq!(config.spectrum.wavelength_max, 800.0);
        assert_eq!(config.spectrum.num_points, 1000);
    }

    #[test]
    fn test_toml_parsing() {
        let toml_str = r#"
            [server]
            host = "0.0.0.0"
            port = 5555

            [spectrum]
            wavelength_min = 300.0
            wavelength_max = 900.0
            num_points = 2048

            [logging]
            level = "debug"
        "#;

        let config: TomlConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 5555);
        assert_eq!(config.spectrum.wavelength_min, 300.0);
        assert_eq!(config.spectrum.wavelength_max, 900.0);
        assert_eq!(config.spectrum.num_points, 2048);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_validation_rejects_degenerate_settings() {
        let mut config = Config::for_tests();
        config.num_points = 1;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = Config::for_tests();
        config.wavelength_min = 800.0;
        config.wavelength_max = 400.0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_listen_addr() {
        let config = Config::for_tests();
        assert_eq!(config.listen_addr(), "127.0.0.1:0");
    }
}
