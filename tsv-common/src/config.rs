//! Configuration loading for the validation client
//!
//! Each setting is resolved independently, highest priority first:
//! 1. Command-line argument
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default
//!
//! A missing config file never stops the client: a warning is logged and
//! the remaining tiers apply.

use crate::api::ServiceEndpoints;
use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

pub const ENV_SERVICE_URL: &str = "TSV_SERVICE_URL";
pub const ENV_TIMEOUT_SECS: &str = "TSV_TIMEOUT_SECS";
pub const ENV_DOWNLOAD_DIR: &str = "TSV_DOWNLOAD_DIR";
pub const ENV_LOG_LEVEL: &str = "TSV_LOG_LEVEL";

/// Built-in defaults used when no other tier supplies a value
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub service_url: String,
    pub timeout_secs: u64,
    pub download_dir: PathBuf,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
}

impl Default for CompiledDefaults {
    fn default() -> Self {
        Self {
            service_url: "http://127.0.0.1:5000".to_string(),
            timeout_secs: 120,
            download_dir: PathBuf::from("."),
            log_level: "info".to_string(),
            log_file: None,
        }
    }
}

/// Config file contents
///
/// Every key is optional; absent keys fall through to compiled defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub service_url: Option<String>,

    /// Request timeout in seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Where downloaded reports are written
    #[serde(default)]
    pub download_dir: Option<PathBuf>,

    #[serde(default)]
    pub logging: TomlLogging,
}

/// `[logging]` table of the config file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlLogging {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default)]
    pub level: Option<String>,

    /// Log file path (logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

/// Logging configuration after resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<PathBuf>,
}

/// Fully resolved client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub endpoints: ServiceEndpoints,
    pub timeout: Duration,
    pub download_dir: PathBuf,
    pub logging: LoggingConfig,
}

/// Values supplied on the command line (priority 1)
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_file: Option<PathBuf>,
    pub service_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub download_dir: Option<PathBuf>,
    pub log_level: Option<String>,
}

/// Resolves a [`ClientConfig`] from all four tiers
pub struct ConfigResolver {
    overrides: ConfigOverrides,
    defaults: CompiledDefaults,
}

impl ConfigResolver {
    pub fn new(overrides: ConfigOverrides) -> Self {
        Self {
            overrides,
            defaults: CompiledDefaults::default(),
        }
    }

    /// Replace the compiled defaults (tests, embedding)
    pub fn with_defaults(mut self, defaults: CompiledDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn resolve(&self) -> Result<ClientConfig> {
        let toml = self.load_toml()?;

        let service_url = self
            .overrides
            .service_url
            .clone()
            .or_else(|| env_string(ENV_SERVICE_URL))
            .or(toml.service_url)
            .unwrap_or_else(|| self.defaults.service_url.clone());

        let timeout_secs = match self.overrides.timeout_secs {
            Some(secs) => secs,
            None => match env_string(ENV_TIMEOUT_SECS) {
                Some(raw) => raw.parse::<u64>().map_err(|e| {
                    Error::Config(format!("{} must be a whole number of seconds: {}", ENV_TIMEOUT_SECS, e))
                })?,
                None => toml.timeout_secs.unwrap_or(self.defaults.timeout_secs),
            },
        };
        if timeout_secs == 0 {
            return Err(Error::Config("Timeout must be at least 1 second".to_string()));
        }

        let download_dir = self
            .overrides
            .download_dir
            .clone()
            .or_else(|| env_string(ENV_DOWNLOAD_DIR).map(PathBuf::from))
            .or(toml.download_dir)
            .unwrap_or_else(|| self.defaults.download_dir.clone());

        let level = self
            .overrides
            .log_level
            .clone()
            .or_else(|| env_string(ENV_LOG_LEVEL))
            .or(toml.logging.level)
            .unwrap_or_else(|| self.defaults.log_level.clone());

        let endpoints = ServiceEndpoints::parse(&service_url)?;
        debug!(service = %endpoints.base(), timeout_secs, "Configuration resolved");

        Ok(ClientConfig {
            endpoints,
            timeout: Duration::from_secs(timeout_secs),
            download_dir,
            logging: LoggingConfig {
                level,
                file: toml.logging.file.or_else(|| self.defaults.log_file.clone()),
            },
        })
    }

    fn load_toml(&self) -> Result<TomlConfig> {
        // A missing or unreadable file only warns
        let path = match &self.overrides.config_file {
            Some(path) if !path.exists() => {
                warn!("Config file {} not found, using defaults", path.display());
                return Ok(TomlConfig::default());
            }
            Some(path) => path.clone(),
            None => match default_config_path() {
                Some(path) => path,
                None => return Ok(TomlConfig::default()),
            },
        };

        match load_toml_file(&path) {
            Ok(config) => Ok(config),
            Err(e) => {
                warn!("Ignoring config file {}: {}", path.display(), e);
                Ok(TomlConfig::default())
            }
        }
    }
}

/// Parse a TOML config file
pub fn load_toml_file(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
}

/// First existing config file in the platform search order
fn default_config_path() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("tsv").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/tsv/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
