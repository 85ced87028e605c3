//! TOML configuration file parsing.
//!
//! Defines the structure of the configuration file with serde.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::entity::MonitoredEntity;

use super::ConfigError;

/// Root configuration structure from TOML file.
///
/// All fields are optional to allow partial configuration
/// that can be merged with CLI arguments.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlConfig {
    /// Device connection section
    #[serde(default)]
    pub device: DeviceSection,

    /// Tick cadence section
    #[serde(default)]
    pub monitor: MonitorSection,

    /// Change log section
    #[serde(default)]
    pub output: OutputSection,

    /// Entity catalog, in monitoring order
    #[serde(default)]
    pub entities: Vec<MonitoredEntity>,
}

/// Device connection section.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeviceSection {
    /// Base URL of the device
    pub url: Option<String>,

    /// User name for HTTP Basic authentication
    pub user: Option<String>,

    /// Password for HTTP Basic authentication
    pub password: Option<String>,

    /// State endpoint path template
    pub state_path: Option<String>,
}

/// Tick cadence section.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MonitorSection {
    /// Seconds between ticks
    pub interval: Option<u64>,

    /// Per-fetch timeout in seconds
    pub fetch_timeout: Option<u64>,

    /// Ticks between progress summaries
    pub progress_every: Option<u64>,
}

/// Change log section.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputSection {
    /// Change log destination
    pub path: Option<PathBuf>,
}

impl TomlConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        Self::parse(&content)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::from)
    }
}

/// Generates a default configuration file with comments.
#[must_use]
pub fn default_config_template() -> String {
    r#"# statewatch configuration file

[device]
# Base URL of the device (required)
# url = "http://192.168.1.77"

# HTTP Basic authentication (password defaults to empty)
# user = "admin"
# password = "secret"

# State endpoint, {id} is replaced by the entity id
# state_path = "jdev/sps/io/{id}/state"

[monitor]
# Seconds between ticks (default: 1)
interval = 1

# Upper bound on a single state fetch in seconds (default: 5)
fetch_timeout = 5

# Log a progress summary every N ticks (default: 100)
progress_every = 100

[output]
# Change log destination (default: monitor_YYYYMMDD_HHMMSS.csv)
# path = "monitor.csv"

# Entities to monitor, visited in this order every tick
# Note: --entity on the command line REPLACES this list entirely
# [[entities]]
# id = "0f1e2d3c-0123-4567-89ab-cdef01234567"
# name = "Kitchen Light"
# type = "Switch"
# location = "Kitchen"
"#
    .to_string()
}
