//! Validated configuration after merging CLI and TOML sources.
//!
//! This module contains the final, validated configuration that is used
//! by the application. All validation is performed during construction.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use http::HeaderMap;
use http::header::{AUTHORIZATION, HeaderValue};
use url::Url;

use crate::entity::MonitoredEntity;
use crate::fetch::{DEFAULT_STATE_PATH, ID_PLACEHOLDER};
use crate::monitor::SessionConfig;

use super::cli::Cli;
use super::defaults;
use super::error::{ConfigError, field};
use super::toml::TomlConfig;

/// Fully validated configuration ready for use by the application.
///
/// # Construction
///
/// Use [`ValidatedConfig::from_raw`] to create from CLI args and optional TOML config.
/// The function validates all inputs and returns errors for invalid configurations.
#[derive(Debug)]
pub struct ValidatedConfig {
    /// Device base URL (required)
    pub url: Url,

    /// State endpoint template, contains [`ID_PLACEHOLDER`]
    pub state_path: String,

    /// Headers attached to every state request (Basic auth when configured)
    pub headers: HeaderMap,

    /// Time between ticks
    pub interval: Duration,

    /// Upper bound on a single fetch
    pub fetch_timeout: Duration,

    /// Ticks between progress summaries
    pub progress_every: u64,

    /// Change log destination
    pub output: PathBuf,

    /// Entities to monitor, in catalog order
    pub entities: Vec<MonitoredEntity>,

    /// Verbose logging enabled
    pub verbose: bool,
}

impl fmt::Display for ValidatedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut url = self.url.clone();
        // Both setters only fail for URLs that cannot carry credentials.
        let _ = url.set_password(None);
        let _ = url.set_username("");

        write!(
            f,
            "Config {{ url: {}, state_path: {}, auth: {}, entities: {}, interval: {}s, \
             fetch_timeout: {}s, progress_every: {}, output: {} }}",
            url,
            self.state_path,
            if self.headers.contains_key(AUTHORIZATION) {
                "basic"
            } else {
                "none"
            },
            self.entities.len(),
            self.interval.as_secs(),
            self.fetch_timeout.as_secs(),
            self.progress_every,
            self.output.display(),
        )
    }
}

impl ValidatedConfig {
    /// Creates a validated configuration from CLI arguments and optional TOML config.
    ///
    /// CLI arguments take precedence over TOML config values.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The URL is missing or is not an absolute base URL
    /// - A duration or the progress interval is zero
    /// - The state path lacks the `{id}` placeholder
    /// - An entity id is empty or repeated
    /// - Credentials cannot form a header
    pub fn from_raw(cli: &Cli, toml: Option<&TomlConfig>) -> Result<Self, ConfigError> {
        let url = Self::resolve_url(cli, toml)?;
        let state_path = Self::resolve_state_path(cli, toml)?;
        let headers = Self::resolve_headers(cli, toml)?;

        let interval = resolve_secs(
            "interval",
            cli.interval,
            toml.and_then(|t| t.monitor.interval),
            defaults::INTERVAL_SECS,
        )?;
        let fetch_timeout = resolve_secs(
            "fetch_timeout",
            cli.fetch_timeout,
            toml.and_then(|t| t.monitor.fetch_timeout),
            defaults::FETCH_TIMEOUT_SECS,
        )?;
        let progress_every = Self::resolve_progress_every(cli, toml)?;

        let output = Self::resolve_output(cli, toml);
        let entities = Self::resolve_entities(cli, toml)?;

        Ok(Self {
            url,
            state_path,
            headers,
            interval,
            fetch_timeout,
            progress_every,
            output,
            entities,
            verbose: cli.verbose,
        })
    }

    /// Loads and merges configuration from CLI and optional config file.
    ///
    /// If `cli.config` is set, loads the TOML file from that path.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The config file cannot be read or parsed
    /// - The merged configuration is invalid
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let toml = if let Some(ref path) = cli.config {
            Some(TomlConfig::load(path)?)
        } else {
            None
        };

        Self::from_raw(cli, toml.as_ref())
    }

    /// Builds the session configuration for the monitor.
    #[must_use]
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::new(self.entities.clone(), self.output.clone())
            .with_interval(self.interval)
            .with_fetch_timeout(self.fetch_timeout)
            .with_progress_every(self.progress_every)
    }

    fn resolve_url(cli: &Cli, toml: Option<&TomlConfig>) -> Result<Url, ConfigError> {
        let url_str = cli
            .url
            .as_deref()
            .or_else(|| toml.and_then(|t| t.device.url.as_deref()))
            .ok_or_else(|| {
                ConfigError::missing(field::URL, "Use --url or set device.url in config file")
            })?;

        let url = Url::parse(url_str).map_err(|e| ConfigError::InvalidUrl {
            url: url_str.to_string(),
            reason: e.to_string(),
        })?;

        if url.cannot_be_a_base() {
            return Err(ConfigError::InvalidUrl {
                url: url_str.to_string(),
                reason: "not a base URL".to_string(),
            });
        }

        Ok(url)
    }

    fn resolve_state_path(cli: &Cli, toml: Option<&TomlConfig>) -> Result<String, ConfigError> {
        let path = cli
            .state_path
            .as_deref()
            .or_else(|| toml.and_then(|t| t.device.state_path.as_deref()))
            .unwrap_or(DEFAULT_STATE_PATH);

        if !path.split('/').any(|segment| segment == ID_PLACEHOLDER) {
            return Err(ConfigError::InvalidStatePath {
                path: path.to_string(),
            });
        }

        Ok(path.to_string())
    }

    fn resolve_headers(cli: &Cli, toml: Option<&TomlConfig>) -> Result<HeaderMap, ConfigError> {
        let mut headers = HeaderMap::new();

        let user = cli
            .user
            .as_deref()
            .or_else(|| toml.and_then(|t| t.device.user.as_deref()));
        let password = cli
            .password
            .as_deref()
            .or_else(|| toml.and_then(|t| t.device.password.as_deref()));

        match (user, password) {
            (Some(user), password) => {
                headers.insert(AUTHORIZATION, basic_auth(user, password.unwrap_or(""))?);
            }
            (None, Some(_)) => {
                return Err(ConfigError::InvalidCredentials {
                    reason: "password given without a user".to_string(),
                });
            }
            (None, None) => {}
        }

        Ok(headers)
    }

    fn resolve_progress_every(cli: &Cli, toml: Option<&TomlConfig>) -> Result<u64, ConfigError> {
        let every = cli
            .progress_every
            .or_else(|| toml.and_then(|t| t.monitor.progress_every))
            .unwrap_or(defaults::PROGRESS_EVERY);

        if every == 0 {
            return Err(ConfigError::InvalidProgressInterval);
        }

        Ok(every)
    }

    fn resolve_output(cli: &Cli, toml: Option<&TomlConfig>) -> PathBuf {
        cli.output
            .clone()
            .or_else(|| toml.and_then(|t| t.output.path.clone()))
            .unwrap_or_else(|| {
                PathBuf::from(
                    chrono::Local::now()
                        .format(defaults::OUTPUT_FILE_PATTERN)
                        .to_string(),
                )
            })
    }

    fn resolve_entities(
        cli: &Cli,
        toml: Option<&TomlConfig>,
    ) -> Result<Vec<MonitoredEntity>, ConfigError> {
        // CLI entities replace the TOML catalog entirely
        let entities = if cli.entities.is_empty() {
            toml.map(|t| t.entities.clone()).unwrap_or_default()
        } else {
            cli.entities
                .iter()
                .map(|spec| parse_entity_spec(spec))
                .collect::<Result<Vec<_>, _>>()?
        };

        let mut seen = HashSet::new();
        for entity in &entities {
            if entity.id.trim().is_empty() {
                return Err(ConfigError::InvalidEntity {
                    value: entity.display_name.clone(),
                    reason: "id must not be empty",
                });
            }
            if !seen.insert(entity.id.as_str()) {
                return Err(ConfigError::DuplicateEntity {
                    id: entity.id.clone(),
                });
            }
        }

        Ok(entities)
    }
}

/// Writes the default configuration template to a file.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_default_config(path: &Path) -> Result<(), ConfigError> {
    let template = super::toml::default_config_template();
    std::fs::write(path, template).map_err(|e| ConfigError::FileWrite {
        path: path.to_path_buf(),
        source: e,
    })
}

// Helper functions

fn resolve_secs(
    field: &'static str,
    cli: Option<u64>,
    toml: Option<u64>,
    default: u64,
) -> Result<Duration, ConfigError> {
    // Priority: CLI explicit > TOML > default
    let seconds = cli.or(toml).unwrap_or(default);

    if seconds == 0 {
        return Err(ConfigError::InvalidDuration {
            field,
            reason: "must be greater than 0".to_string(),
        });
    }

    Ok(Duration::from_secs(seconds))
}

/// Parses `ID` or `ID=Display Name`.
fn parse_entity_spec(spec: &str) -> Result<MonitoredEntity, ConfigError> {
    let (id, name) = match spec.split_once('=') {
        Some((id, name)) => (id.trim(), Some(name.trim())),
        None => (spec.trim(), None),
    };

    if id.is_empty() {
        return Err(ConfigError::InvalidEntity {
            value: spec.to_string(),
            reason: "id must not be empty",
        });
    }

    let entity = MonitoredEntity::new(id);
    Ok(match name {
        Some(name) if !name.is_empty() => entity.with_name(name),
        _ => entity,
    })
}

fn basic_auth(user: &str, password: &str) -> Result<HeaderValue, ConfigError> {
    let encoded = STANDARD.encode(format!("{user}:{password}"));
    let mut value = HeaderValue::from_str(&format!("Basic {encoded}")).map_err(|e| {
        ConfigError::InvalidCredentials {
            reason: e.to_string(),
        }
    })?;
    value.set_sensitive(true);
    Ok(value)
}
