//! Configuration layer for statewatch.
//!
//! This module provides:
//! - CLI argument parsing ([`Cli`], [`Command`])
//! - TOML configuration file parsing ([`TomlConfig`])
//! - Validated configuration ([`ValidatedConfig`])
//! - Configuration file generation ([`write_default_config`])
//! - Default values ([`defaults`])
//!
//! # Priority
//!
//! Configuration values are resolved with the following priority (highest to lowest):
//!
//! 1. **Explicit CLI arguments** - Values explicitly passed via command line
//! 2. **TOML config file** - Values from the configuration file
//! 3. **Built-in defaults** - Hardcoded default values
//!
//! The device `url` has no default and must come from one of the first two.
//!
//! The entity catalog uses "replace" semantics: any `--entity` on the
//! command line discards the `[[entities]]` list from the file entirely.
//! An empty catalog is not a configuration error; the session refuses to
//! start instead.
//!
//! # Credentials
//!
//! `user` and `password` resolve independently (CLI over TOML) and are
//! combined into an HTTP Basic `Authorization` header. The header is marked
//! sensitive and never appears in the [`ValidatedConfig`] summary.

mod cli;
pub mod defaults;
mod error;
mod toml;
mod validated;

#[cfg(test)]
mod validated_tests;

pub use cli::{Cli, Command};
pub use error::{ConfigError, field};
pub use toml::{TomlConfig, default_config_template};
pub use validated::{ValidatedConfig, write_default_config};
