//! Configuration loading, validation, env substitution and tracing setup.
//!
//! Config files: `chatter.toml`, `chatter.yaml`, `chatter.yml` or
//! `chatter.json`, searched in `./` then the user config directory
//! (`~/.config/chatter/` on Linux).
//!
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod logging;
pub mod schema;
pub mod validate;

pub use {
    error::{Error, Result},
    loader::{config_dir, discover_and_load, find_config_file, load_config, parse_config},
    logging::init_tracing,
    schema::{BotConfig, ChatterConfig, ConfigFormat, LogFormat, LoggingConfig},
    validate::{Diagnostic, Severity, ValidationResult},
};
