//! Relay configuration.
//!
//! TOML-based configuration with serde defaults on every section, so an
//! empty or partial file yields a working broker. Values are validated
//! after loading and all range errors are reported together.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use companion_config::load_config;
//!
//! let config = load_config(None, |_| {}).expect("failed to load config");
//! println!("listening on port {}", config.server.port);
//! ```

pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use schema::{CompanionConfig, LogLevel, LoggingConfig, ServerConfig, SessionsConfig};

use companion_common::ConfigError;
use std::path::Path;

/// Load config from `path`, or from the platform default path when `None`,
/// apply `overrides` (command-line flags), then validate the result.
pub fn load_config<F>(path: Option<&Path>, overrides: F) -> Result<CompanionConfig, ConfigError>
where
    F: FnOnce(&mut CompanionConfig),
{
    let mut config = match path {
        Some(p) => toml_loader::load_from_path(p)?,
        None => toml_loader::load_default()?,
    };
    overrides(&mut config);
    validation::validate(&config)?;
    Ok(config)
}

/// Serialize a config to a pretty-printed JSON string.
pub fn config_to_json(config: &CompanionConfig) -> String {
    serde_json::to_string_pretty(config)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize config: {e}\"}}"))
}
