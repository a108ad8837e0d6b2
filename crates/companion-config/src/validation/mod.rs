//! Configuration validation.
//!
//! Checks numeric ranges and listener consistency, collecting every
//! problem into a single `ConfigError`.

mod helpers;


use crate::schema::CompanionConfig;
use companion_common::ConfigError;

use helpers::validate_range;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &CompanionConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    validate_server(&mut errors, config);
    validate_sessions(&mut errors, config);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}

fn validate_server(errors: &mut Vec<String>, config: &CompanionConfig) {
    let server = &config.server;
    validate_range(errors, "server.port", u32::from(server.port), 1, 65535);

    if server.bind.trim().is_empty() {
        errors.push("server.bind must not be empty".into());
    }
    if server.status_port != 0 && server.status_port == server.port {
        errors.push(format!(
            "server.status_port = {} collides with server.port",
            server.status_port
        ));
    }
}

fn validate_sessions(errors: &mut Vec<String>, config: &CompanionConfig) {
    validate_range(
        errors,
        "sessions.reap_interval_secs",
        config.sessions.reap_interval_secs,
        1,
        86400,
    );
    validate_range(
        errors,
        "sessions.max_code_attempts",
        config.sessions.max_code_attempts,
        1,
        1_000_000,
    );
    validate_range(
        errors,
        "sessions.outbox_capacity",
        config.sessions.outbox_capacity,
        1,
        65536,
    );
}
