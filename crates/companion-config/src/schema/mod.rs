//! Configuration schema types for the relay.
//!
//! All structs use `serde(default)` so partial configs work correctly.

mod logging;
mod server;
mod sessions;

pub use logging::*;
pub use server::*;
pub use sessions::*;

use serde::{Deserialize, Serialize};

/// Root configuration for the relay broker.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanionConfig {
    pub server: ServerConfig,
    pub sessions: SessionsConfig,
    pub logging: LoggingConfig,
}
