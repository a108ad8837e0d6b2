use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),
}

/// Failures a pairing operation reports back to the requesting connection.
///
/// None of these are fatal to the broker; they travel inside the result
/// message for the request that caused them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RelayError {
    #[error("no live session with that code")]
    SessionNotFound,

    #[error("session already has a connected device")]
    SessionOccupied,

    #[error("malformed request: {0}")]
    InvalidRequest(String),

    #[error("connection is already bound to a session")]
    AlreadyBound,

    #[error("could not allocate a free pairing code after {0} attempts")]
    CodeSpaceExhausted(usize),
}

impl RelayError {
    /// Stable identifier sent on the wire.
    pub fn code(&self) -> &'static str {
        match self {
            RelayError::SessionNotFound => "SessionNotFound",
            RelayError::SessionOccupied => "SessionOccupied",
            RelayError::InvalidRequest(_) => "InvalidRequest",
            RelayError::AlreadyBound => "AlreadyBound",
            RelayError::CodeSpaceExhausted(_) => "CodeSpaceExhausted",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CompanionError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let err = ConfigError::FileNotFound(PathBuf::from("/tmp/missing.toml"));
        assert_eq!(err.to_string(), "config file not found: /tmp/missing.toml");

        let err = ConfigError::ParseError("unexpected token".into());
        assert_eq!(err.to_string(), "config parse error: unexpected token");

        let err = ConfigError::ValidationError("server.port = 0 is out of range".into());
        assert_eq!(
            err.to_string(),
            "config validation error: server.port = 0 is out of range"
        );
    }

    #[test]
    fn relay_error_wire_codes() {
        assert_eq!(RelayError::SessionNotFound.code(), "SessionNotFound");
        assert_eq!(RelayError::SessionOccupied.code(), "SessionOccupied");
        assert_eq!(
            RelayError::InvalidRequest("missing code".into()).code(),
            "InvalidRequest"
        );
        assert_eq!(RelayError::AlreadyBound.code(), "AlreadyBound");
        assert_eq!(
            RelayError::CodeSpaceExhausted(10).code(),
            "CodeSpaceExhausted"
        );
    }

    #[test]
    fn relay_error_display() {
        let err = RelayError::InvalidRequest("missing code".into());
        assert_eq!(err.to_string(), "malformed request: missing code");

        let err = RelayError::CodeSpaceExhausted(1000);
        assert!(err.to_string().contains("1000 attempts"));
    }

    #[test]
    fn companion_error_from_config() {
        let config_err = ConfigError::ParseError("bad toml".into());
        let err: CompanionError = config_err.into();
        assert!(matches!(err, CompanionError::Config(_)));
        assert!(err.to_string().contains("bad toml"));
    }

    #[test]
    fn companion_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::AddrInUse, "port taken");
        let err: CompanionError = io_err.into();
        assert!(matches!(err, CompanionError::Io(_)));
        assert!(err.to_string().contains("port taken"));
    }
}
