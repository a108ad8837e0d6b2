use serde::{Deserialize, Serialize};

/// Listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address both listeners bind to.
    pub bind: String,
    /// WebSocket port for the pairing protocol.
    pub port: u16,
    /// HTTP status port. 0 disables the status endpoint.
    pub status_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".into(),
            port: 3001,
            status_port: 3002,
        }
    }
}

impl ServerConfig {
    pub fn relay_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }

    /// `None` when the status endpoint is disabled.
    pub fn status_addr(&self) -> Option<String> {
        (self.status_port != 0).then(|| format!("{}:{}", self.bind, self.status_port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addresses_from_defaults() {
        let server = ServerConfig::default();
        assert_eq!(server.relay_addr(), "0.0.0.0:3001");
        assert_eq!(server.status_addr().as_deref(), Some("0.0.0.0:3002"));
    }

    #[test]
    fn zero_status_port_disables_endpoint() {
        let server = ServerConfig {
            status_port: 0,
            ..Default::default()
        };
        assert!(server.status_addr().is_none());
    }
}
