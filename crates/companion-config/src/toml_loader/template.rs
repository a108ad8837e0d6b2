//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> String {
    r##"# Companion relay configuration
# Only override what you want to change -- missing fields use defaults.

[server]
# bind = "0.0.0.0"
# port = 3001             # WebSocket pairing protocol
# status_port = 3002      # HTTP status endpoint, 0 disables

[sessions]
# idle_timeout_secs = 0   # 0 = sessions never expire
# reap_interval_secs = 60 # 1-86400
# max_code_attempts = 1000
# outbox_capacity = 256   # per-connection queue, full queue evicts the peer

[logging]
# level = "info"          # trace, debug, info, warn, error
"##
    .to_string()
}
