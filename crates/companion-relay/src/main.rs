//! companion-relay binary: WebSocket pairing broker plus HTTP status port.

use std::path::PathBuf;

use clap::Parser;
use companion_common::CompanionError;
use companion_config::{config_to_json, load_config, CompanionConfig};
use tokio::net::TcpListener;

use companion_relay::code::CodeGenerator;
use companion_relay::gateway::RelayGateway;
use companion_relay::session::MemorySessionStore;
use companion_relay::{connection, reaper, status};

#[derive(Parser)]
#[command(
    name = "companion-relay",
    version,
    about = "Pairing broker relaying editor state to companion viewers"
)]
struct Args {
    /// Config file (defaults to the platform config directory).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to bind.
    #[arg(long)]
    bind: Option<String>,

    /// WebSocket port.
    #[arg(short, long)]
    port: Option<u16>,

    /// HTTP status port, 0 to disable.
    #[arg(long)]
    status_port: Option<u16>,

    /// Expire sessions idle for this many seconds, 0 to disable.
    #[arg(long)]
    idle_timeout: Option<u64>,
}

impl Args {
    fn apply(&self, config: &mut CompanionConfig) {
        if let Some(bind) = &self.bind {
            config.server.bind = bind.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(status_port) = self.status_port {
            config.server.status_port = status_port;
        }
        if let Some(idle) = self.idle_timeout {
            config.sessions.idle_timeout_secs = idle;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), CompanionError> {
    let args = Args::parse();
    let config = load_config(args.config.as_deref(), |c| args.apply(c))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.filter_directive().into()),
        )
        .init();
    tracing::debug!(config = %config_to_json(&config), "Effective configuration");

    let codes = CodeGenerator::new(config.sessions.max_code_attempts as usize);
    let gateway = RelayGateway::with_outbox_capacity(
        MemorySessionStore::new(codes),
        config.sessions.outbox_capacity as usize,
    );

    let addr = config.server.relay_addr();
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("companion-relay listening on {}", addr);

    if let Some(status_addr) = config.server.status_addr() {
        let status_listener = TcpListener::bind(&status_addr).await?;
        tracing::info!("status endpoint on http://{}", status_addr);
        let gateway = gateway.clone();
        tokio::spawn(async move {
            if let Err(e) = status::serve(status_listener, gateway).await {
                tracing::error!(error = %e, "Status endpoint stopped");
            }
        });
    }

    if let Some(idle_timeout) = config.sessions.idle_timeout() {
        tracing::info!(
            idle_secs = idle_timeout.as_secs(),
            "Idle session reaper enabled"
        );
        reaper::spawn_reaper(
            gateway.clone(),
            idle_timeout,
            config.sessions.reap_interval(),
        );
    }

    tokio::select! {
        _ = connection::serve(listener, gateway) => {}
        result = tokio::signal::ctrl_c() => {
            result?;
            tracing::info!("Shutting down");
        }
    }

    Ok(())
}
