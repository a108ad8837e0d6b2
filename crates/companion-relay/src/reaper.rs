//! Background sweep that expires idle sessions.

use std::time::Duration;

use tokio::task::JoinHandle;

use crate::gateway::RelayGateway;
use crate::session::SessionStore;

/// Every `interval`, drop sessions with no activity for `idle_timeout`.
pub fn spawn_reaper<S: SessionStore>(
    gateway: RelayGateway<S>,
    idle_timeout: Duration,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;
            let reaped = gateway.reap_idle(idle_timeout).await;
            let count = gateway.session_count().await;
            tracing::debug!(reaped, sessions = count, "Reaper tick");
        }
    })
}
