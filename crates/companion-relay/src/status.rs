//! HTTP status endpoint for health checks. Carries no session semantics.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

use crate::gateway::RelayGateway;
use crate::session::SessionStore;

pub const SERVICE_NAME: &str = "Companion Relay";

/// Static service descriptor plus the live session count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    pub status: String,
    pub service: String,
    pub version: String,
    pub sessions: usize,
}

impl ServiceDescriptor {
    pub fn ready(sessions: usize) -> Self {
        Self {
            status: "ok".into(),
            service: SERVICE_NAME.into(),
            version: env!("CARGO_PKG_VERSION").into(),
            sessions,
        }
    }
}

pub fn router<S: SessionStore>(gateway: RelayGateway<S>) -> Router {
    Router::new()
        .route("/", get(status::<S>))
        .with_state(gateway)
}

async fn status<S: SessionStore>(State(gateway): State<RelayGateway<S>>) -> Json<ServiceDescriptor> {
    Json(ServiceDescriptor::ready(gateway.session_count().await))
}

pub async fn serve<S: SessionStore>(
    listener: TcpListener,
    gateway: RelayGateway<S>,
) -> std::io::Result<()> {
    axum::serve(listener, router(gateway)).await
}
