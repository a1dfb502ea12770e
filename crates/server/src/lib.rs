//! Posts server library
//!
//! One shared post store served over four listeners: REST JSON, an XML
//! request/response endpoint, GraphQL, and a WebSocket push channel that
//! receives every create and update.

pub mod config;
pub mod error;
pub mod handlers;
pub mod router;

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use axum::Router;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

pub use config::{AppState, ServerConfig};

/// Installs the global fmt subscriber, honouring `RUST_LOG` (default `info`).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        // Already set, ignore
    }
}

pub async fn run(config: ServerConfig) -> anyhow::Result<()> {
    info!("=== Posts Server ===");

    let (state, broadcaster) = AppState::new(config.clone());

    let signal_state = state.clone();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, shutting down");
            signal_state.trigger_shutdown();
        }
    });

    let served = tokio::try_join!(
        serve("REST", config.rest_addr, router::rest(state.clone()), &state),
        serve("SOAP", config.soap_addr, router::soap(state.clone()), &state),
        serve("GraphQL", config.graphql_addr, router::graphql(state.clone()), &state),
        serve("WebSocket", config.ws_addr, router::ws(state.clone()), &state),
    );

    ctrl_c.abort();
    // Unblock any listener still running after a sibling failed.
    state.trigger_shutdown();
    drop(state);

    // The broadcaster exits once the last store handle is gone.
    if tokio::time::timeout(Duration::from_secs(2), broadcaster).await.is_err() {
        warn!("Broadcaster did not stop within 2s");
    }

    served.map(|_| ())
}

async fn serve(
    name: &'static str,
    addr: SocketAddr,
    app: Router,
    state: &AppState,
) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {} listener on {}", name, addr))?;
    info!("{} listening on {}", name, listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(state.shutdown_signal())
        .await
        .with_context(|| format!("{} server failed", name))?;

    info!("{} stopped", name);
    Ok(())
}
