//! Server configuration and shared handler state.
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `rest_addr` | `0.0.0.0:8080` | REST JSON API listener |
//! | `soap_addr` | `0.0.0.0:8081` | XML endpoint listener |
//! | `graphql_addr` | `0.0.0.0:8082` | GraphQL listener |
//! | `ws_addr` | `0.0.0.0:8083` | WebSocket push listener |
//! | `ws_outbound_capacity` | 64 | Per-subscriber queued events before eviction |
//! | `ws_ping_interval` | 30s | Keepalive ping period |
//! | `ws_idle_timeout` | none | Close sockets silent for this long |

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use posts_core::{Broadcaster, PostStore, SubscriberRegistry};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::handlers::graphql::{build_schema, PostSchema};

/// Configuration for the posts server
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    /// REST API listen address
    pub rest_addr: SocketAddr,
    /// XML (SOAP-style) endpoint listen address
    pub soap_addr: SocketAddr,
    /// GraphQL endpoint listen address
    pub graphql_addr: SocketAddr,
    /// WebSocket push listen address
    pub ws_addr: SocketAddr,
    /// Events buffered per WebSocket subscriber; a full buffer evicts it
    pub ws_outbound_capacity: usize,
    /// Keepalive ping period for WebSocket subscribers
    pub ws_ping_interval: Duration,
    /// Close a WebSocket after this long without any inbound frame (pongs count).
    ///
    /// Checked on a timer running at the shorter of this and the ping
    /// interval, so a silent socket closes within one check period of the limit.
    pub ws_idle_timeout: Option<Duration>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            rest_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            soap_addr: SocketAddr::from(([0, 0, 0, 0], 8081)),
            graphql_addr: SocketAddr::from(([0, 0, 0, 0], 8082)),
            ws_addr: SocketAddr::from(([0, 0, 0, 0], 8083)),
            ws_outbound_capacity: 64,
            ws_ping_interval: Duration::from_secs(30),
            ws_idle_timeout: None,
        }
    }
}

/// App state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub store: Arc<PostStore>,
    pub registry: Arc<SubscriberRegistry>,
    pub schema: PostSchema,
    shutdown: Arc<watch::Sender<bool>>,
}

impl AppState {
    /// Builds an empty store wired to a freshly spawned broadcaster.
    ///
    /// Must be called from within a tokio runtime. The returned handle is the
    /// broadcaster task; it finishes once every clone of the state is gone.
    pub fn new(config: ServerConfig) -> (Self, JoinHandle<()>) {
        let registry = Arc::new(SubscriberRegistry::new());
        let (broadcaster, task) = Broadcaster::spawn(registry.clone());
        let store = Arc::new(PostStore::with_events(broadcaster.sender()));
        let schema = build_schema(store.clone());
        let (shutdown, _) = watch::channel(false);

        let state = Self {
            config: Arc::new(config),
            store,
            registry,
            schema,
            shutdown: Arc::new(shutdown),
        };
        (state, task)
    }

    /// Resolves once [`trigger_shutdown`](Self::trigger_shutdown) has been called.
    pub fn shutdown_signal(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut rx = self.shutdown.subscribe();
        async move {
            let _ = rx.wait_for(|stop| *stop).await;
        }
    }

    pub fn trigger_shutdown(&self) {
        self.shutdown.send_replace(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.rest_addr.port(), 8080);
        assert_eq!(config.soap_addr.port(), 8081);
        assert_eq!(config.graphql_addr.port(), 8082);
        assert_eq!(config.ws_addr.port(), 8083);
        assert_eq!(config.ws_outbound_capacity, 64);
        assert!(config.ws_idle_timeout.is_none());
    }

    #[test]
    fn test_partial_override() {
        let config = ServerConfig {
            ws_outbound_capacity: 4,
            ..Default::default()
        };
        assert_eq!(config.ws_outbound_capacity, 4);
        assert_eq!(config.ws_ping_interval, Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_shutdown_signal_fires() {
        let (state, _task) = AppState::new(ServerConfig::default());
        let signal = state.shutdown_signal();
        state.trigger_shutdown();
        tokio::time::timeout(Duration::from_secs(1), signal)
            .await
            .expect("shutdown signal did not resolve");
    }

    #[tokio::test]
    async fn test_signal_created_after_trigger_resolves() {
        let (state, _task) = AppState::new(ServerConfig::default());
        state.trigger_shutdown();
        tokio::time::timeout(Duration::from_secs(1), state.shutdown_signal())
            .await
            .expect("late subscriber missed shutdown");
    }

    #[tokio::test]
    async fn test_store_mutations_reach_registry() {
        let (state, _task) = AppState::new(ServerConfig::default());
        let (tx, mut rx) = tokio::sync::mpsc::channel(4);
        state.registry.subscribe(tx);

        let post = state.store.create("hello", "world");
        let event = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.post, post);
    }
}
