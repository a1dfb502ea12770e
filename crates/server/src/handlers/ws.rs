//! WebSocket push channel.
//!
//! Each connection owns one guarded registry subscription with a bounded
//! outbound queue. The task forwards queued change events as JSON text
//! frames and otherwise waits on its own inbound stream to notice the peer
//! going away.

use std::time::{Duration, Instant};

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use posts_core::ChangeEvent;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::AppState;

const MIN_PING_INTERVAL: Duration = Duration::from_secs(1);
const MIN_CHECK_INTERVAL: Duration = Duration::from_millis(100);

/// GET /ws
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Period of the keepalive timer: the ping interval, shortened to the idle
/// timeout when that is smaller so idle peers are closed on time.
fn check_interval(ping: Duration, idle_timeout: Option<Duration>) -> Duration {
    idle_timeout
        .map_or(ping, |idle| ping.min(idle))
        .max(MIN_CHECK_INTERVAL)
}

/// Frame payload for one change event: the post itself.
pub fn encode_event(event: &ChangeEvent) -> serde_json::Result<String> {
    serde_json::to_string(&event.post)
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (tx, mut rx) = mpsc::channel(state.config.ws_outbound_capacity.max(1));
    let subscription = state.registry.subscribe_guarded(tx);
    let subscriber = subscription.id();
    info!(subscriber = %subscriber, live = state.registry.len(), "WebSocket subscriber connected");

    let (mut sink, mut stream) = socket.split();
    let ping_interval = state.config.ws_ping_interval.max(MIN_PING_INTERVAL);
    let idle_timeout = state.config.ws_idle_timeout;
    let mut keepalive = tokio::time::interval(check_interval(ping_interval, idle_timeout));
    keepalive.tick().await;
    let mut last_inbound = Instant::now();
    let mut last_ping = Instant::now();
    let shutdown = state.shutdown_signal();
    tokio::pin!(shutdown);

    let reason = loop {
        tokio::select! {
            outbound = rx.recv() => {
                let Some(event) = outbound else {
                    break "evicted";
                };
                let frame = match encode_event(&event) {
                    Ok(frame) => frame,
                    Err(e) => {
                        warn!(subscriber = %subscriber, "Failed to encode event: {}", e);
                        continue;
                    }
                };
                if let Err(e) = sink.send(Message::Text(frame.into())).await {
                    debug!(subscriber = %subscriber, "Write failed: {}", e);
                    break "write failed";
                }
            }
            inbound = stream.next() => match inbound {
                Some(Ok(Message::Close(_))) | None => break "peer closed",
                Some(Ok(_)) => last_inbound = Instant::now(),
                Some(Err(e)) => {
                    debug!(subscriber = %subscriber, "Read failed: {}", e);
                    break "read failed";
                }
            },
            _ = keepalive.tick() => {
                if idle_timeout.is_some_and(|limit| last_inbound.elapsed() >= limit) {
                    break "idle timeout";
                }
                if last_ping.elapsed() >= ping_interval {
                    if sink.send(Message::Ping(Bytes::new())).await.is_err() {
                        break "write failed";
                    }
                    last_ping = Instant::now();
                }
            }
            _ = &mut shutdown => break "server shutdown",
        }
    };

    drop(subscription);
    let _ = sink.close().await;
    info!(subscriber = %subscriber, reason, "WebSocket subscriber disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;
    use posts_core::Post;

    #[test]
    fn test_check_interval_follows_shorter_timer() {
        let ping = Duration::from_secs(30);
        assert_eq!(check_interval(ping, None), ping);
        assert_eq!(
            check_interval(ping, Some(Duration::from_secs(5))),
            Duration::from_secs(5)
        );
        assert_eq!(check_interval(ping, Some(Duration::from_secs(60))), ping);
        assert_eq!(
            check_interval(ping, Some(Duration::from_millis(1))),
            MIN_CHECK_INTERVAL
        );
    }

    #[test]
    fn test_frame_is_bare_post() {
        let event = ChangeEvent::updated(Post {
            id: 2,
            title: "B".into(),
            content: "y".into(),
        });
        let frame = encode_event(&event).unwrap();
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value, serde_json::json!({"id": 2, "title": "B", "content": "y"}));
    }
}
