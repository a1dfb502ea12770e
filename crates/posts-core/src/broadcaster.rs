//! Change-event fan-out.
//!
//! Mutations push events onto an unbounded queue and return immediately. A
//! single background task drains the queue in order and runs one registry
//! publish pass per event, so a slow subscriber never adds latency to a
//! mutation.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::model::ChangeEvent;
use crate::registry::SubscriberRegistry;
use crate::store::EventSender;

/// Producer side of the broadcast queue.
#[derive(Clone)]
pub struct Broadcaster {
    tx: EventSender,
}

impl Broadcaster {
    /// Starts the fan-out task on the current tokio runtime.
    ///
    /// The task runs until every clone of the `Broadcaster` and every sender
    /// handed out by [`sender`](Self::sender) has been dropped.
    pub fn spawn(registry: Arc<SubscriberRegistry>) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(fan_out(rx, registry));
        (Self { tx }, handle)
    }

    /// Sender to hand to [`PostStore::with_events`](crate::PostStore::with_events).
    pub fn sender(&self) -> EventSender {
        self.tx.clone()
    }

    /// Fire-and-forget.
    pub fn publish(&self, event: ChangeEvent) {
        if self.tx.send(event).is_err() {
            warn!("Broadcaster task is gone, event dropped");
        }
    }
}

async fn fan_out(
    mut rx: mpsc::UnboundedReceiver<ChangeEvent>,
    registry: Arc<SubscriberRegistry>,
) {
    info!("Broadcaster started");
    while let Some(event) = rx.recv().await {
        let report = registry.publish(&event);
        debug!(
            id = event.post.id,
            kind = event.kind.as_str(),
            delivered = report.delivered,
            dropped = report.dropped,
            "Published change event"
        );
    }
    info!("Broadcaster stopped");
}
