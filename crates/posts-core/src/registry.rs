//! Registry of live push subscribers.
//!
//! Each subscriber is a bounded outbound queue owned by its connection task.
//! A publish pass makes exactly one non-blocking `try_send` per subscriber; a
//! full or closed queue evicts the subscriber in the same pass, under the same
//! lock that guards membership changes.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::PostsError;
use crate::model::ChangeEvent;

/// Opaque handle for one registered push connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(Uuid);

impl SubscriberId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome of one publish pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub delivered: usize,
    pub dropped: usize,
}

struct Subscriber {
    outbound: mpsc::Sender<ChangeEvent>,
}

impl Subscriber {
    /// Single attempt, no retry.
    fn deliver(&self, id: SubscriberId, event: &ChangeEvent) -> Result<(), PostsError> {
        self.outbound
            .try_send(event.clone())
            .map_err(|e| PostsError::DeliveryFailed {
                subscriber: id,
                reason: match e {
                    TrySendError::Full(_) => "outbound queue full".to_string(),
                    TrySendError::Closed(_) => "connection closed".to_string(),
                },
            })
    }
}

/// Set of currently connected push subscribers.
#[derive(Default)]
pub struct SubscriberRegistry {
    subscribers: Mutex<HashMap<SubscriberId, Subscriber>>,
}

impl SubscriberRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
        }
    }

    pub fn subscribe(&self, outbound: mpsc::Sender<ChangeEvent>) -> SubscriberId {
        let id = SubscriberId::new();
        self.subscribers.lock().insert(id, Subscriber { outbound });
        debug!(subscriber = %id, "Subscriber registered");
        id
    }

    /// Like [`subscribe`](Self::subscribe), but the returned handle
    /// unregisters itself when dropped.
    pub fn subscribe_guarded(
        self: &Arc<Self>,
        outbound: mpsc::Sender<ChangeEvent>,
    ) -> Subscription {
        let id = self.subscribe(outbound);
        Subscription {
            id,
            registry: Arc::downgrade(self),
        }
    }

    /// Removing an absent subscriber is a no-op.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let removed = self.subscribers.lock().remove(&id).is_some();
        if removed {
            debug!(subscriber = %id, "Subscriber removed");
        }
        removed
    }

    pub fn publish(&self, event: &ChangeEvent) -> PublishReport {
        let mut report = PublishReport::default();
        let mut subscribers = self.subscribers.lock();

        subscribers.retain(|id, subscriber| match subscriber.deliver(*id, event) {
            Ok(()) => {
                report.delivered += 1;
                true
            }
            Err(e) => {
                warn!(error = %e, "Evicting subscriber");
                report.dropped += 1;
                false
            }
        });

        report
    }

    #[must_use]
    pub fn contains(&self, id: SubscriberId) -> bool {
        self.subscribers.lock().contains_key(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.subscribers.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscribers.lock().is_empty()
    }
}

/// Registration that lasts as long as this value.
pub struct Subscription {
    id: SubscriberId,
    registry: Weak<SubscriberRegistry>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// False once the registry has evicted this subscriber.
    pub fn is_active(&self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| registry.contains(self.id))
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.unsubscribe(self.id);
        }
    }
}
