//! Thread-safe post collection.
//!
//! Every operation, reads included, goes through one `RwLock`. Reads share the
//! lock, mutations hold it exclusively, so no caller can observe a half-applied
//! change to the sequence or the identifier counter.

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::{PostsError, Result};
use crate::model::{ChangeEvent, Post};

/// Ordered queue of change events, drained by the broadcaster.
pub type EventSender = mpsc::UnboundedSender<ChangeEvent>;

struct StoreInner {
    posts: Vec<Post>,
    next_id: u64,
}

/// Exclusive owner of the post collection.
pub struct PostStore {
    inner: RwLock<StoreInner>,
    events: Option<EventSender>,
}

impl Default for PostStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PostStore {
    /// Empty store that emits no change events.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(StoreInner {
                posts: Vec::new(),
                next_id: 1,
            }),
            events: None,
        }
    }

    /// Empty store that enqueues one event per successful create or update.
    #[must_use]
    pub fn with_events(events: EventSender) -> Self {
        Self {
            events: Some(events),
            ..Self::new()
        }
    }

    pub fn create(&self, title: impl Into<String>, content: impl Into<String>) -> Post {
        let mut inner = self.inner.write();
        let post = Post {
            id: inner.next_id,
            title: title.into(),
            content: content.into(),
        };
        inner.next_id += 1;
        inner.posts.push(post.clone());

        // Emitted under the write lock so queue order matches mutation order.
        self.emit(ChangeEvent::created(post.clone()));
        debug!(id = post.id, "Created post");
        post
    }

    #[inline]
    pub fn get(&self, id: u64) -> Result<Post> {
        self.inner
            .read()
            .posts
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or(PostsError::NotFound { id })
    }

    /// Snapshot of every post in storage order.
    #[must_use]
    pub fn list(&self) -> Vec<Post> {
        self.inner.read().posts.clone()
    }

    pub fn update(
        &self,
        id: u64,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Result<Post> {
        let mut inner = self.inner.write();
        let post = inner
            .posts
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(PostsError::NotFound { id })?;
        post.title = title.into();
        post.content = content.into();
        let updated = post.clone();

        self.emit(ChangeEvent::updated(updated.clone()));
        debug!(id, "Updated post");
        Ok(updated)
    }

    /// Removes the post with `id`, keeping the order of the rest.
    pub fn delete(&self, id: u64) -> bool {
        let mut inner = self.inner.write();
        match inner.posts.iter().position(|p| p.id == id) {
            Some(index) => {
                inner.posts.remove(index);
                debug!(id, "Deleted post");
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().posts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().posts.is_empty()
    }

    fn emit(&self, event: ChangeEvent) {
        if let Some(tx) = &self.events {
            if tx.send(event).is_err() {
                warn!("Change event dropped: broadcaster has shut down");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ChangeKind;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_example_scenario() {
        let store = PostStore::new();

        let a = store.create("A", "x");
        assert_eq!(
            a,
            Post {
                id: 1,
                title: "A".into(),
                content: "x".into()
            }
        );
        let b = store.create("B", "y");
        assert_eq!(b.id, 2);

        let a2 = store.update(1, "A2", "x2").unwrap();
        assert_eq!(a2.id, 1);
        assert_eq!(a2.title, "A2");
        assert_eq!(a2.content, "x2");

        let listed = store.list();
        assert_eq!(listed, vec![a2, b]);

        assert!(store.delete(1));
        assert_eq!(store.get(1), Err(PostsError::NotFound { id: 1 }));
    }

    #[test]
    fn test_ids_strictly_increase() {
        let store = PostStore::new();
        let ids: Vec<u64> = (0..50).map(|i| store.create(format!("t{i}"), "c").id).collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(ids[0], 1);
    }

    #[test]
    fn test_ids_never_reused_after_delete() {
        let store = PostStore::new();
        let first = store.create("a", "a");
        let second = store.create("b", "b");
        assert!(store.delete(second.id));
        assert!(store.delete(first.id));
        assert!(store.is_empty());

        let third = store.create("c", "c");
        assert_eq!(third.id, 3);
    }

    #[test]
    fn test_read_your_write() {
        let store = PostStore::new();
        let post = store.create("hello", "world");
        assert_eq!(store.get(post.id).unwrap(), post);
    }

    #[test]
    fn test_update_twice_same_result() {
        let store = PostStore::new();
        let post = store.create("t", "c");
        let first = store.update(post.id, "t2", "c2").unwrap();
        let second = store.update(post.id, "t2", "c2").unwrap();
        assert_eq!(first, second);
        assert_eq!(second.id, post.id);
    }

    #[test]
    fn test_update_missing() {
        let store = PostStore::new();
        store.create("t", "c");
        let err = store.update(42, "x", "y").unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(store.get(1).unwrap().title, "t");
    }

    #[test]
    fn test_delete_missing_leaves_store_unchanged() {
        let store = PostStore::new();
        store.create("a", "1");
        store.create("b", "2");
        let before = store.list();
        assert!(!store.delete(99));
        assert_eq!(store.list(), before);
    }

    #[test]
    fn test_delete_preserves_order() {
        let store = PostStore::new();
        for t in ["a", "b", "c", "d"] {
            store.create(t, "");
        }
        assert!(store.delete(2));
        let titles: Vec<String> = store.list().into_iter().map(|p| p.title).collect();
        assert_eq!(titles, vec!["a", "c", "d"]);
    }

    #[test]
    fn test_list_is_a_snapshot() {
        let store = PostStore::new();
        store.create("a", "1");

        let mut snapshot = store.list();
        snapshot[0].title = "mutated".into();
        snapshot.clear();

        assert_eq!(store.len(), 1);
        assert_eq!(store.get(1).unwrap().title, "a");
    }

    #[test]
    fn test_concurrent_creates() {
        let store = Arc::new(PostStore::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = store.clone();
                std::thread::spawn(move || {
                    (0..100)
                        .map(|i| store.create(format!("{t}-{i}"), "").id)
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut ids = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(ids.insert(id), "duplicate id {id}");
            }
        }

        assert_eq!(ids.len(), 800);
        let listed: HashSet<u64> = store.list().into_iter().map(|p| p.id).collect();
        assert_eq!(listed, ids);
    }

    #[test]
    fn test_events_follow_mutation_order() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let store = PostStore::with_events(tx);

        let a = store.create("a", "1");
        let a2 = store.update(a.id, "a", "2").unwrap();
        assert!(store.update(99, "x", "y").is_err());
        assert!(store.delete(a.id));
        let b = store.create("b", "1");

        let first = rx.try_recv().unwrap();
        assert_eq!(first.kind, ChangeKind::Created);
        assert_eq!(first.post, a);

        let second = rx.try_recv().unwrap();
        assert_eq!(second.kind, ChangeKind::Updated);
        assert_eq!(second.post, a2);

        let third = rx.try_recv().unwrap();
        assert_eq!(third.post, b);

        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_closed_event_queue_does_not_fail_mutations() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let store = PostStore::with_events(tx);
        let post = store.create("still", "works");
        assert_eq!(store.get(post.id).unwrap(), post);
    }
}
