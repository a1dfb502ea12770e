//! posts-core: the shared state behind every posts-hub front-end.
//!
//! - **store**: the post collection and its identifier allocator, guarded by a
//!   single readers-writer lock.
//! - **registry**: the set of live push subscribers and the per-subscriber
//!   delivery pass.
//! - **broadcaster**: the ordered change-event queue that decouples mutations
//!   from fan-out.

pub mod broadcaster;
pub mod error;
pub mod model;
pub mod registry;
pub mod store;

// Top-level re-exports for common usage
pub use crate::broadcaster::Broadcaster;
pub use crate::error::{PostsError, Result};
pub use crate::model::{ChangeEvent, ChangeKind, Post, PostInput};
pub use crate::registry::{PublishReport, SubscriberId, SubscriberRegistry, Subscription};
pub use crate::store::{EventSender, PostStore};
