//! Error types for store and registry operations.

use thiserror::Error;

use crate::registry::SubscriberId;

/// Result type for post store operations.
pub type Result<T> = std::result::Result<T, PostsError>;

/// Errors raised at the core boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PostsError {
    #[error("Post {id} not found")]
    NotFound { id: u64 },

    /// Only ever observed inside the registry; the subscriber is dropped.
    #[error("Delivery to subscriber {subscriber} failed: {reason}")]
    DeliveryFailed {
        subscriber: SubscriberId,
        reason: String,
    },
}

impl PostsError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, PostsError::NotFound { .. })
    }
}
