//! Ordered-append store contract

use futures::future::BoxFuture;
use thiserror::Error;
use tidings_protocol::Record;
use tokio::sync::mpsc;

/// Errors that can occur against the backing store
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Subscription cancelled by backend: {0}")]
    Cancelled(String),
}

/// Server-assigned append key. Keys are unique and their lexicographic
/// order is the collection's append order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PushKey(String);

impl PushKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PushKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Notifications delivered through a store subscription, in the
/// collection's append order. History replays as `Added` events exactly
/// once, then the live tail follows.
#[derive(Debug, Clone)]
pub enum ChildEvent {
    /// A record was appended (historical or live).
    Added { key: PushKey, record: Record },

    /// An existing record's value changed.
    Changed { key: PushKey, record: Record },

    /// A record was removed.
    Removed { key: PushKey },

    /// A record's ordering changed.
    Moved { key: PushKey },

    /// The backend revoked or cancelled the subscription. No further
    /// events follow.
    Cancelled { error: StoreError },
}

/// A live subscription to the message collection.
///
/// Exactly one consumer drives it via [`StoreSubscription::recv`].
/// Cancelling (or dropping) the handle stops delivery; implementations
/// may register a teardown hook that runs once at that point.
pub struct StoreSubscription {
    events: mpsc::UnboundedReceiver<ChildEvent>,
    teardown: Option<Box<dyn FnOnce() + Send>>,
}

impl StoreSubscription {
    pub fn new(events: mpsc::UnboundedReceiver<ChildEvent>) -> Self {
        Self {
            events,
            teardown: None,
        }
    }

    pub fn with_teardown(
        events: mpsc::UnboundedReceiver<ChildEvent>,
        teardown: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            events,
            teardown: Some(Box::new(teardown)),
        }
    }

    /// Receive the next event. `None` means the backend dropped its end.
    pub async fn recv(&mut self) -> Option<ChildEvent> {
        self.events.recv().await
    }

    /// Explicitly stop delivery. Equivalent to dropping the handle.
    pub fn cancel(self) {}
}

impl Drop for StoreSubscription {
    fn drop(&mut self) {
        if let Some(teardown) = self.teardown.take() {
            teardown();
        }
    }
}

/// The ordered-append collection the chat stream lives in.
///
/// Minimum contract the core depends on: `push` appends a schemaless
/// record under a unique monotonically-ordered server-assigned key;
/// `subscribe` delivers every pre-existing record once, in order, then
/// live appends in order. Methods return boxed futures so the store can
/// live behind `Arc<dyn MessageStore>`.
pub trait MessageStore: Send + Sync {
    fn push(&self, record: Record) -> BoxFuture<'_, Result<PushKey, StoreError>>;

    fn subscribe(&self) -> BoxFuture<'_, Result<StoreSubscription, StoreError>>;
}
