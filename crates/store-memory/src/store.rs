//! Append-log message store

use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use futures::future::BoxFuture;
use tidings_protocol::Record;
use tidings_store_core::{ChildEvent, MessageStore, PushKey, StoreError, StoreSubscription};
use tokio::sync::mpsc;
use tracing::debug;

/// In-memory ordered-append collection (cheap to Clone).
///
/// Push keys are millis + a global sequence, zero-padded so that
/// lexicographic order equals append order. Each subscriber gets the
/// full history replayed first, then the live tail; history snapshot
/// and subscriber registration happen under one lock so no append can
/// be dropped or doubled in between.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<StoreInner>>,
}

#[derive(Default)]
struct StoreInner {
    log: Vec<(PushKey, Record)>,
    subscribers: Vec<mpsc::UnboundedSender<ChildEvent>>,
    next_seq: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records in the log.
    pub fn len(&self) -> usize {
        self.lock().log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the log in append order.
    pub fn records(&self) -> Vec<(PushKey, Record)> {
        self.lock().log.clone()
    }

    /// Live subscriber count, after pruning closed channels.
    pub fn subscriber_count(&self) -> usize {
        let mut inner = self.lock();
        inner.subscribers.retain(|tx| !tx.is_closed());
        inner.subscribers.len()
    }

    /// Simulate the backend revoking every active subscription (for
    /// example a permission change mid-stream). Each subscriber gets a
    /// terminal `Cancelled` event and is dropped.
    pub fn cancel_subscriptions(&self, error: StoreError) {
        let mut inner = self.lock();
        for tx in inner.subscribers.drain(..) {
            let _ = tx.send(ChildEvent::Cancelled {
                error: error.clone(),
            });
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn next_key(inner: &mut StoreInner) -> PushKey {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        let seq = inner.next_seq;
        inner.next_seq += 1;
        PushKey::new(format!("{millis:012x}{seq:08x}"))
    }
}

impl MessageStore for MemoryStore {
    fn push(&self, record: Record) -> BoxFuture<'_, Result<PushKey, StoreError>> {
        Box::pin(async move {
            let mut inner = self.lock();
            let key = Self::next_key(&mut inner);
            inner.log.push((key.clone(), record.clone()));

            // Fan out to live subscribers, dropping closed channels.
            inner.subscribers.retain(|tx| {
                tx.send(ChildEvent::Added {
                    key: key.clone(),
                    record: record.clone(),
                })
                .is_ok()
            });

            debug!(
                component = "memory_store",
                key = %key,
                subscribers = inner.subscribers.len(),
                "Record appended"
            );
            Ok(key)
        })
    }

    fn subscribe(&self) -> BoxFuture<'_, Result<StoreSubscription, StoreError>> {
        Box::pin(async move {
            let (tx, rx) = mpsc::unbounded_channel();
            let mut inner = self.lock();

            // History replay: every pre-existing record once, in order.
            for (key, record) in &inner.log {
                let _ = tx.send(ChildEvent::Added {
                    key: key.clone(),
                    record: record.clone(),
                });
            }
            inner.subscribers.push(tx);

            debug!(
                component = "memory_store",
                history = inner.log.len(),
                subscribers = inner.subscribers.len(),
                "Subscription attached"
            );
            Ok(StoreSubscription::new(rx))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(text: &str) -> Record {
        let mut r = Record::new();
        r.insert("text".to_string(), json!(text));
        r
    }

    async fn push(store: &MemoryStore, text: &str) -> PushKey {
        store.push(record(text)).await.expect("push")
    }

    fn added_text(event: ChildEvent) -> String {
        match event {
            ChildEvent::Added { record, .. } => record
                .get("text")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            other => panic!("expected Added, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn push_keys_are_monotonic() {
        let store = MemoryStore::new();
        let a = push(&store, "one").await;
        let b = push(&store, "two").await;
        let c = push(&store, "three").await;
        assert!(a < b && b < c);
    }

    #[tokio::test]
    async fn subscribe_replays_history_then_live_tail() {
        let store = MemoryStore::new();
        push(&store, "one").await;
        push(&store, "two").await;

        let mut sub = store.subscribe().await.expect("subscribe");
        push(&store, "three").await;

        let mut texts = Vec::new();
        for _ in 0..3 {
            texts.push(added_text(sub.recv().await.expect("event")));
        }
        assert_eq!(texts, vec!["one", "two", "three"]);
    }

    #[tokio::test]
    async fn each_subscriber_sees_every_record_exactly_once() {
        let store = MemoryStore::new();
        let mut first = store.subscribe().await.expect("subscribe");
        push(&store, "one").await;
        let mut second = store.subscribe().await.expect("subscribe");
        push(&store, "two").await;

        assert_eq!(added_text(first.recv().await.unwrap()), "one");
        assert_eq!(added_text(first.recv().await.unwrap()), "two");
        assert_eq!(added_text(second.recv().await.unwrap()), "one");
        assert_eq!(added_text(second.recv().await.unwrap()), "two");
    }

    #[tokio::test]
    async fn dropped_subscriber_is_pruned() {
        let store = MemoryStore::new();
        let sub = store.subscribe().await.expect("subscribe");
        assert_eq!(store.subscriber_count(), 1);

        sub.cancel();
        assert_eq!(store.subscriber_count(), 0);

        // Pushing after cancel must not error or deliver anywhere.
        push(&store, "afterwards").await;
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn cancel_subscriptions_delivers_terminal_event() {
        let store = MemoryStore::new();
        let mut sub = store.subscribe().await.expect("subscribe");

        store.cancel_subscriptions(StoreError::PermissionDenied("revoked".into()));
        match sub.recv().await {
            Some(ChildEvent::Cancelled { error }) => {
                assert!(matches!(error, StoreError::PermissionDenied(_)));
            }
            other => panic!("expected Cancelled, got {other:?}"),
        }
        // Channel closed afterwards.
        assert!(sub.recv().await.is_none());
        assert_eq!(store.subscriber_count(), 0);
    }
}
