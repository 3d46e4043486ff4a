//! Local message feed
//!
//! The ordered, append-only sequence the presentation layer renders.
//! Only the subscription path appends; observers receive increments and
//! never need the full history re-sent.

use tidings_protocol::Message;
use tokio::sync::mpsc;

/// Incremental feed notifications for observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent {
    Appended(Message),
    Cleared,
}

/// Append-only message sequence with incremental observers.
#[derive(Default)]
pub struct MessageFeed {
    messages: Vec<Message>,
    observers: Vec<mpsc::UnboundedSender<FeedEvent>>,
}

impl MessageFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Copy of the sequence in delivery order.
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.clone()
    }

    /// Register an observer for subsequent increments.
    pub fn observe(&mut self) -> mpsc::UnboundedReceiver<FeedEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.observers.push(tx);
        rx
    }

    /// Append one message and notify observers.
    pub fn append(&mut self, message: Message) {
        self.messages.push(message.clone());
        self.broadcast(FeedEvent::Appended(message));
    }

    /// Drop the whole sequence (sign-out / scope-exit cleanup).
    pub fn clear(&mut self) {
        self.messages.clear();
        self.broadcast(FeedEvent::Cleared);
    }

    fn broadcast(&mut self, event: FeedEvent) {
        // Dropped observers are pruned as a side effect of sending.
        self.observers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}
