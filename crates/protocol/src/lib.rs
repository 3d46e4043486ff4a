//! Tidings Protocol
//!
//! Shared types exchanged between the Tidings client core and the
//! ordered-append message store. Messages are serialized as schemaless
//! JSON records; decoding is fail-soft because the store may hold
//! partially-written or legacy records.

use uuid::Uuid;

pub mod message;

pub use message::{Message, Record};

/// Reserved author name meaning "no authenticated identity".
pub const ANONYMOUS: &str = "anonymous";

/// Default hard cap on message text length, in characters.
pub const DEFAULT_MESSAGE_CHAR_LIMIT: usize = 1000;

/// Generate a new unique ID
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}
