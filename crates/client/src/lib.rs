//! Tidings client core
//!
//! The real-time message synchronization core: a single actor task owns
//! the session state machine, the stream subscription, the composition
//! buffer, and the local message feed. Callers hold a cheap-clone
//! [`ChatClientHandle`], send commands over a channel, and read a
//! lock-free snapshot. All feed mutation happens on the actor task, so
//! append order is preserved without locking.

mod client;
mod composer;
mod error;
mod feed;
pub mod session;

pub use client::{
    ChatClient, ChatClientHandle, ClientCommand, ClientConfig, ClientEvent, ClientSnapshot,
};
pub use composer::Composer;
pub use error::ClientError;
pub use feed::{FeedEvent, MessageFeed};
pub use session::SessionPhase;
