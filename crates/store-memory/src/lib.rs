//! In-process implementations of the Tidings store contracts.
//!
//! `MemoryStore` is an append log with server-style monotonic push keys
//! and history-then-live fan-out; `MemoryIdentity` is a settable auth
//! source. Both exist for tests and the local loopback CLI — they obey
//! the same ordering and delivery rules a hosted backend would.

mod identity;
mod store;

pub use identity::MemoryIdentity;
pub use store::MemoryStore;
