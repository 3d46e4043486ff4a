//! Tidings store contracts
//!
//! The sync core is purely a client of two external collaborators: an
//! ordered-append message store and an identity provider. This crate
//! defines those contracts as object-safe traits plus the event types
//! delivered through their subscription handles. Any compliant backend
//! can sit behind them; `tidings-store-memory` is the in-process
//! reference implementation.

pub mod identity;
pub mod store;

pub use identity::{AuthUser, AuthWatch, IdentityProvider, SignInOutcome};
pub use store::{ChildEvent, MessageStore, PushKey, StoreError, StoreSubscription};
