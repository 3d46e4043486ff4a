//! Settable identity provider

use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use tidings_store_core::{AuthUser, AuthWatch, IdentityProvider, SignInOutcome};
use tokio::sync::mpsc;
use tracing::debug;

/// In-memory identity provider (cheap to Clone).
///
/// `set_user` drives the auth state directly; `sign_in` plays the role
/// of the external sign-in flow, resolving to whatever user the
/// provider was configured with (or cancelling when there is none).
#[derive(Clone, Default)]
pub struct MemoryIdentity {
    inner: Arc<Mutex<IdentityInner>>,
}

#[derive(Default)]
struct IdentityInner {
    current: Option<AuthUser>,
    sign_in_user: Option<AuthUser>,
    watchers: Vec<mpsc::UnboundedSender<Option<AuthUser>>>,
}

impl MemoryIdentity {
    /// Signed-out provider whose sign-in flow always cancels.
    pub fn new() -> Self {
        Self::default()
    }

    /// Signed-out provider whose sign-in flow resolves to `user`.
    pub fn with_sign_in_user(user: AuthUser) -> Self {
        let identity = Self::default();
        identity.lock().sign_in_user = Some(user);
        identity
    }

    /// Set the current user and notify every registered watch.
    pub fn set_user(&self, user: Option<AuthUser>) {
        let mut inner = self.lock();
        inner.current = user.clone();
        inner.watchers.retain(|tx| tx.send(user.clone()).is_ok());
        debug!(
            component = "memory_identity",
            signed_in = user.is_some(),
            watchers = inner.watchers.len(),
            "Auth state changed"
        );
    }

    /// Live watch count, after pruning dropped watches.
    pub fn watcher_count(&self) -> usize {
        let mut inner = self.lock();
        inner.watchers.retain(|tx| !tx.is_closed());
        inner.watchers.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, IdentityInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl IdentityProvider for MemoryIdentity {
    fn watch(&self) -> AuthWatch {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.lock();
        // Current state is delivered immediately upon registration.
        let _ = tx.send(inner.current.clone());
        inner.watchers.push(tx);
        AuthWatch::new(rx)
    }

    fn sign_in(&self) -> BoxFuture<'_, SignInOutcome> {
        Box::pin(async move {
            let user = self.lock().sign_in_user.clone();
            match user {
                Some(user) => {
                    self.set_user(Some(user));
                    SignInOutcome::Success
                }
                None => SignInOutcome::Cancelled,
            }
        })
    }

    fn sign_out(&self) {
        self.set_user(None);
    }
}
