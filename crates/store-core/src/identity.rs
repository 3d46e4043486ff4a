//! Identity provider contract

use futures::future::BoxFuture;
use tokio::sync::mpsc;

/// The authenticated user as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    /// Providers may omit a display name; such users bind as the
    /// anonymous sentinel.
    pub display_name: Option<String>,
}

impl AuthUser {
    pub fn named(display_name: impl Into<String>) -> Self {
        Self {
            display_name: Some(display_name.into()),
        }
    }
}

/// Result of the external sign-in flow. Consumed only for user-facing
/// feedback; the core reacts to the provider's own state notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignInOutcome {
    Success,
    Cancelled,
}

/// A scoped watch on authentication state.
///
/// Emits the current user-or-none immediately upon registration, then
/// again on every change. Dropping the watch deregisters it.
pub struct AuthWatch {
    events: mpsc::UnboundedReceiver<Option<AuthUser>>,
}

impl AuthWatch {
    pub fn new(events: mpsc::UnboundedReceiver<Option<AuthUser>>) -> Self {
        Self { events }
    }

    /// Next state notification. Outer `None` means the provider went away.
    pub async fn recv(&mut self) -> Option<Option<AuthUser>> {
        self.events.recv().await
    }
}

/// The hosted identity provider the session state machine follows.
pub trait IdentityProvider: Send + Sync {
    /// Register an auth state watch. The current state is delivered
    /// immediately, before any subsequent change.
    fn watch(&self) -> AuthWatch;

    /// Run the external sign-in flow.
    fn sign_in(&self) -> BoxFuture<'_, SignInOutcome>;

    /// Ask the provider to sign out; it will emit a no-user notification
    /// to every registered watch.
    fn sign_out(&self);
}
