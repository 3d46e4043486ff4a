//! Pure session state transition function
//!
//! All business logic for auth-driven session changes lives here as a
//! pure, synchronous function: `transition(phase, user) -> (phase, effects)`.
//! No IO, no async, no locking — fully unit-testable. The actor executes
//! the returned effects in order.

use tidings_protocol::ANONYMOUS;
use tidings_store_core::AuthUser;

/// The local view of "who is using this client right now".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionPhase {
    /// No determination from the identity provider yet.
    Unknown,
    SignedOut,
    SignedIn { username: String },
}

impl SessionPhase {
    /// The author name outgoing messages would carry in this phase.
    /// Never empty: non-signed-in phases bind the anonymous sentinel.
    pub fn username(&self) -> &str {
        match self {
            SessionPhase::SignedIn { username } => username,
            SessionPhase::Unknown | SessionPhase::SignedOut => ANONYMOUS,
        }
    }

    pub fn is_signed_in(&self) -> bool {
        matches!(self, SessionPhase::SignedIn { .. })
    }
}

/// Side effects to be executed by the caller, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Bind the username used for outgoing messages.
    BindUsername(String),
    /// Attach the stream subscription (idempotent at the executor).
    AttachStream,
    /// Detach the stream subscription (idempotent at the executor).
    DetachStream,
    /// Clear the local presentation sequence.
    ClearFeed,
    /// Launch the external sign-in flow.
    LaunchSignIn,
}

/// Apply an identity-provider notification to the session.
///
/// On entry to `SignedIn`: bind the username, then attach. On entry to
/// `SignedOut` (from any state, including a repeated no-user report):
/// reset the username to the sentinel, clear the feed, detach, and
/// launch sign-in. The cleanup effects are idempotent so the repeated
/// branch is safe.
pub fn transition(phase: &SessionPhase, user: Option<&AuthUser>) -> (SessionPhase, Vec<Effect>) {
    match (phase, user) {
        (_, Some(user)) => {
            let username = user
                .display_name
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .unwrap_or(ANONYMOUS)
                .to_string();
            (
                SessionPhase::SignedIn {
                    username: username.clone(),
                },
                vec![Effect::BindUsername(username), Effect::AttachStream],
            )
        }
        // Entry to SignedOut from any state, including a repeated no-user
        // report: the cleanup effects are idempotent at the executor.
        (_, None) => (
            SessionPhase::SignedOut,
            vec![
                Effect::BindUsername(ANONYMOUS.to_string()),
                Effect::ClearFeed,
                Effect::DetachStream,
                Effect::LaunchSignIn,
            ],
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(name: &str) -> AuthUser {
        AuthUser::named(name)
    }

    #[test]
    fn unknown_to_signed_in_binds_then_attaches() {
        let (next, effects) = transition(&SessionPhase::Unknown, Some(&user("alice")));
        assert_eq!(
            next,
            SessionPhase::SignedIn {
                username: "alice".to_string()
            }
        );
        assert_eq!(
            effects,
            vec![
                Effect::BindUsername("alice".to_string()),
                Effect::AttachStream
            ]
        );
    }

    #[test]
    fn unknown_to_signed_out_cleans_up_and_launches_sign_in() {
        let (next, effects) = transition(&SessionPhase::Unknown, None);
        assert_eq!(next, SessionPhase::SignedOut);
        assert_eq!(
            effects,
            vec![
                Effect::BindUsername(ANONYMOUS.to_string()),
                Effect::ClearFeed,
                Effect::DetachStream,
                Effect::LaunchSignIn,
            ]
        );
    }

    #[test]
    fn signed_in_to_signed_in_rebinds() {
        let from = SessionPhase::SignedIn {
            username: "alice".to_string(),
        };
        let (next, effects) = transition(&from, Some(&user("bob")));
        assert_eq!(
            next,
            SessionPhase::SignedIn {
                username: "bob".to_string()
            }
        );
        assert_eq!(effects[0], Effect::BindUsername("bob".to_string()));
        // Attach is re-issued; the executor's idempotence guard makes it a no-op.
        assert!(effects.contains(&Effect::AttachStream));
    }

    #[test]
    fn signed_in_to_signed_out() {
        let from = SessionPhase::SignedIn {
            username: "alice".to_string(),
        };
        let (next, effects) = transition(&from, None);
        assert_eq!(next, SessionPhase::SignedOut);
        assert!(effects.contains(&Effect::DetachStream));
        assert!(effects.contains(&Effect::ClearFeed));
        assert!(effects.contains(&Effect::LaunchSignIn));
    }

    #[test]
    fn signed_out_to_signed_in() {
        let (next, effects) = transition(&SessionPhase::SignedOut, Some(&user("bob")));
        assert!(next.is_signed_in());
        assert_eq!(next.username(), "bob");
        assert!(effects.contains(&Effect::AttachStream));
    }

    #[test]
    fn repeated_no_user_report_is_safe() {
        let (next, effects) = transition(&SessionPhase::SignedOut, None);
        assert_eq!(next, SessionPhase::SignedOut);
        assert!(effects.contains(&Effect::LaunchSignIn));
    }

    #[test]
    fn user_without_display_name_binds_sentinel() {
        let anonymous = AuthUser { display_name: None };
        let (next, _) = transition(&SessionPhase::Unknown, Some(&anonymous));
        assert_eq!(next.username(), ANONYMOUS);
    }

    #[test]
    fn blank_display_name_binds_sentinel() {
        let blank = AuthUser {
            display_name: Some("   ".to_string()),
        };
        let (next, _) = transition(&SessionPhase::Unknown, Some(&blank));
        assert_eq!(next.username(), ANONYMOUS);
    }

    #[test]
    fn username_is_never_empty() {
        assert_eq!(SessionPhase::Unknown.username(), ANONYMOUS);
        assert_eq!(SessionPhase::SignedOut.username(), ANONYMOUS);
    }
}
