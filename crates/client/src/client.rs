//! Chat client actor — owns session, subscription, composer, and feed.
//!
//! The client runs as an independent tokio task. External callers
//! communicate via `ChatClientHandle`, which sends `ClientCommand`
//! messages over an mpsc channel. Lock-free snapshot reads go through
//! `ArcSwap`. Because the actor is the only writer, the feed keeps the
//! store's append order without further synchronization.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use tidings_protocol::{new_id, Message, ANONYMOUS, DEFAULT_MESSAGE_CHAR_LIMIT};
use tidings_store_core::{
    AuthUser, AuthWatch, ChildEvent, IdentityProvider, MessageStore, PushKey, StoreError,
    StoreSubscription,
};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, trace, warn};

use crate::composer::Composer;
use crate::error::ClientError;
use crate::feed::{FeedEvent, MessageFeed};
use crate::session::{self, Effect, SessionPhase};

/// Tunables for the client core.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Hard cap on draft length, enforced at entry time.
    pub message_char_limit: usize,
    /// Re-attach attempts after a backend cancellation before giving up.
    pub reattach_max_attempts: u32,
    /// Base delay for re-attach backoff; doubles per attempt.
    pub reattach_base_delay: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            message_char_limit: DEFAULT_MESSAGE_CHAR_LIMIT,
            reattach_max_attempts: 5,
            reattach_base_delay: Duration::from_millis(250),
        }
    }
}

/// Commands accepted by the client actor.
pub enum ClientCommand {
    /// Scope-enter (foreground): register the auth watch.
    EnterScope,
    /// Scope-exit (background): drop the auth watch, clear the feed,
    /// detach the stream.
    ExitScope,
    /// Replace the draft text.
    SetDraft { text: String },
    /// Dispatch the current draft.
    Send,
    /// Launch the external sign-in flow.
    SignIn,
    /// Ask the identity provider to sign out.
    SignOut,
    /// Snapshot of the feed plus a receiver for subsequent increments.
    SubscribeFeed {
        reply: oneshot::Sender<(Vec<Message>, mpsc::UnboundedReceiver<FeedEvent>)>,
    },
    /// Receiver for client-level events (sign-in, stream/send failures).
    SubscribeEvents {
        reply: oneshot::Sender<mpsc::UnboundedReceiver<ClientEvent>>,
    },
    /// Stop the actor.
    Shutdown,

    // Internal feedback from spawned tasks.
    PushResolved {
        text: String,
        result: Result<PushKey, StoreError>,
    },
    SignInResolved {
        outcome: tidings_store_core::SignInOutcome,
    },
    Reattach,
}

/// Events surfaced to embedding code (user-facing feedback and the
/// failure paths the original design swallowed).
#[derive(Debug, Clone)]
pub enum ClientEvent {
    SignedIn { username: String },
    SignedOut,
    /// The external sign-in flow was launched.
    SignInRequested,
    /// The external sign-in flow finished.
    SignInFinished {
        outcome: tidings_store_core::SignInOutcome,
    },
    /// The read stream failed; the core may retry on its own.
    StreamError { error: String },
    /// A push failed. Carries the original text so callers can offer
    /// retry — the optimistic clear already happened.
    SendFailed { text: String, error: String },
}

/// Lock-free view of the client state.
#[derive(Debug, Clone)]
pub struct ClientSnapshot {
    pub phase: SessionPhase,
    pub username: String,
    pub draft: String,
    pub can_send: bool,
    pub message_count: usize,
}

impl ClientSnapshot {
    fn initial() -> Self {
        Self {
            phase: SessionPhase::Unknown,
            username: ANONYMOUS.to_string(),
            draft: String::new(),
            can_send: false,
            message_count: 0,
        }
    }
}

/// Handle to a running chat client (cheap to Clone).
#[derive(Clone)]
pub struct ChatClientHandle {
    pub id: String,
    command_tx: mpsc::Sender<ClientCommand>,
    snapshot: Arc<ArcSwap<ClientSnapshot>>,
}

impl ChatClientHandle {
    /// Send a command to the actor (fire-and-forget).
    pub async fn send(&self, cmd: ClientCommand) {
        if self.command_tx.send(cmd).await.is_err() {
            warn!(
                component = "chat_client",
                client_id = %self.id,
                "Actor channel closed, command dropped"
            );
        }
    }

    /// Lock-free snapshot read.
    pub fn snapshot(&self) -> Arc<ClientSnapshot> {
        self.snapshot.load_full()
    }

    pub async fn enter_scope(&self) {
        self.send(ClientCommand::EnterScope).await;
    }

    pub async fn exit_scope(&self) {
        self.send(ClientCommand::ExitScope).await;
    }

    pub async fn set_draft(&self, text: impl Into<String>) {
        self.send(ClientCommand::SetDraft { text: text.into() }).await;
    }

    pub async fn send_message(&self) {
        self.send(ClientCommand::Send).await;
    }

    pub async fn sign_in(&self) {
        self.send(ClientCommand::SignIn).await;
    }

    pub async fn sign_out(&self) {
        self.send(ClientCommand::SignOut).await;
    }

    pub async fn shutdown(&self) {
        self.send(ClientCommand::Shutdown).await;
    }

    /// Current feed contents plus a receiver for subsequent increments.
    pub async fn subscribe_feed(
        &self,
    ) -> Result<(Vec<Message>, mpsc::UnboundedReceiver<FeedEvent>), ClientError> {
        let (tx, rx) = oneshot::channel();
        self.send(ClientCommand::SubscribeFeed { reply: tx }).await;
        rx.await.map_err(|_| ClientError::NotRunning)
    }

    /// Receiver for client-level events.
    pub async fn subscribe_events(
        &self,
    ) -> Result<mpsc::UnboundedReceiver<ClientEvent>, ClientError> {
        let (tx, rx) = oneshot::channel();
        self.send(ClientCommand::SubscribeEvents { reply: tx }).await;
        rx.await.map_err(|_| ClientError::NotRunning)
    }
}

/// The actor state. Constructed and run by [`ChatClient::spawn`].
pub struct ChatClient {
    id: String,
    store: Arc<dyn MessageStore>,
    identity: Arc<dyn IdentityProvider>,
    config: ClientConfig,

    phase: SessionPhase,
    username: String,
    composer: Composer,
    feed: MessageFeed,
    subscription: Option<StoreSubscription>,
    auth_watch: Option<AuthWatch>,
    event_observers: Vec<mpsc::UnboundedSender<ClientEvent>>,
    reattach_attempts: u32,

    // For internal feedback from spawned push / sign-in / backoff tasks.
    command_tx: mpsc::Sender<ClientCommand>,
    snapshot: Arc<ArcSwap<ClientSnapshot>>,
}

enum Flow {
    Continue,
    Stop,
}

impl ChatClient {
    /// Spawn the client actor, returning a handle.
    pub fn spawn(
        store: Arc<dyn MessageStore>,
        identity: Arc<dyn IdentityProvider>,
        config: ClientConfig,
    ) -> ChatClientHandle {
        let (command_tx, command_rx) = mpsc::channel(256);
        let snapshot = Arc::new(ArcSwap::from_pointee(ClientSnapshot::initial()));
        let id = new_id();

        let client = ChatClient {
            id: id.clone(),
            store,
            identity,
            composer: Composer::new(config.message_char_limit),
            config,
            phase: SessionPhase::Unknown,
            username: ANONYMOUS.to_string(),
            feed: MessageFeed::new(),
            subscription: None,
            auth_watch: None,
            event_observers: Vec::new(),
            reattach_attempts: 0,
            command_tx: command_tx.clone(),
            snapshot: snapshot.clone(),
        };
        tokio::spawn(client.run(command_rx));

        ChatClientHandle {
            id,
            command_tx,
            snapshot,
        }
    }

    async fn run(mut self, mut command_rx: mpsc::Receiver<ClientCommand>) {
        info!(
            component = "chat_client",
            client_id = %self.id,
            "Client actor started"
        );
        loop {
            // Rebound locally so each select arm borrows only its own field.
            let auth_watch = &mut self.auth_watch;
            let subscription = &mut self.subscription;
            tokio::select! {
                cmd = command_rx.recv() => {
                    match cmd {
                        Some(cmd) => {
                            if let Flow::Stop = self.handle_command(cmd).await {
                                break;
                            }
                        }
                        // All handles dropped.
                        None => break,
                    }
                }
                notification = async {
                    match auth_watch.as_mut() {
                        Some(watch) => watch.recv().await,
                        None => std::future::pending().await,
                    }
                } => {
                    match notification {
                        Some(user) => self.apply_auth(user).await,
                        None => {
                            warn!(
                                component = "chat_client",
                                "Identity provider closed the auth watch"
                            );
                            self.auth_watch = None;
                        }
                    }
                }
                event = async {
                    match subscription.as_mut() {
                        Some(sub) => sub.recv().await,
                        None => std::future::pending().await,
                    }
                } => {
                    self.on_child_event(event);
                }
            }
            self.publish_snapshot();
        }

        // Paired release on every exit path: no leaked registrations.
        self.detach();
        self.auth_watch = None;
        self.publish_snapshot();
        info!(
            component = "chat_client",
            client_id = %self.id,
            "Client actor stopped"
        );
    }

    async fn handle_command(&mut self, cmd: ClientCommand) -> Flow {
        match cmd {
            ClientCommand::EnterScope => {
                if self.auth_watch.is_none() {
                    self.auth_watch = Some(self.identity.watch());
                    debug!(component = "chat_client", "Auth watch registered");
                } else {
                    debug!(component = "chat_client", "Already in scope");
                }
            }
            ClientCommand::ExitScope => {
                // Mirror of foreground teardown: deregister the auth
                // watch, drop the rendered history, stop the stream.
                self.auth_watch = None;
                self.feed.clear();
                self.detach();
                debug!(component = "chat_client", "Scope exited");
            }
            ClientCommand::SetDraft { text } => {
                self.composer.set_draft(&text);
            }
            ClientCommand::Send => self.dispatch_draft(),
            ClientCommand::SignIn => self.launch_sign_in(),
            ClientCommand::SignOut => {
                self.identity.sign_out();
            }
            ClientCommand::SubscribeFeed { reply } => {
                let _ = reply.send((self.feed.snapshot(), self.feed.observe()));
            }
            ClientCommand::SubscribeEvents { reply } => {
                let (tx, rx) = mpsc::unbounded_channel();
                self.event_observers.push(tx);
                let _ = reply.send(rx);
            }
            ClientCommand::Shutdown => return Flow::Stop,
            ClientCommand::PushResolved { text, result } => match result {
                Ok(key) => {
                    debug!(component = "chat_client", key = %key, "Push acknowledged");
                }
                Err(error) => {
                    warn!(
                        component = "chat_client",
                        error = %error,
                        "Push failed, surfacing for retry"
                    );
                    self.emit(ClientEvent::SendFailed {
                        text,
                        error: error.to_string(),
                    });
                }
            },
            ClientCommand::SignInResolved { outcome } => {
                info!(component = "chat_client", ?outcome, "Sign-in flow finished");
                self.emit(ClientEvent::SignInFinished { outcome });
            }
            ClientCommand::Reattach => {
                if self.subscription.is_none() && self.phase.is_signed_in() {
                    self.attach().await;
                } else {
                    debug!(component = "chat_client", "Re-attach no longer needed");
                }
            }
        }
        Flow::Continue
    }

    /// Run the session state machine and execute its effects in order.
    async fn apply_auth(&mut self, user: Option<AuthUser>) {
        let (next, effects) = session::transition(&self.phase, user.as_ref());
        let entered_signed_in = next.is_signed_in() && !self.phase.is_signed_in();
        let entered_signed_out =
            next == SessionPhase::SignedOut && self.phase != SessionPhase::SignedOut;
        info!(
            component = "chat_client",
            client_id = %self.id,
            from = ?self.phase,
            to = ?next,
            "Session transition"
        );
        self.phase = next;

        for effect in effects {
            match effect {
                Effect::BindUsername(username) => self.username = username,
                Effect::AttachStream => self.attach().await,
                Effect::DetachStream => self.detach(),
                Effect::ClearFeed => self.feed.clear(),
                Effect::LaunchSignIn => self.launch_sign_in(),
            }
        }

        if entered_signed_in {
            self.emit(ClientEvent::SignedIn {
                username: self.username.clone(),
            });
        } else if entered_signed_out {
            self.emit(ClientEvent::SignedOut);
        }
    }

    /// Idempotent attach: a second call while attached is a no-op —
    /// anything else would double-deliver every message.
    async fn attach(&mut self) {
        if self.subscription.is_some() {
            debug!(component = "chat_client", "Already attached");
            return;
        }
        match self.store.subscribe().await {
            Ok(subscription) => {
                self.subscription = Some(subscription);
                self.reattach_attempts = 0;
                info!(component = "chat_client", "Stream attached");
            }
            Err(error) => {
                warn!(component = "chat_client", error = %error, "Attach failed");
                self.emit(ClientEvent::StreamError {
                    error: error.to_string(),
                });
                self.schedule_reattach();
            }
        }
    }

    /// Idempotent detach: safe when never attached.
    fn detach(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.cancel();
            info!(component = "chat_client", "Stream detached");
        }
    }

    fn on_child_event(&mut self, event: Option<ChildEvent>) {
        match event {
            Some(ChildEvent::Added { key, record }) => {
                // Fail-soft decode; the stream never aborts on a bad record.
                let message = Message::from_record(&record);
                trace!(component = "chat_client", key = %key, "Message appended");
                self.reattach_attempts = 0;
                self.feed.append(message);
            }
            // The local view is a write-once illusion: edits, removals,
            // and reorders from the backend are deliberate no-ops.
            Some(ChildEvent::Changed { key, .. }) => {
                trace!(component = "chat_client", key = %key, "Ignoring change");
            }
            Some(ChildEvent::Removed { key }) => {
                trace!(component = "chat_client", key = %key, "Ignoring removal");
            }
            Some(ChildEvent::Moved { key }) => {
                trace!(component = "chat_client", key = %key, "Ignoring move");
            }
            Some(ChildEvent::Cancelled { error }) => {
                warn!(
                    component = "chat_client",
                    error = %error,
                    "Stream cancelled by backend"
                );
                self.subscription = None;
                self.emit(ClientEvent::StreamError {
                    error: error.to_string(),
                });
                self.schedule_reattach();
            }
            None => {
                warn!(component = "chat_client", "Stream closed by backend");
                self.subscription = None;
                self.emit(ClientEvent::StreamError {
                    error: "stream closed".to_string(),
                });
                self.schedule_reattach();
            }
        }
    }

    /// Bounded exponential backoff before the next attach attempt. The
    /// counter resets whenever an attach succeeds or an append lands, so
    /// the budget applies per outage, not per session.
    fn schedule_reattach(&mut self) {
        if !self.phase.is_signed_in() {
            return;
        }
        let attempt = self.reattach_attempts + 1;
        if attempt > self.config.reattach_max_attempts {
            warn!(
                component = "chat_client",
                attempts = self.reattach_attempts,
                "Giving up on re-attach"
            );
            self.emit(ClientEvent::StreamError {
                error: "re-attach attempts exhausted".to_string(),
            });
            return;
        }
        self.reattach_attempts = attempt;
        let delay = self.config.reattach_base_delay * 2u32.saturating_pow(attempt - 1);
        debug!(
            component = "chat_client",
            attempt,
            delay_ms = delay.as_millis() as u64,
            "Scheduling re-attach"
        );
        let tx = self.command_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(ClientCommand::Reattach).await;
        });
    }

    /// Build a message from the draft and push it. The draft clears
    /// immediately; rendering happens only when the read path observes
    /// the remote echo.
    fn dispatch_draft(&mut self) {
        if !self.composer.can_send() {
            debug!(component = "chat_client", "Send ignored, draft empty");
            return;
        }
        let text = self.composer.take();
        let message = Message::new(text.clone(), self.username.clone(), "");
        debug!(
            component = "chat_client",
            author = %message.author,
            chars = message.text.chars().count(),
            "Dispatching message"
        );

        let store = self.store.clone();
        let tx = self.command_tx.clone();
        tokio::spawn(async move {
            let result = store.push(message.to_record()).await;
            let _ = tx.send(ClientCommand::PushResolved { text, result }).await;
        });
    }

    fn launch_sign_in(&mut self) {
        self.emit(ClientEvent::SignInRequested);
        let identity = self.identity.clone();
        let tx = self.command_tx.clone();
        tokio::spawn(async move {
            let outcome = identity.sign_in().await;
            let _ = tx.send(ClientCommand::SignInResolved { outcome }).await;
        });
    }

    fn emit(&mut self, event: ClientEvent) {
        self.event_observers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn publish_snapshot(&self) {
        self.snapshot.store(Arc::new(ClientSnapshot {
            phase: self.phase.clone(),
            username: self.username.clone(),
            draft: self.composer.draft().to_string(),
            can_send: self.composer.can_send(),
            message_count: self.feed.len(),
        }));
    }
}
