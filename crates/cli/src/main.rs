//! Tidings CLI
//!
//! Loopback chat: a `ChatClient` wired to the in-memory store and
//! identity provider. Lines typed on stdin become messages; everything
//! rendered comes back through the read path, never locally. Useful for
//! exercising the sync core end to end without a hosted backend.

mod logging;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tidings_client::{ChatClient, ClientConfig, ClientEvent, FeedEvent};
use tidings_protocol::DEFAULT_MESSAGE_CHAR_LIMIT;
use tidings_store_core::AuthUser;
use tidings_store_memory::{MemoryIdentity, MemoryStore};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

#[derive(Parser)]
#[command(name = "tidings", about = "Loopback chat over an in-memory ordered-append store")]
struct Args {
    /// Display name the identity provider reports after sign-in
    #[arg(long, env = "TIDINGS_USERNAME", default_value = "local")]
    username: String,

    /// Hard cap on message text length, in characters
    #[arg(long, env = "TIDINGS_MESSAGE_LIMIT", default_value_t = DEFAULT_MESSAGE_CHAR_LIMIT)]
    message_limit: usize,

    /// Log format: json or pretty
    #[arg(long, env = "TIDINGS_LOG_FORMAT", default_value = "json")]
    log_format: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let _logging = logging::init_logging(&args.log_format)?;

    info!(component = "main", username = %args.username, "Starting tidings");

    let store = MemoryStore::new();
    let identity = MemoryIdentity::with_sign_in_user(AuthUser::named(args.username));

    let handle = ChatClient::spawn(
        Arc::new(store),
        Arc::new(identity),
        ClientConfig {
            message_char_limit: args.message_limit,
            ..ClientConfig::default()
        },
    );

    let (_, mut feed) = handle.subscribe_feed().await?;
    let mut events = handle.subscribe_events().await?;

    // Render everything the core surfaces; the feed is the only source
    // of message output.
    tokio::spawn(async move {
        loop {
            tokio::select! {
                event = feed.recv() => match event {
                    Some(FeedEvent::Appended(message)) => {
                        if message.has_photo() {
                            println!("{}: [photo] {}", message.author, message.photo_url);
                        } else {
                            println!("{}: {}", message.author, message.text);
                        }
                    }
                    Some(FeedEvent::Cleared) => println!("-- history cleared --"),
                    None => break,
                },
                event = events.recv() => match event {
                    Some(ClientEvent::SignedIn { username }) => {
                        println!("-- signed in as {username} --");
                    }
                    Some(ClientEvent::SignedOut) => println!("-- signed out --"),
                    Some(ClientEvent::SignInRequested) => {}
                    Some(ClientEvent::SignInFinished { outcome }) => {
                        info!(component = "main", ?outcome, "Sign-in flow finished");
                    }
                    Some(ClientEvent::StreamError { error }) => {
                        eprintln!("stream error: {error}");
                    }
                    Some(ClientEvent::SendFailed { text, error }) => {
                        eprintln!("send failed ({error}), message preserved: {text}");
                    }
                    None => break,
                },
            }
        }
    });

    // Foreground: register the auth watch; the sign-in flow runs from
    // the initial no-user notification.
    handle.enter_scope().await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "/quit" => break,
            "/in" => handle.sign_in().await,
            "/out" => handle.sign_out().await,
            "" => {}
            _ => {
                handle.set_draft(line.clone()).await;
                handle.send_message().await;
            }
        }
    }

    handle.exit_scope().await;
    handle.shutdown().await;
    info!(component = "main", "Stopped");
    Ok(())
}
