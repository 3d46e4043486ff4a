//! Client errors

use thiserror::Error;

/// Errors surfaced by the client handle.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The actor task has shut down; no further commands can be served.
    #[error("Client actor is not running")]
    NotRunning,
}
