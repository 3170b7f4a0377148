use thiserror::Error;
use tidal_session::{SessionError, TransportError};

/// Errors a track stream can end in. Stored as the stream's terminal state
/// and cloned out on every subsequent read or check.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    /// The login exchange failed, or no session was available at delivery.
    #[error(transparent)]
    Session(#[from] SessionError),
    /// The track endpoint answered with a non-success status.
    #[error("track request failed with HTTP status {status}")]
    Http { status: u16 },
    /// The downstream fetch failed below the HTTP layer.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The downstream stream could not be constructed.
    #[error("failed to open track stream: {0}")]
    Build(String),
}
