use thiserror::Error;

/// Startup-time configuration failures. A coordinator cannot be built from
/// an incomplete configuration; there is no runtime recovery from these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("no Tidal {0} configured")]
    Missing(&'static str),
    #[error("configured Tidal {0} is invalid")]
    Invalid(&'static str),
}

/// Lower-level network failures surfaced by a [`Transport`].
///
/// Carries rendered messages rather than source errors: a cached login
/// failure is cloned to every waiter at delivery time.
///
/// [`Transport`]: crate::transport::Transport
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("invalid request header `{0}`")]
    InvalidHeader(String),
    #[error("{0}")]
    Request(String),
}

/// Session state errors: everything a login attempt can fail with, plus
/// [`NoSession`](SessionError::NoSession) for queries before resolution.
///
/// Login-phase values are captured once by the coordinator and re-raised
/// synchronously to each consumer that asks for the session; nothing is
/// thrown across the async boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("no session")]
    NoSession,
    #[error("login failed with HTTP status {status}")]
    LoginHttp { status: u16 },
    #[error("login response is not JSON (content-type {content_type:?})")]
    LoginNotJson { content_type: Option<String> },
    #[error("login response exceeds {limit} bytes")]
    LoginBodyTooLarge { limit: usize },
    #[error("no sessionId in login response")]
    LoginSessionIdMissing,
    #[error("login transport error: {0}")]
    Transport(#[from] TransportError),
}
