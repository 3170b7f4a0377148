//! Tidal session acquisition.
//!
//! One login exchange is coalesced across any number of concurrent
//! consumers: the first consumer that needs a session triggers the exchange,
//! later consumers join a waiter registry, and a deferred drain notifies
//! every waiter exactly once when the session resolves or the attempt fails.
//!
//! The [`SessionCoordinator`] never invokes a waiter callback while holding
//! its lock, so callbacks are free to call back into it (fetch the session,
//! deregister, register new waiters).

pub mod config;
pub mod coordinator;
pub mod error;
mod session;
pub mod testing;
pub mod transport;
mod waiter;

pub use config::{DEFAULT_BASE_URL, SessionConfig};
pub use coordinator::{MAX_LOGIN_BODY, SESSION_ID_HEADER, SessionCoordinator, TOKEN_HEADER};
pub use error::{ConfigError, SessionError, TransportError};
pub use session::Session;
pub use transport::{ReqwestTransport, Transport, TransportRequest, TransportResponse};
pub use waiter::WaiterId;
