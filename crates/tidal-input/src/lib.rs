//! Gated Tidal track input.
//!
//! A [`TrackStream`] registers with the shared
//! [`SessionCoordinator`](tidal_session::SessionCoordinator) at creation and
//! blocks reads until the login session resolves, then swaps in the real
//! HTTP track stream. Login or build failures become a terminal stream error
//! surfaced on the next read or check, never panics or hangs.

pub mod error;
mod input;
pub mod locator;
mod source;
mod stream;

#[cfg(test)]
pub(crate) mod test_util;

pub use error::InputError;
pub use input::{AudioQuality, TidalInput};
pub use source::{HttpStreamOpener, InputStream, StreamOpener};
pub use stream::TrackStream;
