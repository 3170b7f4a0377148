use std::sync::{Arc, Weak};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, warn};

use tidal_session::{SESSION_ID_HEADER, SessionCoordinator, TOKEN_HEADER, WaiterId};

use crate::error::InputError;
use crate::input::AudioQuality;
use crate::source::{InputStream, StreamOpener};

enum StreamState {
    /// Session not resolved yet; reads block.
    Unresolved,
    /// Delegating to the downstream track stream.
    Resolved(Box<dyn InputStream>),
    /// Terminal: every read surfaces this error.
    Failed(InputError),
}

struct StreamShared {
    uri: String,
    track_id: String,
    quality: AudioQuality,
    coordinator: SessionCoordinator,
    opener: Arc<dyn StreamOpener>,
    state: Mutex<StreamState>,
    resolved: Condvar,
}

impl StreamShared {
    /// Runs on the reactor when the coordinator drains its waiters. Swaps
    /// in the downstream stream or enters the terminal failed state, then
    /// wakes every blocked reader.
    fn resolve(&self) {
        let mut state = self.state.lock();
        if !matches!(*state, StreamState::Unresolved) {
            return;
        }

        *state = match self.open_downstream() {
            Ok(stream) => {
                debug!(track_id = %self.track_id, "track stream resolved");
                StreamState::Resolved(stream)
            }
            Err(error) => {
                warn!(track_id = %self.track_id, error = %error, "track stream failed");
                StreamState::Failed(error)
            }
        };
        self.resolved.notify_all();
    }

    fn open_downstream(&self) -> Result<Box<dyn InputStream>, InputError> {
        let session = self.coordinator.session()?;
        let track_url = format!(
            "{}/tracks/{}/urlpostpaywall?assetpresentation=FULL&audioquality={}&urlusagemode=STREAM",
            self.coordinator.base_url(),
            self.track_id,
            self.quality.as_str(),
        );
        let headers = vec![
            (TOKEN_HEADER.to_owned(), session.token),
            (SESSION_ID_HEADER.to_owned(), session.id),
        ];
        self.opener.open(&track_url, headers)
    }
}

/// Consumer-facing track handle. Reads block until the shared session
/// resolves, then delegate to the downstream stream opened with it; a
/// failed login or build turns into a terminal error instead.
pub struct TrackStream {
    shared: Arc<StreamShared>,
    waiter: WaiterId,
}

impl TrackStream {
    pub(crate) fn open(
        coordinator: SessionCoordinator,
        opener: Arc<dyn StreamOpener>,
        quality: AudioQuality,
        uri: &str,
        track_id: &str,
    ) -> Self {
        let shared = Arc::new(StreamShared {
            uri: uri.to_owned(),
            track_id: track_id.to_owned(),
            quality,
            coordinator,
            opener,
            state: Mutex::new(StreamState::Unresolved),
            resolved: Condvar::new(),
        });

        // The registry must never keep this stream alive: the callback
        // holds a weak reference, and Drop deregisters before anything else
        // is torn down.
        let weak = Arc::downgrade(&shared);
        let waiter = shared.coordinator.register_waiter(move || notify(&weak));

        Self { shared, waiter }
    }

    pub fn uri(&self) -> &str {
        &self.shared.uri
    }

    pub fn track_id(&self) -> &str {
        &self.shared.track_id
    }

    /// Reports the terminal error, if any, without blocking.
    pub fn check(&self) -> Result<(), InputError> {
        match &*self.shared.state.lock() {
            StreamState::Failed(error) => Err(error.clone()),
            _ => Ok(()),
        }
    }

    /// Reads from the downstream stream, blocking the calling thread until
    /// the session resolves. Returns `Ok(0)` at end of stream.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, InputError> {
        let mut state = self.shared.state.lock();
        loop {
            match &mut *state {
                StreamState::Unresolved => self.shared.resolved.wait(&mut state),
                StreamState::Resolved(stream) => return stream.read(buf),
                StreamState::Failed(error) => return Err(error.clone()),
            }
        }
    }
}

fn notify(shared: &Weak<StreamShared>) {
    if let Some(shared) = shared.upgrade() {
        shared.resolve();
    }
}

impl Drop for TrackStream {
    fn drop(&mut self) {
        // Deregister first; after this the coordinator can never call back
        // into the stream.
        self.shared.coordinator.remove_waiter(self.waiter);
    }
}
