use std::sync::Arc;

use tokio::runtime::Handle;

use tidal_session::{ReqwestTransport, SessionConfig, SessionCoordinator, Transport};

use crate::locator;
use crate::source::{HttpStreamOpener, StreamOpener};
use crate::stream::TrackStream;

/// Track quality requested from the paywall endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AudioQuality {
    #[default]
    Low,
    High,
    Lossless,
}

impl AudioQuality {
    pub fn as_str(self) -> &'static str {
        match self {
            AudioQuality::Low => "LOW",
            AudioQuality::High => "HIGH",
            AudioQuality::Lossless => "LOSSLESS",
        }
    }
}

/// Entry point for Tidal track playback: recognizes track locators and hands
/// out gated streams that resolve once the shared session does.
pub struct TidalInput {
    coordinator: SessionCoordinator,
    opener: Arc<dyn StreamOpener>,
    quality: AudioQuality,
}

impl TidalInput {
    /// Wires the session coordinator and the HTTP downstream over one
    /// shared transport. `runtime` drives both the login exchange and the
    /// track fetches.
    pub fn new(config: SessionConfig, transport: Arc<dyn Transport>, runtime: Handle) -> Self {
        let coordinator =
            SessionCoordinator::new(config, Arc::clone(&transport), runtime.clone());
        let opener = Arc::new(HttpStreamOpener::new(transport, runtime));
        Self {
            coordinator,
            opener,
            quality: AudioQuality::default(),
        }
    }

    /// Same wiring over a default reqwest client.
    pub fn with_default_transport(config: SessionConfig, runtime: Handle) -> Self {
        Self::new(config, Arc::new(ReqwestTransport::default()), runtime)
    }

    /// Replaces the downstream stream opener.
    pub fn with_opener(mut self, opener: Arc<dyn StreamOpener>) -> Self {
        self.opener = opener;
        self
    }

    pub fn with_quality(mut self, quality: AudioQuality) -> Self {
        self.quality = quality;
        self
    }

    pub fn coordinator(&self) -> &SessionCoordinator {
        &self.coordinator
    }

    /// Opens a gated stream for a recognized track locator. `None` means
    /// the locator is not handled by this input, which is not an error.
    pub fn open(&self, uri: &str) -> Option<TrackStream> {
        let track_id = locator::track_id(uri)?;
        Some(TrackStream::open(
            self.coordinator.clone(),
            Arc::clone(&self.opener),
            self.quality,
            uri,
            track_id,
        ))
    }
}
