//! Opener doubles shared by the crate's test modules.

use parking_lot::Mutex;

use tidal_session::SessionConfig;

use crate::error::InputError;
use crate::source::{InputStream, StreamOpener};

pub(crate) fn session_config() -> SessionConfig {
    SessionConfig::new("app-token", "alice", "hunter2")
        .with_base_url("https://api.example.test/v1")
}

pub(crate) fn read_to_end(mut stream: Box<dyn InputStream>) -> Result<Vec<u8>, InputError> {
    let mut out = Vec::new();
    let mut buf = [0u8; 16];
    loop {
        match stream.read(&mut buf) {
            Ok(0) => return Ok(out),
            Ok(n) => out.extend_from_slice(&buf[..n]),
            Err(error) => return Err(error),
        }
    }
}

/// Opener double that records every open call and serves fixed bytes.
pub(crate) struct RecordingOpener {
    data: Vec<u8>,
    opened: Mutex<Vec<(String, Vec<(String, String)>)>>,
}

impl RecordingOpener {
    pub(crate) fn new(data: &[u8]) -> Self {
        Self {
            data: data.to_vec(),
            opened: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn open_count(&self) -> usize {
        self.opened.lock().len()
    }

    pub(crate) fn opened(&self) -> Vec<(String, Vec<(String, String)>)> {
        self.opened.lock().clone()
    }
}

impl StreamOpener for RecordingOpener {
    fn open(
        &self,
        url: &str,
        headers: Vec<(String, String)>,
    ) -> Result<Box<dyn InputStream>, InputError> {
        self.opened.lock().push((url.to_owned(), headers));
        Ok(Box::new(SliceStream {
            data: self.data.clone(),
            pos: 0,
        }))
    }
}

/// Opener double that always fails to build a downstream stream.
pub(crate) struct FailingOpener;

impl StreamOpener for FailingOpener {
    fn open(
        &self,
        _url: &str,
        _headers: Vec<(String, String)>,
    ) -> Result<Box<dyn InputStream>, InputError> {
        Err(InputError::Build("no downstream available".to_owned()))
    }
}

struct SliceStream {
    data: Vec<u8>,
    pos: usize,
}

impl InputStream for SliceStream {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, InputError> {
        let remaining = &self.data[self.pos..];
        let len = buf.len().min(remaining.len());
        buf[..len].copy_from_slice(&remaining[..len]);
        self.pos += len;
        Ok(len)
    }
}
