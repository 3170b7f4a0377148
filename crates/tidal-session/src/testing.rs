//! Scripted transport doubles for exercising session logic without a
//! network. Downstream crates use these in their own tests as well.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;

use crate::error::TransportError;
use crate::transport::{Transport, TransportRequest, TransportResponse};

/// A login body with the session id the doubles resolve to (`abc123`).
pub const LOGIN_BODY: &str = r#"{"userId":4321,"sessionId":"abc123","countryCode":"US"}"#;

/// Polls `condition` while letting the reactor make progress; panics if it
/// never holds.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..500 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    panic!("condition not reached within deadline");
}

/// A canned response; chunks are handed out one `next_chunk` call at a time.
pub struct MockResponse {
    status: u16,
    headers: Vec<(String, String)>,
    chunks: VecDeque<Bytes>,
}

impl MockResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            chunks: VecDeque::new(),
        }
    }

    /// A `status` response with content type `application/json` and `body`
    /// delivered as a single chunk.
    pub fn json(status: u16, body: &str) -> Self {
        Self::new(status)
            .header("content-type", "application/json")
            .chunk(body.as_bytes().to_vec())
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    pub fn chunk(mut self, data: impl Into<Bytes>) -> Self {
        self.chunks.push_back(data.into());
        self
    }
}

#[async_trait]
impl TransportResponse for MockResponse {
    fn status(&self) -> u16 {
        self.status
    }

    fn header(&self, name: &str) -> Option<String> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.clone())
    }

    async fn next_chunk(&mut self) -> Result<Option<Bytes>, TransportError> {
        Ok(self.chunks.pop_front())
    }
}

/// [`Transport`] double that replays scripted responses in order and records
/// every request it sees. An unscripted request fails, so a test that
/// expects a single exchange will notice a second one either way.
#[derive(Default)]
pub struct MockTransport {
    script: Mutex<VecDeque<Result<MockResponse, TransportError>>>,
    requests: Mutex<Vec<TransportRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, response: MockResponse) {
        self.script.lock().push_back(Ok(response));
    }

    pub fn fail(&self, error: TransportError) {
        self.script.lock().push_back(Err(error));
    }

    /// How many requests have been issued so far.
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(
        &self,
        request: TransportRequest,
    ) -> Result<Box<dyn TransportResponse>, TransportError> {
        self.requests.lock().push(request);
        match self.script.lock().pop_front() {
            Some(Ok(response)) => Ok(Box::new(response)),
            Some(Err(error)) => Err(error),
            None => Err(TransportError::Request(
                "no scripted response for request".to_owned(),
            )),
        }
    }
}
