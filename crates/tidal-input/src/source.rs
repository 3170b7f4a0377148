use std::sync::Arc;

use bytes::{Buf, Bytes};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::debug;

use tidal_session::{Transport, TransportRequest};

use crate::error::InputError;

/// Blocking byte stream backing a resolved track. `read` returning `Ok(0)`
/// means end of stream.
pub trait InputStream: Send {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, InputError>;
}

/// Builds the downstream stream for a resolved track. The session headers
/// are already part of `headers` when this is called.
pub trait StreamOpener: Send + Sync {
    fn open(
        &self,
        url: &str,
        headers: Vec<(String, String)>,
    ) -> Result<Box<dyn InputStream>, InputError>;
}

const CHUNK_CHANNEL_CAPACITY: usize = 8;

/// Opens track streams over the shared [`Transport`]: the GET runs on the
/// reactor while chunks cross to the consumer thread over a bounded channel.
pub struct HttpStreamOpener {
    transport: Arc<dyn Transport>,
    runtime: Handle,
}

impl HttpStreamOpener {
    pub fn new(transport: Arc<dyn Transport>, runtime: Handle) -> Self {
        Self { transport, runtime }
    }
}

impl StreamOpener for HttpStreamOpener {
    fn open(
        &self,
        url: &str,
        headers: Vec<(String, String)>,
    ) -> Result<Box<dyn InputStream>, InputError> {
        let mut request = TransportRequest::get(url);
        for (name, value) in headers {
            request = request.header(name, value);
        }

        let (tx, rx) = mpsc::channel(CHUNK_CHANNEL_CAPACITY);
        let transport = Arc::clone(&self.transport);
        self.runtime.spawn(fetch(transport, request, tx));

        Ok(Box::new(HttpStream {
            rx,
            chunk: Bytes::new(),
            error: None,
            done: false,
        }))
    }
}

async fn fetch(
    transport: Arc<dyn Transport>,
    request: TransportRequest,
    tx: mpsc::Sender<Result<Bytes, InputError>>,
) {
    let url = request.url.clone();
    let mut response = match transport.send(request).await {
        Ok(response) => response,
        Err(error) => {
            let _ = tx.send(Err(error.into())).await;
            return;
        }
    };

    let status = response.status();
    if status != 200 {
        let _ = tx.send(Err(InputError::Http { status })).await;
        return;
    }

    debug!(url = %url, "track fetch started");
    loop {
        match response.next_chunk().await {
            Ok(Some(chunk)) => {
                // A closed channel means the reader is gone; stop fetching.
                if tx.send(Ok(chunk)).await.is_err() {
                    return;
                }
            }
            Ok(None) => return,
            Err(error) => {
                let _ = tx.send(Err(error.into())).await;
                return;
            }
        }
    }
}

/// Consumer side of the handoff. Reads block on the channel, so this must
/// live on a consumer thread, never on the reactor.
struct HttpStream {
    rx: mpsc::Receiver<Result<Bytes, InputError>>,
    chunk: Bytes,
    /// Sticky: once the fetch fails, every later read re-raises the error
    /// instead of looking like end of stream.
    error: Option<InputError>,
    done: bool,
}

impl InputStream for HttpStream {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, InputError> {
        while self.chunk.is_empty() {
            if let Some(error) = &self.error {
                return Err(error.clone());
            }
            if self.done {
                return Ok(0);
            }
            match self.rx.blocking_recv() {
                Some(Ok(chunk)) => self.chunk = chunk,
                Some(Err(error)) => {
                    self.error = Some(error.clone());
                    return Err(error);
                }
                None => {
                    self.done = true;
                    return Ok(0);
                }
            }
        }

        let len = buf.len().min(self.chunk.len());
        buf[..len].copy_from_slice(&self.chunk[..len]);
        self.chunk.advance(len);
        Ok(len)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::runtime::Handle;

    use tidal_session::testing::{MockResponse, MockTransport};

    use super::*;
    use crate::test_util::read_to_end;

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn streams_chunks_in_order() {
        let transport = Arc::new(MockTransport::new());
        transport.respond(
            MockResponse::new(200)
                .chunk(b"abcde".to_vec())
                .chunk(b"fgh".to_vec()),
        );
        let opener = HttpStreamOpener::new(transport.clone(), Handle::current());

        let stream = opener
            .open(
                "https://api.example.test/v1/tracks/42/urlpostpaywall",
                vec![("X-Tidal-SessionId".to_owned(), "abc123".to_owned())],
            )
            .expect("open should not fail synchronously");

        let contents = tokio::task::spawn_blocking(move || read_to_end(stream))
            .await
            .unwrap()
            .expect("stream should succeed");
        assert_eq!(contents, b"abcdefgh");

        let request = transport.requests().remove(0);
        assert_eq!(request.header_value("X-Tidal-SessionId"), Some("abc123"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn non_success_status_surfaces_on_read() {
        let transport = Arc::new(MockTransport::new());
        transport.respond(MockResponse::new(404).chunk(b"not found".to_vec()));
        let opener = HttpStreamOpener::new(transport, Handle::current());

        let stream = opener
            .open("https://api.example.test/v1/tracks/42/urlpostpaywall", vec![])
            .expect("open should not fail synchronously");

        let result = tokio::task::spawn_blocking(move || read_to_end(stream))
            .await
            .unwrap();
        assert_eq!(result, Err(InputError::Http { status: 404 }));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn failure_stays_sticky_across_reads() {
        let transport = Arc::new(MockTransport::new());
        transport.respond(MockResponse::new(404).chunk(b"not found".to_vec()));
        let opener = HttpStreamOpener::new(transport, Handle::current());

        let mut stream = opener
            .open("https://api.example.test/v1/tracks/42/urlpostpaywall", vec![])
            .expect("open should not fail synchronously");

        let results = tokio::task::spawn_blocking(move || {
            let mut buf = [0u8; 16];
            [stream.read(&mut buf), stream.read(&mut buf)]
        })
        .await
        .unwrap();
        // A retrying caller must see the failure again, not clean EOF.
        for result in results {
            assert_eq!(result, Err(InputError::Http { status: 404 }));
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn transport_failure_surfaces_on_read() {
        let transport = Arc::new(MockTransport::new());
        let opener = HttpStreamOpener::new(transport, Handle::current());

        let stream = opener
            .open("https://api.example.test/v1/tracks/42/urlpostpaywall", vec![])
            .expect("open should not fail synchronously");

        let result = tokio::task::spawn_blocking(move || read_to_end(stream))
            .await
            .unwrap();
        assert!(matches!(result, Err(InputError::Transport(_))));
    }
}
