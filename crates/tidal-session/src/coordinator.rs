use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::session::Session;
use crate::transport::{Transport, TransportRequest};
use crate::waiter::{WaiterId, WaiterRegistry};

/// Hard cap on the buffered login response body. Exceeding it fails the
/// attempt outright; the body is never truncated.
pub const MAX_LOGIN_BODY: usize = 4096;

/// Header carrying the static application token.
pub const TOKEN_HEADER: &str = "X-Tidal-Token";

/// Header carrying the resolved session id on track requests.
pub const SESSION_ID_HEADER: &str = "X-Tidal-SessionId";

const SESSION_ID_MARKER: &str = "\"sessionId\":\"";

/// Where the coordinator stands with respect to the one login exchange it
/// is willing to run. Exactly one of a session or a cached failure exists
/// at any time; `Idle`/`Pending` hold neither.
enum Phase {
    /// No session, no cached failure, no attempt started.
    Idle,
    /// A login attempt is in flight; new waiters join it.
    Pending,
    Ready(Session),
    Failed(SessionError),
}

struct State {
    phase: Phase,
    waiters: WaiterRegistry,
    /// A drain task has been spawned and has not yet started its pass.
    notify_scheduled: bool,
    /// The in-flight login attempt, if any.
    attempt: Option<JoinHandle<()>>,
}

struct Inner {
    config: SessionConfig,
    transport: Arc<dyn Transport>,
    runtime: Handle,
    shutdown: CancellationToken,
    /// The single lock over all mutable coordinator state. Never held
    /// across a waiter callback or a network await.
    state: Mutex<State>,
}

/// Coordinates one login exchange on behalf of any number of concurrent
/// consumers.
///
/// Consumers register a waiter callback; the first registration while no
/// session, failure or attempt exists triggers the exchange, later ones
/// join it.
/// When the attempt resolves — session or failure — a deferred drain invokes
/// every registered callback exactly once, without holding the coordinator
/// lock. There is no automatic re-login after a failed attempt: a waiter
/// registered while a failure is cached stays parked until another trigger
/// drains the registry.
///
/// Cheap to clone; clones share the same session state.
#[derive(Clone)]
pub struct SessionCoordinator {
    inner: Arc<Inner>,
}

impl SessionCoordinator {
    /// `runtime` is the execution context that drives the login request and
    /// all waiter notifications.
    pub fn new(config: SessionConfig, transport: Arc<dyn Transport>, runtime: Handle) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                transport,
                runtime,
                shutdown: CancellationToken::new(),
                state: Mutex::new(State {
                    phase: Phase::Idle,
                    waiters: WaiterRegistry::default(),
                    notify_scheduled: false,
                    attempt: None,
                }),
            }),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.inner.config.base_url
    }

    /// The static application token; available independent of session state.
    pub fn token(&self) -> &str {
        &self.inner.config.token
    }

    /// Adds a waiter to be notified once when the session resolves or the
    /// login attempt fails. Triggers the attempt if none has run yet.
    ///
    /// The returned id is the removal handle; the registry owns the
    /// callback.
    pub fn register_waiter<F>(&self, notify: F) -> WaiterId
    where
        F: FnOnce() + Send + 'static,
    {
        let mut state = self.inner.state.lock();
        let id = state.waiters.insert(Box::new(notify));

        match &state.phase {
            Phase::Idle => {
                state.phase = Phase::Pending;
                state.attempt = Some(Inner::spawn_login(&self.inner));
                debug!(waiter = ?id, "starting login exchange");
            }
            Phase::Pending | Phase::Failed(_) => {
                // Pending: the waiter joins the in-flight attempt.
                // Failed: no auto-retry; the waiter stays parked until
                // another trigger drains the registry.
            }
            Phase::Ready(_) => {
                // Resolution already happened; deliver on the next drain
                // pass. This schedules a notification, never a new attempt.
                drop(state);
                Inner::schedule_notify(&self.inner);
            }
        }

        id
    }

    /// Idempotent. After this returns, the waiter will never be notified,
    /// even if a drain is in progress.
    pub fn remove_waiter(&self, id: WaiterId) {
        self.inner.state.lock().waiters.remove(id);
    }

    /// The cached session. Meant to be called from a waiter callback after
    /// notification, never polled: before resolution it fails with
    /// [`SessionError::NoSession`], after a failed attempt with a clone of
    /// the cached failure.
    pub fn session(&self) -> Result<Session, SessionError> {
        let state = self.inner.state.lock();
        match &state.phase {
            Phase::Ready(session) => Ok(session.clone()),
            Phase::Failed(error) => Err(error.clone()),
            Phase::Idle | Phase::Pending => Err(SessionError::NoSession),
        }
    }
}

impl Inner {
    fn spawn_login(inner: &Arc<Inner>) -> JoinHandle<()> {
        let transport = Arc::clone(&inner.transport);
        let request = login_request(&inner.config);
        let token = inner.config.token.clone();
        let shutdown = inner.shutdown.clone();
        // The task must not keep the coordinator alive: teardown cancels
        // the token when the last strong reference drops.
        let weak = Arc::downgrade(inner);

        inner.runtime.spawn(async move {
            let result = tokio::select! {
                _ = shutdown.cancelled() => return,
                result = perform_login(transport, request, token) => result,
            };
            if let Some(inner) = weak.upgrade() {
                inner.resolve_login(result);
            }
        })
    }

    fn resolve_login(self: &Arc<Self>, result: Result<Session, SessionError>) {
        {
            let mut state = self.state.lock();
            state.attempt = None;
            state.phase = match result {
                Ok(session) => {
                    debug!(id = %session.id, "login succeeded");
                    Phase::Ready(session)
                }
                Err(error) => {
                    warn!(error = %error, "login failed");
                    Phase::Failed(error)
                }
            };
        }
        Self::schedule_notify(self);
    }

    /// Arranges for one drain pass on the reactor. Triggers arriving before
    /// the pass starts coalesce into it.
    fn schedule_notify(inner: &Arc<Self>) {
        {
            let mut state = inner.state.lock();
            if state.notify_scheduled {
                return;
            }
            state.notify_scheduled = true;
        }
        let task_inner = Arc::clone(inner);
        inner.runtime.spawn(async move {
            task_inner.drain_and_notify();
        });
    }

    /// One notification pass over the waiters present at its start. The
    /// lock is dropped around every callback, so callbacks may re-enter the
    /// coordinator; waiters registered mid-pass wait for the next pass.
    fn drain_and_notify(&self) {
        let pass = {
            let mut state = self.state.lock();
            state.notify_scheduled = false;
            state.waiters.pass_ids()
        };
        debug!(waiters = pass.len(), "notifying waiters");

        for id in pass {
            let callback = self.state.lock().waiters.take(id);
            if let Some(callback) = callback {
                callback();
            }
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.shutdown.cancel();
        if let Some(attempt) = self.state.get_mut().attempt.take() {
            attempt.abort();
        }
    }
}

fn login_request(config: &SessionConfig) -> TransportRequest {
    let body = format!(
        "username={}&password={}",
        urlencoding::encode(&config.username),
        urlencoding::encode(&config.password),
    );
    TransportRequest::post(format!("{}/login/username", config.base_url))
        .header(TOKEN_HEADER, config.token.as_str())
        .form(body)
}

async fn perform_login(
    transport: Arc<dyn Transport>,
    request: TransportRequest,
    token: String,
) -> Result<Session, SessionError> {
    let mut response = transport.send(request).await?;

    let status = response.status();
    if status != 200 {
        return Err(SessionError::LoginHttp { status });
    }

    // Checked before any body is buffered.
    let content_type = response.header("content-type");
    if !content_type.as_deref().is_some_and(|ct| ct.contains("/json")) {
        return Err(SessionError::LoginNotJson { content_type });
    }

    let mut body = Vec::new();
    while let Some(chunk) = response.next_chunk().await? {
        if body.len() + chunk.len() > MAX_LOGIN_BODY {
            return Err(SessionError::LoginBodyTooLarge {
                limit: MAX_LOGIN_BODY,
            });
        }
        body.extend_from_slice(&chunk);
    }

    let body = String::from_utf8_lossy(&body);
    let id = extract_session_id(&body).ok_or(SessionError::LoginSessionIdMissing)?;

    Ok(Session {
        id: id.to_owned(),
        token,
    })
}

/// Locates the `"sessionId":"` marker and reads up to the next quote.
/// Deliberately not a JSON parser: no escape handling, no nested-object
/// awareness. The login response is small and flat enough for this to hold.
fn extract_session_id(body: &str) -> Option<&str> {
    let start = body.find(SESSION_ID_MARKER)? + SESSION_ID_MARKER.len();
    let rest = &body[start..];
    let end = rest.find('"')?;
    Some(&rest[..end])
}
