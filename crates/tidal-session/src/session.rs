/// Server-issued short-lived credential pair granting access to
/// track-specific endpoints.
///
/// Immutable once stored by the coordinator; consumers receive clones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// The session id returned by the login endpoint.
    pub id: String,
    /// The static application token the session was obtained with.
    pub token: String,
}
