//! Session state shared by all calls after login.

use std::fmt;

/// The instance a process talks to and the session it talks with.
///
/// Created unauthenticated (for the login call itself) and replaced by an
/// authenticated one once login succeeds. Never mutated afterwards.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    /// Host name without scheme, e.g. `na1.salesforce.com`.
    pub instance_host: String,
    session_id: Option<String>,
}

impl Session {
    /// A session without credentials.
    pub fn unauthenticated(instance_host: impl Into<String>) -> Self {
        Self {
            instance_host: instance_host.into(),
            session_id: None,
        }
    }

    pub fn new(instance_host: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            instance_host: instance_host.into(),
            session_id: Some(session_id.into()),
        }
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session_id.is_some()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("instance_host", &self.instance_host)
            .field("session_id", &self.session_id.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}
