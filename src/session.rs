use std::sync::Mutex;

use serde::Serialize;

use crate::identity::AuthSession;

/// An established session: a provider-backed account or a local guest.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Session {
    Account(AuthSession),
    Guest { username: String, token: String },
}

impl Session {
    pub fn access_token(&self) -> &str {
        match self {
            Session::Account(session) => &session.access_token,
            Session::Guest { token, .. } => token,
        }
    }
}

/// Auth lifecycle of one caller. The state is mutated only through the
/// auth adapter's calls; consumers read it but never write it.
#[derive(Debug, Clone, Default)]
pub enum SessionState {
    #[default]
    Anonymous,
    Authenticating,
    Authenticated(Session),
    Failed(String),
}

pub struct SessionContext {
    state: Mutex<SessionState>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SessionState::Anonymous),
        }
    }

    /// Rebuild a context around an already-established session, e.g. from a
    /// bearer token presented on a later request.
    pub fn resume(session: Session) -> Self {
        Self {
            state: Mutex::new(SessionState::Authenticated(session)),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state.lock().unwrap().clone()
    }

    pub fn session(&self) -> Option<Session> {
        match self.state() {
            SessionState::Authenticated(session) => Some(session),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.state(), SessionState::Authenticated(_))
    }

    pub(crate) fn transition(&self, next: SessionState) {
        *self.state.lock().unwrap() = next;
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}
