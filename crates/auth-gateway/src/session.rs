//! Server-side login sessions.
//!
//! A session is created when a nonce is handed out and binds the caller's
//! cookie to that nonce until the sign-in succeeds or the session ages out.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

/// One pending login.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    /// Nonce the client must sign
    pub nonce: String,
    /// When the session was opened
    pub issued_at: DateTime<Utc>,
}

/// Attributes of the session cookie.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionCookie {
    /// Cookie name
    pub name: String,
    /// Add `Secure`; off only for plain-HTTP local setups
    pub secure: bool,
    /// Browser-side lifetime, kept equal to the nonce TTL
    pub max_age: Duration,
}

impl SessionCookie {
    /// `Set-Cookie` value binding the client to session `id`.
    pub fn set_cookie(&self, id: Uuid) -> String {
        let mut value = format!(
            "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Strict",
            self.name,
            id,
            self.max_age.as_secs()
        );
        if self.secure {
            value.push_str("; Secure");
        }
        value
    }
}

/// Session id -> pending login.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, Session>>,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a session bound to `nonce` and return its id.
    pub fn open(&self, nonce: impl Into<String>, issued_at: DateTime<Utc>) -> Uuid {
        let id = Uuid::new_v4();
        self.sessions.write().insert(
            id,
            Session {
                nonce: nonce.into(),
                issued_at,
            },
        );
        id
    }

    /// Nonce bound to session `id`, if the session exists.
    pub fn nonce_for(&self, id: &Uuid) -> Option<String> {
        self.sessions.read().get(id).map(|s| s.nonce.clone())
    }

    /// Drop the binding for `id`.
    pub fn close(&self, id: &Uuid) -> Option<Session> {
        self.sessions.write().remove(id)
    }

    /// Number of open sessions.
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    /// Whether no sessions are open.
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Drop sessions opened strictly before `cutoff`. Returns the number removed.
    pub fn purge_issued_before(&self, cutoff: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, s| s.issued_at >= cutoff);
        let removed = before - sessions.len();

        if removed > 0 {
            debug!(removed = removed, "Purged stale sessions");
        }
        removed
    }
}
