use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::Arc;

use crate::models::Principal;

/// SessionStore
///
/// Holds the signed-in principal's token and cached principal record.
/// Token presence is the only signal the permissions store uses to decide
/// whether it may call the network at all.
pub trait SessionStore: Send + Sync {
    /// The current session token, if a session is active.
    fn token(&self) -> Option<String>;

    /// The cached principal record, if a session is active.
    fn principal(&self) -> Option<Principal>;

    fn is_active(&self) -> bool {
        self.token().is_some()
    }
}

/// SessionState
///
/// The concrete type used to share the session store across the application state.
pub type SessionState = Arc<dyn SessionStore>;

#[derive(Debug, Clone)]
struct ActiveSession {
    token: String,
    principal: Principal,
    expires_at: Option<DateTime<Utc>>,
}

impl ActiveSession {
    fn is_live(&self) -> bool {
        self.expires_at.is_none_or(|exp| exp > Utc::now())
    }
}

/// InMemorySessionStore
///
/// Process-local session holder. Token and principal are always set and
/// cleared together so readers never observe one without the other.
/// Once `expires_at` has passed the session reads as absent.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    inner: RwLock<Option<ActiveSession>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces any existing session.
    pub fn establish(
        &self,
        token: impl Into<String>,
        principal: Principal,
        expires_at: Option<DateTime<Utc>>,
    ) {
        tracing::info!(principal_id = %principal.id, role = ?principal.role, "session established");
        *self.inner.write() = Some(ActiveSession {
            token: token.into(),
            principal,
            expires_at,
        });
    }

    /// Ends the session. Returns false if there was none.
    pub fn clear(&self) -> bool {
        let previous = self.inner.write().take();
        if let Some(session) = &previous {
            tracing::info!(principal_id = %session.principal.id, "session cleared");
        }
        previous.is_some()
    }
}

impl SessionStore for InMemorySessionStore {
    fn token(&self) -> Option<String> {
        self.inner
            .read()
            .as_ref()
            .filter(|s| s.is_live())
            .map(|s| s.token.clone())
    }

    fn principal(&self) -> Option<Principal> {
        self.inner
            .read()
            .as_ref()
            .filter(|s| s.is_live())
            .map(|s| s.principal.clone())
    }
}
