//! Session token store (spec §6.2 "login issues a session cookie"),
//! grounded on the original's `AuthStore`: a thread-safe token -> user
//! mapping with an expiry, periodically swept rather than checked on
//! every lookup.

use crate::clock::Timestamp;
use crate::id::EntityId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::RwLock;

const CLEANUP_EVERY_SECONDS: Timestamp = 30;

struct Entry {
    user: EntityId,
    expires_at: Timestamp,
}

/// Maps opaque session tokens to the `EntityId` that logged in, simpler
/// than the original's token-to-auth-handle indirection since this crate
/// has no separate authentication-provider concept to look up through.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Entry>>,
    last_cleanup: AtomicI64,
}

impl SessionStore {
    pub fn new() -> Self {
        SessionStore { sessions: RwLock::new(HashMap::new()), last_cleanup: AtomicI64::new(0) }
    }

    /// Issues a new random token for `user`, valid until `now + ttl_seconds`.
    pub fn issue(&self, user: EntityId, now: Timestamp, ttl_seconds: Timestamp) -> String {
        self.cleanup(now);
        let token = uuid::Uuid::new_v4().to_string();
        self.sessions.write().expect("session store lock poisoned").insert(token.clone(), Entry { user, expires_at: now + ttl_seconds });
        token
    }

    /// Resolves a token to its user, if present and not expired.
    pub fn resolve(&self, token: &str, now: Timestamp) -> Option<EntityId> {
        let sessions = self.sessions.read().expect("session store lock poisoned");
        sessions.get(token).filter(|entry| entry.expires_at >= now).map(|entry| entry.user)
    }

    pub fn revoke(&self, token: &str) {
        self.sessions.write().expect("session store lock poisoned").remove(token);
    }

    fn cleanup(&self, now: Timestamp) {
        let last = self.last_cleanup.load(Ordering::Relaxed);
        if now - last < CLEANUP_EVERY_SECONDS {
            return;
        }
        self.sessions.write().expect("session store lock poisoned").retain(|_, entry| entry.expires_at >= now);
        self.last_cleanup.store(now, Ordering::Relaxed);
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_a_freshly_issued_token() {
        let store = SessionStore::new();
        let user = EntityId::new();
        let token = store.issue(user, 1000, 3600);
        assert_eq!(store.resolve(&token, 1500), Some(user));
    }

    #[test]
    fn expired_tokens_no_longer_resolve() {
        let store = SessionStore::new();
        let user = EntityId::new();
        let token = store.issue(user, 1000, 10);
        assert_eq!(store.resolve(&token, 2000), None);
    }

    #[test]
    fn revoked_tokens_no_longer_resolve() {
        let store = SessionStore::new();
        let user = EntityId::new();
        let token = store.issue(user, 1000, 3600);
        store.revoke(&token);
        assert_eq!(store.resolve(&token, 1000), None);
    }
}
