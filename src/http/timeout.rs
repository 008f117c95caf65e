//! Idle-connection timeout tracking (spec §4.6 "Connection lifecycle and
//! timeout"): "a companion timeout manager maintains a multi-indexed
//! `{connection -> expireAt}` collection, ticked by a periodic timer;
//! expired connections are force-disconnected."

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio::task::AbortHandle;

pub type ConnectionId = u64;

struct Tracked {
    expires_at: Instant,
    abort: AbortHandle,
}

/// Tracks every open connection's deadline and force-disconnects it once
/// expired. One instance per listener (spec §5 "Connection manager... and
/// connection pool: internal mutexes, contention kept low by
/// pre-allocation").
pub struct ConnectionManager {
    next_id: AtomicU64,
    connections: Mutex<HashMap<ConnectionId, Tracked>>,
    timeout: Duration,
}

impl ConnectionManager {
    pub fn new(timeout: Duration) -> Self {
        ConnectionManager { next_id: AtomicU64::new(1), connections: Mutex::new(HashMap::new()), timeout }
    }

    pub fn register(&self, abort: AbortHandle) -> ConnectionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.connections.lock().expect("connection manager lock poisoned").insert(id, Tracked { expires_at: Instant::now() + self.timeout, abort });
        id
    }

    /// Resets a connection's deadline (spec §4.6 "Keep-Alive connections
    /// reset parser + buffers and resume reading" — the idle clock resets
    /// the same way on every completed request).
    pub fn touch(&self, id: ConnectionId) {
        if let Some(tracked) = self.connections.lock().expect("connection manager lock poisoned").get_mut(&id) {
            tracked.expires_at = Instant::now() + self.timeout;
        }
    }

    pub fn remove(&self, id: ConnectionId) {
        self.connections.lock().expect("connection manager lock poisoned").remove(&id);
    }

    pub fn open_connections(&self) -> usize {
        self.connections.lock().expect("connection manager lock poisoned").len()
    }

    /// One timer tick (spec §4.6 "ticked by a periodic timer"): aborts every
    /// connection whose deadline has passed.
    pub fn sweep_expired(&self) {
        let now = Instant::now();
        let mut connections = self.connections.lock().expect("connection manager lock poisoned");
        connections.retain(|_, tracked| {
            if tracked.expires_at <= now {
                tracked.abort.abort();
                false
            } else {
                true
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn expired_connections_are_removed_on_sweep() {
        let manager = ConnectionManager::new(Duration::from_millis(1));
        let handle = tokio::spawn(async { std::future::pending::<()>().await });
        manager.register(handle.abort_handle());
        tokio::time::sleep(Duration::from_millis(5)).await;
        manager.sweep_expired();
        assert_eq!(manager.open_connections(), 0);
    }
}
