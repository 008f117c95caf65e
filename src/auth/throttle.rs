//! Per-action throttling (spec §4.5).
//!
//! Each `(actorKey, actionClass)` bucket keeps a ring of the last
//! `maxAllowed` timestamps under its own [`SpinLock`]; the shared map is
//! only locked briefly to find-or-create that bucket (spec §5 "Throttling
//! table: its own spin-lock per bucket").

use crate::clock::Timestamp;
use crate::id::{EntityId, RawIp};
use crate::spinlock::SpinLock;
use std::collections::HashMap;
use std::sync::RwLock;

/// spec §4.5 action classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionClass {
    NewContent,
    EditContent,
    Vote,
    Subscribe,
    EditPrivileges,
}

#[derive(Debug, Clone, Copy)]
pub struct ThrottleRule {
    pub max_allowed: usize,
    pub period_seconds: i64,
}

/// Either a user id or a source IP (spec §4.5 `actorKey`); recovered from
/// the original's `IdOrIpAddress.h` (see SPEC_FULL.md §B.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActorKey {
    User(EntityId),
    Ip(RawIp),
}

impl ActorKey {
    pub fn for_user(user: EntityId, ip: RawIp) -> Self {
        if user.is_anonymous() {
            ActorKey::Ip(ip)
        } else {
            ActorKey::User(user)
        }
    }
}

/// A fixed-capacity ring of the last `max_allowed` action timestamps.
struct Ring {
    max_allowed: usize,
    entries: Vec<Timestamp>,
    next: usize,
}

impl Ring {
    fn new(max_allowed: usize) -> Self {
        Ring {
            max_allowed: max_allowed.max(1),
            entries: Vec::new(),
            next: 0,
        }
    }

    /// Tests and rotates in place: allowed iff the oldest recorded entry is
    /// older than `now - period_seconds`, or the ring isn't full yet.
    fn check_and_record(&mut self, now: Timestamp, period_seconds: i64) -> Result<(), i64> {
        if self.entries.len() < self.max_allowed {
            self.entries.push(now);
            return Ok(());
        }
        let oldest = self.entries[self.next];
        if now - oldest >= period_seconds {
            self.entries[self.next] = now;
            self.next = (self.next + 1) % self.max_allowed;
            Ok(())
        } else {
            Err(period_seconds - (now - oldest))
        }
    }
}

pub struct Throttler {
    buckets: RwLock<HashMap<(ActorKey, ActionClass), SpinLock<Ring>>>,
}

impl Default for Throttler {
    fn default() -> Self {
        Self::new()
    }
}

impl Throttler {
    pub fn new() -> Self {
        Throttler { buckets: RwLock::new(HashMap::new()) }
    }

    /// Returns `Ok(())` if allowed, `Err(retry_after_secs)` otherwise.
    pub fn check(&self, actor: ActorKey, action: ActionClass, rule: ThrottleRule, now: Timestamp) -> Result<(), u64> {
        {
            let buckets = self.buckets.read().expect("throttle map lock poisoned");
            if let Some(ring) = buckets.get(&(actor, action)) {
                return ring.lock().check_and_record(now, rule.period_seconds).map_err(|secs| secs.max(0) as u64);
            }
        }
        let mut buckets = self.buckets.write().expect("throttle map lock poisoned");
        let ring = buckets.entry((actor, action)).or_insert_with(|| SpinLock::new(Ring::new(rule.max_allowed)));
        ring.lock().check_and_record(now, rule.period_seconds).map_err(|secs| secs.max(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_max_then_throttles_then_recovers() {
        let throttler = Throttler::new();
        let actor = ActorKey::Ip(RawIp::UNKNOWN);
        let rule = ThrottleRule { max_allowed: 3, period_seconds: 60 };

        for _ in 0..3 {
            assert!(throttler.check(actor, ActionClass::NewContent, rule, 1).is_ok());
        }
        assert!(throttler.check(actor, ActionClass::NewContent, rule, 1).is_err());
        assert!(throttler.check(actor, ActionClass::NewContent, rule, 61).is_ok());
    }
}
