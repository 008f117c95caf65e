//! Wall-clock seconds, with a thread-local override used by the event log
//! importer to replay mutations under the original record's timestamp
//! (spec §4.4 step 5, §9 "thread-local current-user/time/IP").

use std::cell::Cell;
use std::time::{SystemTime, UNIX_EPOCH};

pub type Timestamp = i64;

thread_local! {
    static OVERRIDE: Cell<Option<Timestamp>> = const { Cell::new(None) };
}

/// Current time in seconds since the epoch, honoring an importer override.
pub fn now() -> Timestamp {
    OVERRIDE.with(|cell| cell.get()).unwrap_or_else(|| {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before epoch")
            .as_secs() as Timestamp
    })
}

/// Installs a fixed timestamp for the current thread for the duration of
/// `f`, restoring the previous override afterwards. Used by the importer's
/// direct-write path and by deterministic tests.
pub fn with_overridden_time<R>(at: Timestamp, f: impl FnOnce() -> R) -> R {
    let previous = OVERRIDE.with(|cell| cell.replace(Some(at)));
    let result = f();
    OVERRIDE.with(|cell| cell.set(previous));
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_is_scoped_to_the_closure() {
        let before = now();
        let seen = with_overridden_time(1000, now);
        assert_eq!(seen, 1000);
        // Real time resumes afterwards (monotonic enough not to equal 1000).
        assert_ne!(now(), 1000.min(before));
    }
}
