use crate::common::{as_user, register_user, test_store, validator};
use forum_core::clock::with_overridden_time;
use forum_core::error::ForumError;

#[test]
fn posting_past_the_window_limit_is_throttled_then_recovers_after_the_window_passes() {
    let store = test_store();
    // A different actor creates the thread so alice's own `NewContent`
    // bucket is established by her first `add_message` call, not shadowed
    // by the lower per-thread limit (throttle buckets are keyed by
    // actor + action class, and fix their capacity at first use).
    let bob = register_user(&store, "bob");
    let alice = register_user(&store, "alice");
    let thread = store.add_thread(&as_user(bob), "hello world", &validator()).unwrap();

    with_overridden_time(1_000, || {
        for _ in 0..30 {
            store.add_message(&as_user(alice), thread, b"post".to_vec()).unwrap();
        }
        let err = store.add_message(&as_user(alice), thread, b"one too many".to_vec()).unwrap_err();
        assert!(matches!(err, ForumError::Throttled { .. }));
    });

    with_overridden_time(1_000 + 3_601, || {
        store.add_message(&as_user(alice), thread, b"after the window".to_vec()).unwrap();
    });
}
