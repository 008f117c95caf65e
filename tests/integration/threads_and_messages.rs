use crate::common::{anonymous, as_user, register_user, test_store, validator};
use forum_core::clock::with_overridden_time;

#[test]
fn posting_messages_bumps_thread_message_count_and_latest_message_created() {
    let store = test_store();
    let alice = register_user(&store, "alice");
    let thread = with_overridden_time(100, || store.add_thread(&as_user(alice), "hello world", &validator()).unwrap());

    with_overridden_time(200, || store.add_message(&as_user(alice), thread, b"first".to_vec()).unwrap());
    with_overridden_time(300, || store.add_message(&as_user(alice), thread, b"second".to_vec()).unwrap());

    let refreshed = store.get_thread_by_id(thread).unwrap();
    assert_eq!(refreshed.message_count(), 2);
    assert_eq!(refreshed.latest_visible_change, 300);

    let messages = store.list_messages_in_thread(thread, 0, 10);
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].header.created, 200);
    assert_eq!(messages[1].header.created, 300);
}

#[test]
fn deleting_a_message_decrements_thread_message_count() {
    let store = test_store();
    let alice = register_user(&store, "alice");
    let thread = store.add_thread(&as_user(alice), "hello world", &validator()).unwrap();
    let message = store.add_message(&as_user(alice), thread, b"first".to_vec()).unwrap();
    store.add_message(&as_user(alice), thread, b"second".to_vec()).unwrap();

    store.delete_message(&as_user(alice), message).unwrap();

    let refreshed = store.get_thread_by_id(thread).unwrap();
    assert_eq!(refreshed.message_count(), 1);
}

#[test]
fn deleting_the_newest_message_rolls_latest_visible_change_back_to_the_remaining_max() {
    let store = test_store();
    let alice = register_user(&store, "alice");
    let thread = with_overridden_time(1000, || store.add_thread(&as_user(alice), "hello world", &validator()).unwrap());
    with_overridden_time(2000, || store.add_message(&as_user(alice), thread, b"first".to_vec()).unwrap());
    let newest = with_overridden_time(2100, || store.add_message(&as_user(alice), thread, b"second".to_vec()).unwrap());

    assert_eq!(store.get_thread_by_id(thread).unwrap().latest_visible_change, 2100);

    store.delete_message(&as_user(alice), newest).unwrap();

    let refreshed = store.get_thread_by_id(thread).unwrap();
    assert_eq!(refreshed.message_count(), 1);
    assert_eq!(refreshed.latest_visible_change, 2000);
}

#[test]
fn deleting_a_thread_cascades_its_messages_and_their_comments() {
    let store = test_store();
    let alice = register_user(&store, "alice");
    let thread = store.add_thread(&as_user(alice), "hello world", &validator()).unwrap();
    let message = store.add_message(&as_user(alice), thread, b"first".to_vec()).unwrap();
    let comment = store.add_comment(&as_user(alice), message, "nice post").unwrap();

    store.delete_thread(&as_user(alice), thread).unwrap();

    assert!(store.get_message_by_id(message).is_none());
    assert!(store.list_comments_for_message(message).is_empty());
    let _ = comment;
}

#[test]
fn anonymous_users_can_post_but_are_not_credited_as_the_creator() {
    let store = test_store();
    let thread = store.add_thread(&anonymous(), "open to everyone", &validator()).unwrap();
    let message = store.add_message(&anonymous(), thread, b"anonymous post".to_vec()).unwrap();
    assert_eq!(store.get_message_by_id(message).unwrap().creator_id, None);
}

#[test]
fn merging_threads_moves_messages_and_tags_into_the_destination() {
    let store = test_store();
    let alice = register_user(&store, "alice");
    let source = store.add_thread(&as_user(alice), "duplicate topic", &validator()).unwrap();
    let destination = store.add_thread(&as_user(alice), "canonical topic", &validator()).unwrap();
    let message = store.add_message(&as_user(alice), source, b"hello".to_vec()).unwrap();

    store.merge_threads(&as_user(alice), source, destination).unwrap();

    assert!(store.get_thread_by_id(source).is_none());
    assert_eq!(store.get_message_by_id(message).unwrap().thread_id, destination);
    assert_eq!(store.get_thread_by_id(destination).unwrap().message_count(), 1);
}

#[test]
fn moving_a_message_to_its_own_thread_has_no_effect() {
    let store = test_store();
    let alice = register_user(&store, "alice");
    let thread = store.add_thread(&as_user(alice), "hello world", &validator()).unwrap();
    let message = store.add_message(&as_user(alice), thread, b"first".to_vec()).unwrap();

    let err = store.move_message(&as_user(alice), message, thread).unwrap_err();
    assert!(matches!(err, forum_core::error::ForumError::NoEffect));
}
