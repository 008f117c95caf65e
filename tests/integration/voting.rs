use crate::common::{anonymous, as_user, register_user, test_store, validator};
use forum_core::error::ForumError;

#[test]
fn upvoting_then_downvoting_supersedes_the_previous_vote() {
    let store = test_store();
    let alice = register_user(&store, "alice");
    let bob = register_user(&store, "bob");
    let thread = store.add_thread(&as_user(alice), "hello world", &validator()).unwrap();
    let message = store.add_message(&as_user(alice), thread, b"first".to_vec()).unwrap();

    store.up_vote_message(&as_user(bob), message).unwrap();
    store.down_vote_message(&as_user(bob), message).unwrap();

    let message = store.get_message_by_id(message).unwrap();
    assert_eq!(message.votes.len(), 1);
    assert_eq!(message.votes.get(&bob).unwrap().value, forum_core::entities::VoteValue::Down);
}

#[test]
fn casting_the_identical_vote_twice_has_no_effect() {
    let store = test_store();
    let alice = register_user(&store, "alice");
    let bob = register_user(&store, "bob");
    let thread = store.add_thread(&as_user(alice), "hello world", &validator()).unwrap();
    let message = store.add_message(&as_user(alice), thread, b"first".to_vec()).unwrap();

    store.up_vote_message(&as_user(bob), message).unwrap();
    let err = store.up_vote_message(&as_user(bob), message).unwrap_err();
    assert!(matches!(err, ForumError::NoEffect));
}

#[test]
fn resetting_a_vote_removes_it() {
    let store = test_store();
    let alice = register_user(&store, "alice");
    let bob = register_user(&store, "bob");
    let thread = store.add_thread(&as_user(alice), "hello world", &validator()).unwrap();
    let message = store.add_message(&as_user(alice), thread, b"first".to_vec()).unwrap();

    store.up_vote_message(&as_user(bob), message).unwrap();
    store.reset_vote_message(&as_user(bob), message).unwrap();

    let message = store.get_message_by_id(message).unwrap();
    assert!(!message.votes.contains_key(&bob));
}

#[test]
fn anonymous_visitors_cannot_vote() {
    let store = test_store();
    let alice = register_user(&store, "alice");
    let thread = store.add_thread(&as_user(alice), "hello world", &validator()).unwrap();
    let message = store.add_message(&as_user(alice), thread, b"first".to_vec()).unwrap();

    let err = store.up_vote_message(&anonymous(), message).unwrap_err();
    assert!(matches!(err, ForumError::NotAllowed));
}
