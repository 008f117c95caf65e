use crate::common::{anonymous, as_user, register_user, test_store, validator};
use forum_core::clock::with_overridden_time;
use forum_core::error::ForumError;

#[test]
fn duplicate_user_name_is_rejected() {
    let store = test_store();
    register_user(&store, "alice");
    let err = store.add_user(&anonymous(), "alice", "alice2", &validator()).unwrap_err();
    assert!(matches!(err, ForumError::AlreadyExists(_)));
}

#[test]
fn duplicate_auth_handle_is_rejected_even_with_a_different_name() {
    let store = test_store();
    store.add_user(&anonymous(), "alice", "shared-handle", &validator()).unwrap();
    let err = store.add_user(&anonymous(), "bob", "shared-handle", &validator()).unwrap_err();
    assert!(matches!(err, ForumError::UserWithSameAuthAlreadyExists));
}

#[test]
fn change_name_reindexes_lookup_by_name() {
    let store = test_store();
    let alice = register_user(&store, "alice");
    store.change_user_name(&as_user(alice), alice, "alicia", &validator()).unwrap();
    assert!(store.get_user_by_name("alice").is_none());
    assert_eq!(store.get_user_by_name("alicia").unwrap().header.id, alice);
}

#[test]
fn deleting_a_user_nulls_authorship_back_refs_instead_of_deleting_content() {
    let store = test_store();
    let alice = register_user(&store, "alice");
    let thread = store.add_thread(&as_user(alice), "hello world", &validator()).unwrap();
    let message = store.add_message(&as_user(alice), thread, b"first post".to_vec()).unwrap();

    store.delete_user(&as_user(alice), alice).unwrap();

    let message = store.get_message_by_id(message).unwrap();
    assert_eq!(message.creator_id, None);
    // The thread and message themselves survive the cascade.
    assert!(store.get_thread_by_id(thread).is_some());
}

#[test]
fn list_users_by_created_is_paginated_and_ordered() {
    let store = test_store();
    with_overridden_time(100, || register_user(&store, "alice"));
    with_overridden_time(200, || register_user(&store, "bob"));
    with_overridden_time(300, || register_user(&store, "carol"));

    let ctx = forum_core::store::DisplayContext::default();
    let page = store.list_users_by_created(&ctx, 2);
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].name, "alice");
    assert_eq!(page[1].name, "bob");
}
