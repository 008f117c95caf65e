use crate::common::{as_user, register_user, test_store, validator};
use forum_core::error::ForumError;

#[test]
fn comments_attach_to_a_message_and_can_be_solved() {
    let store = test_store();
    let alice = register_user(&store, "alice");
    let bob = register_user(&store, "bob");
    let thread = store.add_thread(&as_user(alice), "help needed", &validator()).unwrap();
    let message = store.add_message(&as_user(alice), thread, b"how do I do X?".to_vec()).unwrap();
    let comment = store.add_comment(&as_user(bob), message, "try Y instead").unwrap();

    let comments = store.list_comments_for_message(message);
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].header.id, comment);
    assert!(!comments[0].solved);

    store.solve_comment(&as_user(alice), comment).unwrap();
    let comments = store.list_comments_for_message(message);
    assert!(comments[0].solved);
}

#[test]
fn solving_an_already_solved_comment_has_no_effect() {
    let store = test_store();
    let alice = register_user(&store, "alice");
    let thread = store.add_thread(&as_user(alice), "help needed", &validator()).unwrap();
    let message = store.add_message(&as_user(alice), thread, b"how do I do X?".to_vec()).unwrap();
    let comment = store.add_comment(&as_user(alice), message, "nevermind, solved it").unwrap();

    store.solve_comment(&as_user(alice), comment).unwrap();
    let err = store.solve_comment(&as_user(alice), comment).unwrap_err();
    assert!(matches!(err, ForumError::NoEffect));
}
