use crate::common::{as_user, register_user, test_store, validator};
use forum_core::entities::{Privilege, PrivilegeScope};
use forum_core::error::ForumError;

#[test]
fn raising_a_forum_wide_required_privilege_blocks_ordinary_users() {
    let store = test_store();
    let alice = register_user(&store, "alice");
    store.change_required_privilege_direct(PrivilegeScope::ForumWide, Privilege::AddNewThread, 1);

    let err = store.add_thread(&as_user(alice), "hello world", &validator()).unwrap_err();
    assert!(matches!(err, ForumError::NotAllowed));
}

#[test]
fn granting_the_missing_privilege_unblocks_the_action() {
    let store = test_store();
    let alice = register_user(&store, "alice");
    let admin = register_user(&store, "admin");
    store.change_required_privilege_direct(PrivilegeScope::ForumWide, Privilege::AddNewThread, 1);
    store.change_assigned_privilege_direct(admin, PrivilegeScope::ForumWide, Privilege::AddNewThread, 100, 0, 0);

    store.change_assigned_privilege(&as_user(admin), alice, PrivilegeScope::ForumWide, Privilege::AddNewThread, 1, 0).unwrap();

    store.add_thread(&as_user(alice), "hello world", &validator()).unwrap();
}

#[test]
fn granting_a_privilege_to_yourself_is_rejected() {
    let store = test_store();
    let admin = register_user(&store, "admin");
    store.change_assigned_privilege_direct(admin, PrivilegeScope::ForumWide, Privilege::AddNewThread, 100, 0, 0);

    let err = store.change_assigned_privilege(&as_user(admin), admin, PrivilegeScope::ForumWide, Privilege::AddNewThread, 50, 0).unwrap_err();
    assert!(matches!(err, ForumError::NotAllowed));
}

#[test]
fn raising_a_required_privilege_above_the_current_value_is_rejected_for_ordinary_users() {
    let store = test_store();
    let alice = register_user(&store, "alice");
    // Nobody has been granted AdjustPrivilege above the default of 0, so
    // raising the AddNewThread requirement above 0 is rejected outright.
    let err = store.change_required_privilege(&as_user(alice), PrivilegeScope::ForumWide, Privilege::AddNewThread, 1).unwrap_err();
    assert!(matches!(err, ForumError::NotAllowed));
}
