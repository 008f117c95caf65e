use crate::common::{as_user, register_user, test_store, validator};
use forum_core::error::ForumError;

#[test]
fn attaching_a_tag_to_a_thread_is_visible_on_both_sides() {
    let store = test_store();
    let alice = register_user(&store, "alice");
    let thread = store.add_thread(&as_user(alice), "hello world", &validator()).unwrap();
    let tag = store.add_tag(&as_user(alice), "announcements").unwrap();

    store.attach_tag_to_thread(&as_user(alice), tag, thread).unwrap();

    assert!(store.get_thread_by_id(thread).unwrap().tags.contains(&tag));
    assert!(store.get_tag_by_id(tag).unwrap().threads.contains(&thread));
}

#[test]
fn merging_tags_removes_the_source_and_keeps_the_destination() {
    let store = test_store();
    let alice = register_user(&store, "alice");
    let thread = store.add_thread(&as_user(alice), "hello world", &validator()).unwrap();
    let source = store.add_tag(&as_user(alice), "bug").unwrap();
    let destination = store.add_tag(&as_user(alice), "bugs").unwrap();
    store.attach_tag_to_thread(&as_user(alice), source, thread).unwrap();

    store.merge_tags(&as_user(alice), source, destination).unwrap();

    assert!(store.get_tag_by_id(source).is_none());
    assert!(store.get_thread_by_id(thread).unwrap().tags.contains(&destination));
}

#[test]
fn merging_a_tag_into_itself_is_rejected_as_circular() {
    let store = test_store();
    let alice = register_user(&store, "alice");
    let tag = store.add_tag(&as_user(alice), "bug").unwrap();
    let err = store.merge_tags(&as_user(alice), tag, tag).unwrap_err();
    assert!(matches!(err, ForumError::CircularReferenceNotAllowed));
}

#[test]
fn reparenting_a_category_under_its_own_descendant_is_rejected() {
    let store = test_store();
    let alice = register_user(&store, "alice");
    let root = store.add_category(&as_user(alice), "root", None).unwrap();
    let child = store.add_category(&as_user(alice), "child", Some(root)).unwrap();

    let err = store.change_category_parent(&as_user(alice), root, Some(child)).unwrap_err();
    assert!(matches!(err, ForumError::CircularReferenceNotAllowed));
}

#[test]
fn deleting_a_category_reparents_its_children_to_its_own_former_parent() {
    let store = test_store();
    let alice = register_user(&store, "alice");
    let grandparent = store.add_category(&as_user(alice), "grandparent", None).unwrap();
    let parent = store.add_category(&as_user(alice), "parent", Some(grandparent)).unwrap();
    let child = store.add_category(&as_user(alice), "child", Some(parent)).unwrap();

    store.delete_category(&as_user(alice), parent).unwrap();

    let child = store.get_category_by_id(child).unwrap();
    assert_eq!(child.parent, Some(grandparent));
    let grandparent = store.get_category_by_id(grandparent).unwrap();
    assert!(grandparent.children.contains(&child.header.id));
}

#[test]
fn category_counters_aggregate_transitively_over_descendants() {
    let store = test_store();
    let alice = register_user(&store, "alice");
    let root = store.add_category(&as_user(alice), "root", None).unwrap();
    let child = store.add_category(&as_user(alice), "child", Some(root)).unwrap();

    let root_tag = store.add_tag(&as_user(alice), "root-tag").unwrap();
    let child_tag = store.add_tag(&as_user(alice), "child-tag").unwrap();
    store.attach_tag_to_category(&as_user(alice), root_tag, root).unwrap();
    store.attach_tag_to_category(&as_user(alice), child_tag, child).unwrap();

    let root_thread = store.add_thread(&as_user(alice), "in the root category", &validator()).unwrap();
    store.attach_tag_to_thread(&as_user(alice), root_tag, root_thread).unwrap();
    store.add_message(&as_user(alice), root_thread, b"one".to_vec()).unwrap();

    let child_thread = store.add_thread(&as_user(alice), "in the child category", &validator()).unwrap();
    store.attach_tag_to_thread(&as_user(alice), child_tag, child_thread).unwrap();
    store.add_message(&as_user(alice), child_thread, b"one".to_vec()).unwrap();
    store.add_message(&as_user(alice), child_thread, b"two".to_vec()).unwrap();

    let (child_threads, child_messages) = store.category_counters(child);
    assert_eq!(child_threads, 1);
    assert_eq!(child_messages, 2);

    let (root_threads, root_messages) = store.category_counters(root);
    assert_eq!(root_threads, 2);
    assert_eq!(root_messages, 3);
}

#[test]
fn a_categorys_description_can_be_set_and_cleared() {
    let store = test_store();
    let alice = register_user(&store, "alice");
    let category = store.add_category(&as_user(alice), "general", None).unwrap();
    assert_eq!(store.get_category_by_id(category).unwrap().description, None);

    store.change_category_description(&as_user(alice), category, "general discussion").unwrap();
    assert_eq!(store.get_category_by_id(category).unwrap().description, Some("general discussion".to_string()));

    store.change_category_description(&as_user(alice), category, "").unwrap();
    assert_eq!(store.get_category_by_id(category).unwrap().description, None);
}
