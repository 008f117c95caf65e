use crate::common::{anonymous, as_user, register_user, test_store, validator};
use forum_core::eventlog::events::{EventContext, WriteEvent};
use forum_core::eventlog::format::encode_record;
use forum_core::eventlog::importer;
use forum_core::store::{EventObserver, ObserverContext};
use std::fs;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct RecordingObserver {
    events: Mutex<Vec<(WriteEvent, EventContext)>>,
}

impl EventObserver for RecordingObserver {
    fn on_event(&self, event: &WriteEvent, ctx: &ObserverContext) {
        let context = EventContext { timestamp: ctx.current_time, acting_user: ctx.performed_by, acting_ip: ctx.source_ip };
        self.events.lock().unwrap().push((event.clone(), context));
    }
}

/// Drives a fresh store through a realistic sequence of actions while
/// recording every emitted event, frames them exactly as the on-disk event
/// log does, then replays them into a second, empty store and checks the
/// two converge to the same visible state (spec §8 "import determinism").
#[test]
fn replaying_a_mixed_sequence_of_events_reproduces_the_source_stores_state() {
    let dir = tempfile::tempdir().unwrap();
    let source = test_store();
    let recorder = Arc::new(RecordingObserver::default());
    source.add_observer(recorder.clone());

    let alice = register_user(&source, "alice");
    let bob = register_user(&source, "bob");
    let thread = source.add_thread(&as_user(alice), "hello world", &validator()).unwrap();
    let message = source.add_message(&as_user(alice), thread, b"first post".to_vec()).unwrap();
    source.up_vote_message(&as_user(bob), message).unwrap();
    let comment = source.add_comment(&as_user(bob), message, "nice one").unwrap();
    source.solve_comment(&as_user(alice), comment).unwrap();
    let tag = source.add_tag(&as_user(alice), "announcements").unwrap();
    source.attach_tag_to_thread(&as_user(alice), tag, thread).unwrap();
    let category = source.add_category(&as_user(alice), "general", None).unwrap();
    source.attach_tag_to_category(&as_user(alice), tag, category).unwrap();
    source.add_message(&anonymous(), thread, b"anonymous reply".to_vec()).unwrap();

    let mut blob = Vec::new();
    for (event, ctx) in recorder.events.lock().unwrap().iter() {
        let encoded = event.encode(*ctx);
        encode_record(&encoded, &mut blob);
    }
    fs::write(dir.path().join("forum-1000.events"), &blob).unwrap();

    let target = test_store();
    let summary = importer::import_directory(&target, dir.path(), true, None).unwrap();
    assert_eq!(summary.files_replayed, 1);
    assert_eq!(summary.records_replayed, recorder.events.lock().unwrap().len());

    let replayed_thread = target.get_thread_by_id(thread).unwrap();
    assert_eq!(replayed_thread.message_count(), 2);
    assert!(replayed_thread.tags.contains(&tag));

    let replayed_message = target.get_message_by_id(message).unwrap();
    assert_eq!(replayed_message.votes.len(), 1);
    assert!(replayed_message.votes.contains_key(&bob));

    let replayed_comments = target.list_comments_for_message(message);
    assert_eq!(replayed_comments.len(), 1);
    assert!(replayed_comments[0].solved);

    let replayed_tag = target.get_tag_by_id(tag).unwrap();
    assert!(replayed_tag.categories.contains(&category));

    assert!(target.get_user_by_name("alice").is_some());
    assert!(target.get_user_by_name("bob").is_some());
}
