//! Event log replay at startup (spec §4.4, component C7).
//!
//! Scans `forum-<unix-ts>.events` files under the input folder, oldest
//! first, and replays every record through the store's direct-write path
//! (spec §9: "bypasses authorization, throttling, and observer dispatch,
//! while still maintaining all indexes and invariants"). An unknown event
//! type or version is a hard failure — spec §9's resolution of the "should
//! replay tolerate events from a newer binary" open question is no.

use super::events::{EventContext, MessageContentWire, WriteEvent};
use super::format::{decode_record, FramingError};
use crate::clock::with_overridden_time;
use crate::entities::MessageContent;
use crate::id::EntityId;
use crate::store::Store;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("failed to read event log directory {0}: {1}")]
    ReadDir(PathBuf, std::io::Error),
    #[error("failed to read event log file {0}: {1}")]
    ReadFile(PathBuf, std::io::Error),
    #[error("corrupt record in {0}: {1:?}")]
    Framing(PathBuf, FramingError),
    #[error("corrupt event payload in {0}: {1:?}")]
    Payload(PathBuf, super::codec::DecodeError),
    #[error("unresolved reference while replaying {0}: {1}")]
    Replay(PathBuf, crate::error::ForumError),
    #[error("failed to read mapped message content: {0}")]
    MessagesFile(std::io::Error),
}

/// Returns `forum-<ts>.events` files in the folder, sorted ascending by the
/// timestamp embedded in the filename (spec §4.4 step 1-2).
fn discover_log_files(folder: &Path) -> Result<Vec<(i64, PathBuf)>, ImportError> {
    let mut files = Vec::new();
    let entries = fs::read_dir(folder).map_err(|e| ImportError::ReadDir(folder.to_path_buf(), e))?;
    for entry in entries {
        let entry = entry.map_err(|e| ImportError::ReadDir(folder.to_path_buf(), e))?;
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else { continue };
        let Some(digits) = name.strip_prefix("forum-").and_then(|rest| rest.strip_suffix(".events")) else { continue };
        if let Ok(ts) = digits.parse::<i64>() {
            files.push((ts, path));
        }
    }
    files.sort_by_key(|(ts, _)| *ts);
    Ok(files)
}

/// Summary of one completed replay (spec §4.4 "Post-processing").
#[derive(Debug, Default)]
pub struct ImportSummary {
    pub files_replayed: usize,
    pub records_replayed: usize,
}

/// Replays every record in `folder`'s log files into `store`, in batch mode
/// (spec §9), then runs post-processing: rebuilds derived indexes and
/// recomputes each user's `last_seen` as the max timestamp of any event it
/// performed (spec §4.4 step 7).
pub fn import_directory(store: &Store, folder: &Path, verify_checksum: bool, messages_file_path: Option<&Path>) -> Result<ImportSummary, ImportError> {
    let files = discover_log_files(folder)?;
    let mut summary = ImportSummary::default();
    let mut last_seen: HashMap<EntityId, i64> = HashMap::new();

    let messages_file = messages_file_path.map(fs::read).transpose().map_err(ImportError::MessagesFile)?;

    store.set_batch_mode(true);
    for (_, path) in &files {
        let bytes = fs::read(path).map_err(|e| ImportError::ReadFile(path.clone(), e))?;
        let mut offset = 0usize;
        while offset < bytes.len() {
            let decoded = decode_record(&bytes[offset..], verify_checksum).map_err(|e| ImportError::Framing(path.clone(), e))?;
            let (context, event) = super::events::decode_blob(decoded.blob).map_err(|e| ImportError::Payload(path.clone(), e))?;
            offset += decoded.consumed;

            apply_event(store, &event, &context, messages_file.as_deref()).map_err(|e| ImportError::Replay(path.clone(), e))?;

            if !context.acting_user.is_anonymous() {
                last_seen
                    .entry(context.acting_user)
                    .and_modify(|t| *t = (*t).max(context.timestamp))
                    .or_insert(context.timestamp);
            }
            summary.records_replayed += 1;
        }
        summary.files_replayed += 1;
    }
    store.set_batch_mode(false);

    for (user, at) in last_seen {
        store.set_last_seen_direct(user, at);
    }
    Ok(summary)
}

/// Dispatches one decoded event to the store's direct-write path, with the
/// record's own time installed via the thread-local clock override so any
/// nested call to `clock::now()` observes the historical time rather than
/// wall-clock time.
fn apply_event(store: &Store, event: &WriteEvent, context: &EventContext, messages_file: Option<&[u8]>) -> Result<(), crate::error::ForumError> {
    with_overridden_time(context.timestamp, || {
        let at = context.timestamp;
        let ip = context.acting_ip;
        match event.clone() {
            WriteEvent::AddNewUser { id, name, auth } => store.add_user_direct(id, &name, &auth, at, ip),
            WriteEvent::ChangeUserName { id, new_name } => store.change_user_name_direct(id, &new_name, at, ip),
            WriteEvent::ChangeUserInfo { id, new_info } => store.change_user_info_direct(id, &new_info, at, ip),
            WriteEvent::DeleteUser { id } => store.delete_user_direct(id),

            WriteEvent::AddNewDiscussionThread { id, name } => store.add_thread_direct(id, &name, at, ip),
            WriteEvent::ChangeDiscussionThreadName { id, new_name } => store.change_thread_name_direct(id, &new_name, at, ip),
            WriteEvent::DeleteDiscussionThread { id } => store.delete_thread_direct(id),
            WriteEvent::PinDiscussionThread { id, display_order } => store.pin_thread_direct(id, display_order),
            WriteEvent::SubscribeToThread { user, thread } => store.subscribe_to_thread_direct(user, thread),
            WriteEvent::UnsubscribeFromThread { user, thread } => store.unsubscribe_from_thread_direct(user, thread),
            WriteEvent::MergeDiscussionThreads { source, destination } => store.merge_threads_direct(source, destination, at),
            WriteEvent::IncrementDiscussionThreadNumberOfVisits { thread, count } => store.increment_thread_visits_direct(thread, count),

            WriteEvent::AddNewDiscussionThreadMessage { id, thread, content, .. } => {
                let creator = (!context.acting_user.is_anonymous()).then_some(context.acting_user);
                let content = match content {
                    MessageContentWire::Inline(bytes) => MessageContent::Inline(bytes),
                    MessageContentWire::Mapped { offset, length } => match messages_file {
                        Some(buf) => {
                            let start = offset as usize;
                            let end = start + length as usize;
                            MessageContent::Inline(buf.get(start..end).unwrap_or_default().to_vec())
                        }
                        None => MessageContent::Mapped { offset, length },
                    },
                };
                store.add_message_direct(id, thread, creator, content, at, ip)
            }
            WriteEvent::ChangeDiscussionThreadMessageContent { id, new_content, reason } => {
                store.change_message_content_direct(id, MessageContent::Inline(new_content.into_bytes()), at, ip, (!reason.is_empty()).then_some(reason))
            }
            WriteEvent::DeleteDiscussionThreadMessage { id } => store.delete_message_direct(id),
            WriteEvent::MoveDiscussionThreadMessage { id, destination_thread } => store.move_message_direct(id, destination_thread),
            WriteEvent::UpVoteMessage { message, user } => store.up_vote_message_direct(message, user, at),
            WriteEvent::DownVoteMessage { message, user } => store.down_vote_message_direct(message, user, at),
            WriteEvent::ResetVoteMessage { message, user } => store.reset_vote_message_direct(message, user, at),
            WriteEvent::AddComment { id, message, content } => {
                let creator = (!context.acting_user.is_anonymous()).then_some(context.acting_user);
                store.add_comment_direct(id, message, creator, &content, at, ip)
            }
            WriteEvent::SolveComment { id } => store.solve_comment_direct(id, at, ip),

            WriteEvent::AddNewDiscussionTag { id, name } => store.add_tag_direct(id, &name, at, ip),
            WriteEvent::ChangeDiscussionTagName { id, new_name } => store.change_tag_name_direct(id, &new_name, at, ip),
            WriteEvent::DeleteDiscussionTag { id } => store.delete_tag_direct(id),
            WriteEvent::AddTagToThread { tag, thread } => store.attach_tag_to_thread_direct(tag, thread),
            WriteEvent::RemoveTagFromThread { tag, thread } => store.detach_tag_from_thread_direct(tag, thread),
            WriteEvent::MergeDiscussionTags { source, destination } => store.merge_tags_direct(source, destination),
            WriteEvent::AddTagToCategory { tag, category } => store.attach_tag_to_category_direct(tag, category),
            WriteEvent::RemoveTagFromCategory { tag, category } => store.detach_tag_from_category_direct(tag, category),

            WriteEvent::AddNewDiscussionCategory { id, name, parent } => store.add_category_direct(id, &name, parent, at, ip),
            WriteEvent::ChangeDiscussionCategoryName { id, new_name } => store.change_category_name_direct(id, &new_name, at, ip),
            WriteEvent::DeleteDiscussionCategory { id } => store.delete_category_direct(id),
            WriteEvent::ChangeDiscussionCategoryParent { id, new_parent } => store.change_category_parent_direct(id, new_parent),
            WriteEvent::ChangeDiscussionCategoryDisplayOrder { id, new_order } => store.change_category_display_order_direct(id, new_order),
            WriteEvent::ChangeDiscussionCategoryDescription { id, new_description } => store.change_category_description_direct(id, &new_description, at, ip),

            WriteEvent::ChangeRequiredPrivilege { scope, privilege, value } => {
                store.change_required_privilege_direct(scope, privilege, value);
                Ok(())
            }
            WriteEvent::ChangeAssignedPrivilege { user, scope, privilege, value, duration } => {
                store.change_assigned_privilege_direct(user, scope, privilege, value, duration, at);
                Ok(())
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthContext;
    use crate::config::Config;
    use crate::eventlog::format::encode_record;
    use crate::id::RawIp;
    use crate::store::validation::PermissiveNameValidator;
    use std::sync::Arc;

    #[test]
    fn replays_user_and_thread_creation_in_file_order() {
        let dir = tempfile::tempdir().unwrap();
        let source_store = Store::new(Config::default());
        let auth = AuthContext { current_user: EntityId::from_raw(0), source_ip: RawIp::UNKNOWN };
        let validator = PermissiveNameValidator;

        let recorder = Arc::new(RecordingObserver::default());
        source_store.add_observer(recorder.clone());
        source_store.add_user(&auth, "alice", "alice-auth", &validator).unwrap();
        source_store.add_thread(&auth, "hello world", &validator).unwrap();

        let mut blob = Vec::new();
        for (event, ctx) in recorder.events.lock().unwrap().iter() {
            let encoded = event.encode(*ctx);
            encode_record(&encoded, &mut blob);
        }
        fs::write(dir.path().join("forum-100.events"), &blob).unwrap();

        let target_store = Store::new(Config::default());
        let summary = import_directory(&target_store, dir.path(), true, None).unwrap();
        assert_eq!(summary.records_replayed, 2);
        assert!(target_store.get_user_by_name("alice").is_some());
    }

    #[derive(Default)]
    struct RecordingObserver {
        events: std::sync::Mutex<Vec<(WriteEvent, EventContext)>>,
    }

    impl crate::store::EventObserver for RecordingObserver {
        fn on_event(&self, event: &WriteEvent, ctx: &crate::store::ObserverContext) {
            let context = EventContext { timestamp: ctx.current_time, acting_user: ctx.performed_by, acting_ip: ctx.source_ip };
            self.events.lock().unwrap().push((event.clone(), context));
        }
    }
}
