//! Discussion thread message repository (spec §3 "DiscussionThreadMessage",
//! §4.2, §6.3 mapped-content storage).

use super::collection::EntityCollection;
use super::validation::validate_length;
use super::{ObserverContext, Store};
use crate::auth::throttle::{ActionClass, ThrottleRule};
use crate::auth::{authorize, AuthContext};
use crate::clock::Timestamp;
use crate::entities::{DiscussionThreadMessage, EntityHeader, MessageContent, Privilege, PrivilegeScope, Vote, VoteValue};
use crate::error::{ForumError, ForumResult};
use crate::eventlog::{MessageContentWire, WriteEvent};
use crate::id::{EntityId, RawIp};
use crate::indexing::RankedIndex;

/// Content above this many bytes is written to the side messages file and
/// referenced by `(offset, length)` rather than inlined in the event log
/// (spec §6.3, §9 "Message content storage").
pub const INLINE_CONTENT_THRESHOLD: usize = 4096;

impl Store {
    fn mutate_add_message(collection: &mut EntityCollection, id: EntityId, thread_id: EntityId, creator_id: Option<EntityId>, content: MessageContent, created: Timestamp, ip: RawIp) -> ForumResult<()> {
        let thread = collection.threads.get_mut(&thread_id).ok_or_else(|| ForumError::NotFound(format!("thread {thread_id}")))?;
        let header = EntityHeader::new(id, created, ip);
        let message = DiscussionThreadMessage::new(header, thread_id, creator_id, content);
        thread.messages.push(id);
        let old_count = thread.messages.len() - 1;
        let old_latest = thread.latest_visible_change;
        thread.latest_visible_change = created;

        collection.thread_index.by_message_count.reindex(&old_count, old_count + 1, thread_id);
        collection.thread_index.by_last_updated.reindex(&old_latest, created, thread_id);
        collection.thread_index.by_latest_message_created.reindex(&old_latest, created, thread_id);

        collection.message_index.by_created.insert(created, id);
        collection.message_index.rank_by_thread.entry(thread_id).or_insert_with(RankedIndex::new).insert(created, id);
        collection.messages.insert(id, message);

        if let Some(creator) = creator_id {
            if let Some(user) = collection.users.get_mut(&creator) {
                user.messages_authored.push(id);
                user.message_count += 1;
                let old = user.message_count - 1;
                collection.user_index.by_message_count.reindex(&old, user.message_count, creator);
            }
        }
        Ok(())
    }

    pub fn add_message(&self, auth_ctx: &AuthContext, thread_id: EntityId, content: Vec<u8>) -> ForumResult<EntityId> {
        let now = crate::clock::now();
        let config = self.config.load();
        let id = EntityId::new();

        let mut collection = self.collection.write().expect("collection lock poisoned");
        Store::touch_last_seen(&mut collection, auth_ctx.current_user, now, config.user.last_seen_update_precision);
        let decision = authorize(
            &collection,
            &self.throttler,
            auth_ctx,
            Privilege::AddNewThreadMessage,
            PrivilegeScope::Thread(thread_id),
            Some((ActionClass::NewContent, ThrottleRule { max_allowed: 30, period_seconds: 3600 })),
            config.service.disable_throttling,
            now,
        );
        self.check_authorization(auth_ctx, decision)?;
        let text = String::from_utf8_lossy(&content);
        validate_length("content", &text, config.discussion_thread_message.min_content_length, config.discussion_thread_message.max_content_length)?;

        let creator_id = (!auth_ctx.current_user.is_anonymous()).then_some(auth_ctx.current_user);
        Self::mutate_add_message(&mut collection, id, thread_id, creator_id, MessageContent::Inline(content.clone()), now, auth_ctx.source_ip)?;
        drop(collection);

        let wire = if content.len() > INLINE_CONTENT_THRESHOLD {
            let appender = self.messages_file.as_ref();
            match appender {
                Some(appender) => match appender.append(&content) {
                    Ok((offset, length)) => MessageContentWire::Mapped { offset, length },
                    Err(e) => {
                        tracing::error!(error = %e, "failed to append to messages file, falling back to inline log storage");
                        MessageContentWire::Inline(content)
                    }
                },
                None => MessageContentWire::Inline(content),
            }
        } else {
            MessageContentWire::Inline(content)
        };
        let version = if matches!(wire, MessageContentWire::Mapped { .. }) { 2 } else { 1 };

        self.notify(
            &WriteEvent::AddNewDiscussionThreadMessage { id, thread: thread_id, content: wire, version },
            &ObserverContext { performed_by: auth_ctx.current_user, current_time: now, source_ip: auth_ctx.source_ip },
        );
        Ok(id)
    }

    pub fn add_message_direct(&self, id: EntityId, thread_id: EntityId, creator_id: Option<EntityId>, content: MessageContent, created: Timestamp, ip: RawIp) -> ForumResult<()> {
        self.with_writer(|collection| Self::mutate_add_message(collection, id, thread_id, creator_id, content, created, ip))
    }

    fn mutate_change_message_content(collection: &mut EntityCollection, id: EntityId, new_content: MessageContent, at: Timestamp, ip: RawIp, reason: Option<String>) -> ForumResult<()> {
        let message = collection.messages.get_mut(&id).ok_or_else(|| ForumError::NotFound(format!("message {id}")))?;
        let previous = std::mem::replace(&mut message.content, new_content);
        message.push_edit_history(previous, at, reason);
        message.header.touch(at, ip, None, "content edited");
        let thread_id = message.thread_id;
        if let Some(thread) = collection.threads.get_mut(&thread_id) {
            let old = thread.latest_visible_change;
            thread.latest_visible_change = at;
            collection.thread_index.by_last_updated.reindex(&old, at, thread_id);
        }
        Ok(())
    }

    pub fn change_message_content(&self, auth_ctx: &AuthContext, id: EntityId, new_content: Vec<u8>, reason: Option<String>) -> ForumResult<()> {
        let now = crate::clock::now();
        let config = self.config.load();
        let mut collection = self.collection.write().expect("collection lock poisoned");
        Store::touch_last_seen(&mut collection, auth_ctx.current_user, now, config.user.last_seen_update_precision);

        let decision = authorize(
            &collection,
            &self.throttler,
            auth_ctx,
            Privilege::EditMessageContent,
            PrivilegeScope::Message(id),
            Some((ActionClass::EditContent, ThrottleRule { max_allowed: 30, period_seconds: 3600 })),
            config.service.disable_throttling,
            now,
        );
        self.check_authorization(auth_ctx, decision)?;
        let text = String::from_utf8_lossy(&new_content);
        validate_length("content", &text, config.discussion_thread_message.min_content_length, config.discussion_thread_message.max_content_length)?;

        Self::mutate_change_message_content(&mut collection, id, MessageContent::Inline(new_content.clone()), now, auth_ctx.source_ip, reason.clone())?;
        drop(collection);

        self.notify(
            &WriteEvent::ChangeDiscussionThreadMessageContent { id, new_content: String::from_utf8_lossy(&new_content).into_owned(), reason: reason.unwrap_or_default() },
            &ObserverContext { performed_by: auth_ctx.current_user, current_time: now, source_ip: auth_ctx.source_ip },
        );
        Ok(())
    }

    pub fn change_message_content_direct(&self, id: EntityId, new_content: MessageContent, at: Timestamp, ip: RawIp, reason: Option<String>) -> ForumResult<()> {
        self.with_writer(|collection| Self::mutate_change_message_content(collection, id, new_content, at, ip, reason))
    }

    fn mutate_delete_message(collection: &mut EntityCollection, id: EntityId) -> ForumResult<()> {
        let message = collection.messages.remove(&id).ok_or_else(|| ForumError::NotFound(format!("message {id}")))?;
        collection.message_index.by_created.remove(&message.header.created, id);
        if let Some(ranked) = collection.message_index.rank_by_thread.get_mut(&message.thread_id) {
            ranked.remove(message.header.created, id);
        }
        for comment_id in &message.comments {
            collection.comments.remove(comment_id);
        }
        let mut recompute_latest = None;
        if let Some(thread) = collection.threads.get_mut(&message.thread_id) {
            thread.messages.retain(|m| *m != id);
            let old_count = thread.messages.len() + 1;
            collection.thread_index.by_message_count.reindex(&old_count, old_count - 1, message.thread_id);
            recompute_latest = Some((thread.header.created, thread.latest_visible_change, thread.messages.clone()));
        }
        if let Some((thread_created, old_latest, remaining)) = recompute_latest {
            // §3: latestVisibleChange is max(created, max message.created, max
            // message.lastUpdated) over the thread's remaining messages — a
            // deletion of the newest message can only ever lower this value.
            let remaining_max = remaining
                .iter()
                .filter_map(|m| collection.messages.get(m))
                .map(|m| m.header.last_updated.as_ref().map_or(m.header.created, |u| u.at))
                .max();
            let new_latest = remaining_max.map_or(thread_created, |m| m.max(thread_created));
            if let Some(thread) = collection.threads.get_mut(&message.thread_id) {
                thread.latest_visible_change = new_latest;
            }
            collection.thread_index.by_last_updated.reindex(&old_latest, new_latest, message.thread_id);
            collection.thread_index.by_latest_message_created.reindex(&old_latest, new_latest, message.thread_id);
        }
        if let Some(creator) = message.creator_id {
            if let Some(user) = collection.users.get_mut(&creator) {
                user.messages_authored.retain(|m| *m != id);
                let old = user.message_count;
                user.message_count = user.message_count.saturating_sub(1);
                collection.user_index.by_message_count.reindex(&old, user.message_count, creator);
            }
        }
        Ok(())
    }

    pub fn delete_message(&self, auth_ctx: &AuthContext, id: EntityId) -> ForumResult<()> {
        let now = crate::clock::now();
        let config = self.config.load();
        let mut collection = self.collection.write().expect("collection lock poisoned");
        Store::touch_last_seen(&mut collection, auth_ctx.current_user, now, config.user.last_seen_update_precision);

        let decision = authorize(&collection, &self.throttler, auth_ctx, Privilege::DeleteMessage, PrivilegeScope::Message(id), None, config.service.disable_throttling, now);
        self.check_authorization(auth_ctx, decision)?;

        Self::mutate_delete_message(&mut collection, id)?;
        drop(collection);

        self.notify(&WriteEvent::DeleteDiscussionThreadMessage { id }, &ObserverContext { performed_by: auth_ctx.current_user, current_time: now, source_ip: auth_ctx.source_ip });
        Ok(())
    }

    pub fn delete_message_direct(&self, id: EntityId) -> ForumResult<()> {
        self.with_writer(|collection| Self::mutate_delete_message(collection, id))
    }

    fn mutate_move_message(collection: &mut EntityCollection, id: EntityId, destination_thread: EntityId) -> ForumResult<()> {
        let source_thread_id = collection.messages.get(&id).ok_or_else(|| ForumError::NotFound(format!("message {id}")))?.thread_id;
        if source_thread_id == destination_thread {
            return Err(ForumError::NoEffect);
        }
        if !collection.threads.contains_key(&destination_thread) {
            return Err(ForumError::NotFound(format!("thread {destination_thread}")));
        }
        let created = collection.messages.get(&id).unwrap().header.created;
        if let Some(ranked) = collection.message_index.rank_by_thread.get_mut(&source_thread_id) {
            ranked.remove(created, id);
        }
        collection.message_index.rank_by_thread.entry(destination_thread).or_insert_with(RankedIndex::new).insert(created, id);

        if let Some(source) = collection.threads.get_mut(&source_thread_id) {
            source.messages.retain(|m| *m != id);
            let old = source.messages.len() + 1;
            collection.thread_index.by_message_count.reindex(&old, old - 1, source_thread_id);
        }
        if let Some(dest) = collection.threads.get_mut(&destination_thread) {
            dest.messages.push(id);
            let old = dest.messages.len() - 1;
            collection.thread_index.by_message_count.reindex(&old, old + 1, destination_thread);
        }
        collection.messages.get_mut(&id).unwrap().thread_id = destination_thread;
        Ok(())
    }

    pub fn move_message(&self, auth_ctx: &AuthContext, id: EntityId, destination_thread: EntityId) -> ForumResult<()> {
        let now = crate::clock::now();
        let config = self.config.load();
        let mut collection = self.collection.write().expect("collection lock poisoned");
        Store::touch_last_seen(&mut collection, auth_ctx.current_user, now, config.user.last_seen_update_precision);

        let decision = authorize(&collection, &self.throttler, auth_ctx, Privilege::DeleteMessage, PrivilegeScope::Message(id), None, config.service.disable_throttling, now);
        self.check_authorization(auth_ctx, decision)?;

        Self::mutate_move_message(&mut collection, id, destination_thread)?;
        drop(collection);

        self.notify(
            &WriteEvent::MoveDiscussionThreadMessage { id, destination_thread },
            &ObserverContext { performed_by: auth_ctx.current_user, current_time: now, source_ip: auth_ctx.source_ip },
        );
        Ok(())
    }

    pub fn move_message_direct(&self, id: EntityId, destination_thread: EntityId) -> ForumResult<()> {
        self.with_writer(|collection| Self::mutate_move_message(collection, id, destination_thread))
    }

    fn mutate_vote(collection: &mut EntityCollection, message_id: EntityId, user: EntityId, value: Option<VoteValue>, at: Timestamp) -> ForumResult<()> {
        let message = collection.messages.get_mut(&message_id).ok_or_else(|| ForumError::NotFound(format!("message {message_id}")))?;
        match value {
            Some(v) => {
                message.votes.insert(user, Vote { value: v, at });
            }
            None => {
                message.votes.remove(&user);
            }
        }
        Ok(())
    }

    fn vote(&self, auth_ctx: &AuthContext, message_id: EntityId, value: Option<VoteValue>, privilege: Privilege) -> ForumResult<()> {
        let now = crate::clock::now();
        let config = self.config.load();
        if auth_ctx.current_user.is_anonymous() {
            return Err(ForumError::NotAllowed);
        }
        let mut collection = self.collection.write().expect("collection lock poisoned");
        Store::touch_last_seen(&mut collection, auth_ctx.current_user, now, config.user.last_seen_update_precision);

        let decision = authorize(
            &collection,
            &self.throttler,
            auth_ctx,
            privilege,
            PrivilegeScope::Message(message_id),
            Some((ActionClass::Vote, ThrottleRule { max_allowed: 100, period_seconds: 3600 })),
            config.service.disable_throttling,
            now,
        );
        self.check_authorization(auth_ctx, decision)?;

        if let Some(existing) = collection.messages.get(&message_id).and_then(|m| m.votes.get(&auth_ctx.current_user)) {
            if Some(existing.value) == value {
                return Err(ForumError::NoEffect);
            }
        }

        Self::mutate_vote(&mut collection, message_id, auth_ctx.current_user, value, now)?;
        drop(collection);

        let event = match value {
            Some(VoteValue::Up) => WriteEvent::UpVoteMessage { message: message_id, user: auth_ctx.current_user },
            Some(VoteValue::Down) => WriteEvent::DownVoteMessage { message: message_id, user: auth_ctx.current_user },
            None => WriteEvent::ResetVoteMessage { message: message_id, user: auth_ctx.current_user },
        };
        self.notify(&event, &ObserverContext { performed_by: auth_ctx.current_user, current_time: now, source_ip: auth_ctx.source_ip });
        Ok(())
    }

    pub fn up_vote_message(&self, auth_ctx: &AuthContext, message_id: EntityId) -> ForumResult<()> {
        self.vote(auth_ctx, message_id, Some(VoteValue::Up), Privilege::UpVote)
    }

    pub fn down_vote_message(&self, auth_ctx: &AuthContext, message_id: EntityId) -> ForumResult<()> {
        self.vote(auth_ctx, message_id, Some(VoteValue::Down), Privilege::DownVote)
    }

    pub fn reset_vote_message(&self, auth_ctx: &AuthContext, message_id: EntityId) -> ForumResult<()> {
        self.vote(auth_ctx, message_id, None, Privilege::ResetVote)
    }

    pub fn up_vote_message_direct(&self, message_id: EntityId, user: EntityId, at: Timestamp) -> ForumResult<()> {
        self.with_writer(|collection| Self::mutate_vote(collection, message_id, user, Some(VoteValue::Up), at))
    }

    pub fn down_vote_message_direct(&self, message_id: EntityId, user: EntityId, at: Timestamp) -> ForumResult<()> {
        self.with_writer(|collection| Self::mutate_vote(collection, message_id, user, Some(VoteValue::Down), at))
    }

    pub fn reset_vote_message_direct(&self, message_id: EntityId, user: EntityId, at: Timestamp) -> ForumResult<()> {
        self.with_writer(|collection| Self::mutate_vote(collection, message_id, user, None, at))
    }

    pub fn get_message_by_id(&self, id: EntityId) -> Option<DiscussionThreadMessage> {
        self.with_reader(|collection| collection.messages.get(&id).cloned())
    }

    /// Returns messages in a thread in creation-rank order (spec §4.1
    /// "ranked by thread").
    pub fn list_messages_in_thread(&self, thread: EntityId, page_number: usize, page_size: usize) -> Vec<DiscussionThreadMessage> {
        self.with_reader(|collection| {
            let Some(ranked) = collection.message_index.rank_by_thread.get(&thread) else {
                return Vec::new();
            };
            ranked
                .page(page_number, page_size)
                .into_iter()
                .filter_map(|id| collection.messages.get(&id).cloned())
                .collect()
        })
    }
}
