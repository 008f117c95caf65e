//! Discussion thread repository (spec §3 "DiscussionThread", §4.2).

use super::collection::EntityCollection;
use super::validation::{validate_length, NameValidator};
use super::{DisplayContext, ObserverContext, Store};
use crate::auth::throttle::{ActionClass, ThrottleRule};
use crate::auth::{authorize, AuthContext};
use crate::clock::Timestamp;
use crate::entities::{DiscussionThread, EntityHeader, Privilege, PrivilegeScope};
use crate::error::{ForumError, ForumResult};
use crate::eventlog::WriteEvent;
use crate::id::{EntityId, RawIp};

impl Store {
    fn mutate_add_thread(collection: &mut EntityCollection, id: EntityId, name: String, created: Timestamp, ip: RawIp) -> ForumResult<()> {
        let header = EntityHeader::new(id, created, ip);
        let thread = DiscussionThread::new(header, name.clone());
        collection.thread_index.by_name.insert(name, id);
        collection.thread_index.by_created.insert(created, id);
        collection.thread_index.by_last_updated.insert(created, id);
        collection.thread_index.by_latest_message_created.insert(created, id);
        collection.thread_index.by_message_count.insert(0, id);
        collection.thread_index.by_pin_display_order.insert(0, id);
        collection.threads.insert(id, thread);
        Ok(())
    }

    pub fn add_thread(&self, auth_ctx: &AuthContext, name: &str, name_validator: &dyn NameValidator) -> ForumResult<EntityId> {
        let now = crate::clock::now();
        let config = self.config.load();
        let id = EntityId::new();

        let mut collection = self.collection.write().expect("collection lock poisoned");
        Store::touch_last_seen(&mut collection, auth_ctx.current_user, now, config.user.last_seen_update_precision);
        let decision = authorize(
            &collection,
            &self.throttler,
            auth_ctx,
            Privilege::AddNewThread,
            PrivilegeScope::ForumWide,
            Some((ActionClass::NewContent, ThrottleRule { max_allowed: 5, period_seconds: 3600 })),
            config.service.disable_throttling,
            now,
        );
        self.check_authorization(auth_ctx, decision)?;
        validate_length("name", name, config.discussion_thread.min_name_length, config.discussion_thread.max_name_length)?;

        Self::mutate_add_thread(&mut collection, id, name.to_string(), now, auth_ctx.source_ip)?;
        if !auth_ctx.current_user.is_anonymous() {
            if let Some(user) = collection.users.get_mut(&auth_ctx.current_user) {
                user.threads_authored.push(id);
                user.thread_count += 1;
                let old = user.thread_count - 1;
                collection.user_index.by_thread_count.reindex(&old, user.thread_count, auth_ctx.current_user);
            }
        }
        drop(collection);

        self.notify(
            &WriteEvent::AddNewDiscussionThread { id, name: name.to_string() },
            &ObserverContext { performed_by: auth_ctx.current_user, current_time: now, source_ip: auth_ctx.source_ip },
        );
        Ok(id)
    }

    pub fn add_thread_direct(&self, id: EntityId, name: &str, created: Timestamp, ip: RawIp) -> ForumResult<()> {
        self.with_writer(|collection| Self::mutate_add_thread(collection, id, name.to_string(), created, ip))
    }

    fn mutate_change_thread_name(collection: &mut EntityCollection, id: EntityId, new_name: String, at: Timestamp, ip: RawIp) -> ForumResult<()> {
        let thread = collection.threads.get_mut(&id).ok_or_else(|| ForumError::NotFound(format!("thread {id}")))?;
        let old_name = thread.name.clone();
        thread.name = new_name.clone();
        thread.header.touch(at, ip, Some(id), "name changed");
        collection.thread_index.by_name.reindex(&old_name, new_name, id);
        let old_updated = thread.latest_visible_change;
        thread.latest_visible_change = at;
        collection.thread_index.by_last_updated.reindex(&old_updated, at, id);
        Ok(())
    }

    pub fn change_thread_name(&self, auth_ctx: &AuthContext, id: EntityId, new_name: &str, name_validator: &dyn NameValidator) -> ForumResult<()> {
        let now = crate::clock::now();
        let config = self.config.load();
        let mut collection = self.collection.write().expect("collection lock poisoned");
        Store::touch_last_seen(&mut collection, auth_ctx.current_user, now, config.user.last_seen_update_precision);

        let decision = authorize(
            &collection,
            &self.throttler,
            auth_ctx,
            Privilege::EditThreadName,
            PrivilegeScope::Thread(id),
            Some((ActionClass::EditContent, ThrottleRule { max_allowed: 20, period_seconds: 3600 })),
            config.service.disable_throttling,
            now,
        );
        self.check_authorization(auth_ctx, decision)?;
        validate_length("name", new_name, config.discussion_thread.min_name_length, config.discussion_thread.max_name_length)?;
        let _ = name_validator;

        Self::mutate_change_thread_name(&mut collection, id, new_name.to_string(), now, auth_ctx.source_ip)?;
        drop(collection);

        self.notify(
            &WriteEvent::ChangeDiscussionThreadName { id, new_name: new_name.to_string() },
            &ObserverContext { performed_by: auth_ctx.current_user, current_time: now, source_ip: auth_ctx.source_ip },
        );
        Ok(())
    }

    pub fn change_thread_name_direct(&self, id: EntityId, new_name: &str, at: Timestamp, ip: RawIp) -> ForumResult<()> {
        self.with_writer(|collection| Self::mutate_change_thread_name(collection, id, new_name.to_string(), at, ip))
    }

    fn mutate_delete_thread(collection: &mut EntityCollection, id: EntityId) -> ForumResult<()> {
        let thread = collection.threads.remove(&id).ok_or_else(|| ForumError::NotFound(format!("thread {id}")))?;
        collection.thread_index.by_name.remove(&thread.name);
        collection.thread_index.by_created.remove(&thread.header.created, id);
        collection.thread_index.by_last_updated.remove(&thread.latest_visible_change, id);
        collection.thread_index.by_latest_message_created.remove(&thread.latest_visible_change, id);
        collection.thread_index.by_message_count.remove(&thread.messages.len(), id);
        collection.thread_index.by_pin_display_order.remove(&thread.pin_display_order, id);
        for tag_id in &thread.tags {
            collection.thread_index.by_tag.remove(tag_id, id);
            if let Some(tag) = collection.tags.get_mut(tag_id) {
                tag.threads.remove(&id);
            }
        }
        for message_id in thread.messages.clone() {
            if let Some(message) = collection.messages.remove(&message_id) {
                collection.message_index.by_created.remove(&message.header.created, message_id);
                for comment_id in &message.comments {
                    collection.comments.remove(comment_id);
                }
            }
        }
        collection.message_index.rank_by_thread.remove(&id);
        for user_id in &thread.subscribed_users {
            if let Some(user) = collection.users.get_mut(user_id) {
                user.subscribed_threads.retain(|t| *t != id);
            }
        }
        Ok(())
    }

    pub fn delete_thread(&self, auth_ctx: &AuthContext, id: EntityId) -> ForumResult<()> {
        let now = crate::clock::now();
        let config = self.config.load();
        let mut collection = self.collection.write().expect("collection lock poisoned");
        Store::touch_last_seen(&mut collection, auth_ctx.current_user, now, config.user.last_seen_update_precision);

        let decision = authorize(&collection, &self.throttler, auth_ctx, Privilege::DeleteThread, PrivilegeScope::Thread(id), None, config.service.disable_throttling, now);
        self.check_authorization(auth_ctx, decision)?;

        Self::mutate_delete_thread(&mut collection, id)?;
        drop(collection);

        self.notify(&WriteEvent::DeleteDiscussionThread { id }, &ObserverContext { performed_by: auth_ctx.current_user, current_time: now, source_ip: auth_ctx.source_ip });
        Ok(())
    }

    pub fn delete_thread_direct(&self, id: EntityId) -> ForumResult<()> {
        self.with_writer(|collection| Self::mutate_delete_thread(collection, id))
    }

    fn mutate_pin_thread(collection: &mut EntityCollection, id: EntityId, display_order: u32) -> ForumResult<()> {
        let thread = collection.threads.get_mut(&id).ok_or_else(|| ForumError::NotFound(format!("thread {id}")))?;
        let old = thread.pin_display_order;
        thread.pin_display_order = display_order;
        collection.thread_index.by_pin_display_order.reindex(&old, display_order, id);
        Ok(())
    }

    pub fn pin_thread(&self, auth_ctx: &AuthContext, id: EntityId, display_order: u32) -> ForumResult<()> {
        let now = crate::clock::now();
        let config = self.config.load();
        let mut collection = self.collection.write().expect("collection lock poisoned");
        Store::touch_last_seen(&mut collection, auth_ctx.current_user, now, config.user.last_seen_update_precision);

        let decision = authorize(&collection, &self.throttler, auth_ctx, Privilege::EditThreadName, PrivilegeScope::Thread(id), None, config.service.disable_throttling, now);
        self.check_authorization(auth_ctx, decision)?;

        Self::mutate_pin_thread(&mut collection, id, display_order)?;
        drop(collection);

        self.notify(
            &WriteEvent::PinDiscussionThread { id, display_order },
            &ObserverContext { performed_by: auth_ctx.current_user, current_time: now, source_ip: auth_ctx.source_ip },
        );
        Ok(())
    }

    pub fn pin_thread_direct(&self, id: EntityId, display_order: u32) -> ForumResult<()> {
        self.with_writer(|collection| Self::mutate_pin_thread(collection, id, display_order))
    }

    fn mutate_subscribe(collection: &mut EntityCollection, user: EntityId, thread: EntityId, subscribe: bool) -> ForumResult<()> {
        let t = collection.threads.get_mut(&thread).ok_or_else(|| ForumError::NotFound(format!("thread {thread}")))?;
        if subscribe {
            t.subscribed_users.insert(user);
        } else {
            t.subscribed_users.remove(&user);
        }
        if let Some(u) = collection.users.get_mut(&user) {
            if subscribe {
                if !u.subscribed_threads.contains(&thread) {
                    u.subscribed_threads.push(thread);
                }
            } else {
                u.subscribed_threads.retain(|t| *t != thread);
            }
        }
        Ok(())
    }

    pub fn subscribe_to_thread(&self, auth_ctx: &AuthContext, thread: EntityId) -> ForumResult<()> {
        let now = crate::clock::now();
        let config = self.config.load();
        let mut collection = self.collection.write().expect("collection lock poisoned");
        Store::touch_last_seen(&mut collection, auth_ctx.current_user, now, config.user.last_seen_update_precision);

        let decision = authorize(
            &collection,
            &self.throttler,
            auth_ctx,
            Privilege::SubscribeToThread,
            PrivilegeScope::Thread(thread),
            Some((ActionClass::Subscribe, ThrottleRule { max_allowed: 50, period_seconds: 3600 })),
            config.service.disable_throttling,
            now,
        );
        self.check_authorization(auth_ctx, decision)?;
        if auth_ctx.current_user.is_anonymous() {
            return Err(ForumError::NotAllowed);
        }

        Self::mutate_subscribe(&mut collection, auth_ctx.current_user, thread, true)?;
        drop(collection);

        self.notify(
            &WriteEvent::SubscribeToThread { user: auth_ctx.current_user, thread },
            &ObserverContext { performed_by: auth_ctx.current_user, current_time: now, source_ip: auth_ctx.source_ip },
        );
        Ok(())
    }

    pub fn subscribe_to_thread_direct(&self, user: EntityId, thread: EntityId) -> ForumResult<()> {
        self.with_writer(|collection| Self::mutate_subscribe(collection, user, thread, true))
    }

    pub fn unsubscribe_from_thread(&self, auth_ctx: &AuthContext, thread: EntityId) -> ForumResult<()> {
        let now = crate::clock::now();
        let config = self.config.load();
        let mut collection = self.collection.write().expect("collection lock poisoned");
        Store::touch_last_seen(&mut collection, auth_ctx.current_user, now, config.user.last_seen_update_precision);

        let decision = authorize(&collection, &self.throttler, auth_ctx, Privilege::SubscribeToThread, PrivilegeScope::Thread(thread), None, config.service.disable_throttling, now);
        self.check_authorization(auth_ctx, decision)?;

        Self::mutate_subscribe(&mut collection, auth_ctx.current_user, thread, false)?;
        drop(collection);

        self.notify(
            &WriteEvent::UnsubscribeFromThread { user: auth_ctx.current_user, thread },
            &ObserverContext { performed_by: auth_ctx.current_user, current_time: now, source_ip: auth_ctx.source_ip },
        );
        Ok(())
    }

    pub fn unsubscribe_from_thread_direct(&self, user: EntityId, thread: EntityId) -> ForumResult<()> {
        self.with_writer(|collection| Self::mutate_subscribe(collection, user, thread, false))
    }

    fn mutate_merge_threads(collection: &mut EntityCollection, source: EntityId, destination: EntityId, at: Timestamp) -> ForumResult<()> {
        if source == destination {
            return Err(ForumError::CircularReferenceNotAllowed);
        }
        let source_thread = collection.threads.remove(&source).ok_or_else(|| ForumError::NotFound(format!("thread {source}")))?;
        collection.thread_index.by_name.remove(&source_thread.name);
        collection.thread_index.by_created.remove(&source_thread.header.created, source);
        collection.thread_index.by_last_updated.remove(&source_thread.latest_visible_change, source);
        collection.thread_index.by_latest_message_created.remove(&source_thread.latest_visible_change, source);
        collection.thread_index.by_message_count.remove(&source_thread.messages.len(), source);
        collection.thread_index.by_pin_display_order.remove(&source_thread.pin_display_order, source);

        let destination_thread = collection.threads.get_mut(&destination).ok_or_else(|| ForumError::NotFound(format!("thread {destination}")))?;
        let old_count = destination_thread.messages.len();
        for message_id in &source_thread.messages {
            destination_thread.messages.push(*message_id);
        }
        destination_thread.subscribed_users.extend(source_thread.subscribed_users.iter().copied());
        let tags_to_add: Vec<EntityId> = source_thread.tags.iter().copied().collect();
        destination_thread.tags.extend(tags_to_add.iter().copied());
        let new_count = destination_thread.messages.len();

        for message_id in &source_thread.messages {
            if let Some(message) = collection.messages.get_mut(message_id) {
                message.thread_id = destination;
            }
        }
        for tag_id in tags_to_add {
            collection.thread_index.by_tag.insert(tag_id, destination);
            collection.thread_index.by_tag.remove(&tag_id, source);
            if let Some(tag) = collection.tags.get_mut(&tag_id) {
                tag.threads.insert(destination);
                tag.threads.remove(&source);
            }
        }
        collection.thread_index.by_message_count.reindex(&old_count, new_count, destination);
        let _ = at;
        Ok(())
    }

    pub fn merge_threads(&self, auth_ctx: &AuthContext, source: EntityId, destination: EntityId) -> ForumResult<()> {
        let now = crate::clock::now();
        let config = self.config.load();
        let mut collection = self.collection.write().expect("collection lock poisoned");
        Store::touch_last_seen(&mut collection, auth_ctx.current_user, now, config.user.last_seen_update_precision);

        let decision = authorize(&collection, &self.throttler, auth_ctx, Privilege::DeleteThread, PrivilegeScope::ForumWide, None, config.service.disable_throttling, now);
        self.check_authorization(auth_ctx, decision)?;

        Self::mutate_merge_threads(&mut collection, source, destination, now)?;
        drop(collection);

        self.notify(
            &WriteEvent::MergeDiscussionThreads { source, destination },
            &ObserverContext { performed_by: auth_ctx.current_user, current_time: now, source_ip: auth_ctx.source_ip },
        );
        Ok(())
    }

    pub fn merge_threads_direct(&self, source: EntityId, destination: EntityId, at: Timestamp) -> ForumResult<()> {
        self.with_writer(|collection| Self::mutate_merge_threads(collection, source, destination, at))
    }

    /// Records a visit without touching the writer lock's hot path: bumps
    /// `pending_visits`, flushed to `visited` and the event log in a batch
    /// (spec §4.4 post-processing, §9 "visit counters are batched").
    pub fn record_thread_visit(&self, thread: EntityId) {
        self.with_writer(|collection| {
            if let Some(t) = collection.threads.get_mut(&thread) {
                t.pending_visits += 1;
            }
        });
    }

    /// Flushes every thread's pending visit count into `visited` and emits
    /// one `IncrementDiscussionThreadNumberOfVisits` event per thread with
    /// pending visits, then clears the counters.
    pub fn flush_pending_visits(&self) {
        let now = crate::clock::now();
        let flushed: Vec<(EntityId, u64)> = self.with_writer(|collection| {
            let mut out = Vec::new();
            for (id, thread) in collection.threads.iter_mut() {
                if thread.pending_visits > 0 {
                    thread.visited += thread.pending_visits;
                    out.push((*id, thread.pending_visits));
                    thread.pending_visits = 0;
                }
            }
            out
        });
        for (id, count) in flushed {
            self.notify(
                &WriteEvent::IncrementDiscussionThreadNumberOfVisits { thread: id, count: count as u32 },
                &ObserverContext { performed_by: EntityId::from_raw(0), current_time: now, source_ip: RawIp::UNKNOWN },
            );
        }
    }

    pub fn increment_thread_visits_direct(&self, thread: EntityId, count: u32) -> ForumResult<()> {
        self.with_writer(|collection| {
            let t = collection.threads.get_mut(&thread).ok_or_else(|| ForumError::NotFound(format!("thread {thread}")))?;
            t.visited += count as u64;
            Ok(())
        })
    }

    pub fn get_thread_by_id(&self, id: EntityId) -> Option<DiscussionThread> {
        self.with_reader(|collection| collection.threads.get(&id).cloned())
    }

    pub fn list_threads_by_latest_message(&self, ctx: &DisplayContext, page_size: usize) -> Vec<DiscussionThread> {
        self.with_reader(|collection| {
            collection
                .thread_index
                .by_latest_message_created
                .page(ctx.sort_order.into(), ctx.page_number, page_size)
                .into_iter()
                .filter_map(|id| collection.threads.get(&id).cloned())
                .collect()
        })
    }
}
