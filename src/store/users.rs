//! User repository (spec §3 "User", §4.2).

use super::collection::EntityCollection;
use super::validation::{validate_length, validate_name, NameValidator};
use super::{DisplayContext, ObserverContext, SortOrder, Store};
use crate::auth::throttle::{ActionClass, ThrottleRule};
use crate::auth::{authorize, AuthContext};
use crate::clock::Timestamp;
use crate::entities::{EntityHeader, Privilege, PrivilegeScope, User};
use crate::error::{ForumError, ForumResult};
use crate::eventlog::WriteEvent;
use crate::id::{EntityId, RawIp};
use crate::indexing::SortDirection;

impl Store {
    /// Internal mutation shared by the authorized command and the
    /// importer's direct-write path (spec §9 "direct-write path").
    fn mutate_add_user(collection: &mut EntityCollection, id: EntityId, name: String, auth: String, created: Timestamp, ip: RawIp) -> ForumResult<()> {
        if collection.user_index.by_name.contains(&name) {
            return Err(ForumError::AlreadyExists(format!("user named '{name}'")));
        }
        if collection.user_index.by_auth.contains(&auth) {
            return Err(ForumError::UserWithSameAuthAlreadyExists);
        }
        let header = EntityHeader::new(id, created, ip);
        let user = User::new(header, name.clone(), auth.clone());
        collection.user_index.by_name.insert(name, id);
        collection.user_index.by_auth.insert(auth, id);
        collection.user_index.by_created.insert(created, id);
        collection.user_index.by_last_seen.insert(created, id);
        collection.user_index.by_message_count.insert(0, id);
        collection.user_index.by_thread_count.insert(0, id);
        collection.users.insert(id, user);
        Ok(())
    }

    pub fn add_user(&self, auth_ctx: &AuthContext, name: &str, auth_handle: &str, name_validator: &dyn NameValidator) -> ForumResult<EntityId> {
        let now = crate::clock::now();
        let config = self.config.load();
        let id = EntityId::new();

        let mut collection = self.collection.write().expect("collection lock poisoned");
        Store::touch_last_seen(&mut collection, auth_ctx.current_user, now, config.user.last_seen_update_precision);

        let decision = authorize(
            &collection,
            &self.throttler,
            auth_ctx,
            Privilege::AddNewThread, // creating an account reuses the forum-wide baseline gate
            PrivilegeScope::ForumWide,
            Some((ActionClass::NewContent, ThrottleRule { max_allowed: 10, period_seconds: 3600 })),
            config.service.disable_throttling,
            now,
        );
        self.check_authorization(auth_ctx, decision)?;

        validate_name("name", name, config.user.min_name_length, config.user.max_name_length, name_validator)?;
        validate_length("auth", auth_handle, 1, config.user.max_name_length)?;

        Self::mutate_add_user(&mut collection, id, name.to_string(), auth_handle.to_string(), now, auth_ctx.source_ip)?;
        drop(collection);

        self.notify(
            &WriteEvent::AddNewUser { id, name: name.to_string(), auth: auth_handle.to_string() },
            &ObserverContext { performed_by: auth_ctx.current_user, current_time: now, source_ip: auth_ctx.source_ip },
        );
        Ok(id)
    }

    /// Direct-write entry used by the event log importer.
    pub fn add_user_direct(&self, id: EntityId, name: &str, auth: &str, created: Timestamp, ip: RawIp) -> ForumResult<()> {
        self.with_writer(|collection| Self::mutate_add_user(collection, id, name.to_string(), auth.to_string(), created, ip))
    }

    fn mutate_change_user_name(collection: &mut EntityCollection, id: EntityId, new_name: String, at: Timestamp, ip: RawIp) -> ForumResult<()> {
        if collection.user_index.by_name.contains(&new_name) {
            return Err(ForumError::AlreadyExists(format!("user named '{new_name}'")));
        }
        let user = collection.users.get_mut(&id).ok_or_else(|| ForumError::NotFound(format!("user {id}")))?;
        let old_name = user.name.clone();
        user.name = new_name.clone();
        user.header.touch(at, ip, Some(id), "name changed");
        collection.user_index.by_name.reindex(&old_name, new_name, id);
        Ok(())
    }

    pub fn change_user_name(&self, auth_ctx: &AuthContext, id: EntityId, new_name: &str, name_validator: &dyn NameValidator) -> ForumResult<()> {
        let now = crate::clock::now();
        let config = self.config.load();
        let mut collection = self.collection.write().expect("collection lock poisoned");
        Store::touch_last_seen(&mut collection, auth_ctx.current_user, now, config.user.last_seen_update_precision);

        let decision = authorize(
            &collection,
            &self.throttler,
            auth_ctx,
            Privilege::EditThreadName,
            PrivilegeScope::ForumWide,
            Some((ActionClass::EditContent, ThrottleRule { max_allowed: 10, period_seconds: 3600 })),
            config.service.disable_throttling,
            now,
        );
        self.check_authorization(auth_ctx, decision)?;
        validate_name("name", new_name, config.user.min_name_length, config.user.max_name_length, name_validator)?;

        Self::mutate_change_user_name(&mut collection, id, new_name.to_string(), now, auth_ctx.source_ip)?;
        drop(collection);

        self.notify(
            &WriteEvent::ChangeUserName { id, new_name: new_name.to_string() },
            &ObserverContext { performed_by: auth_ctx.current_user, current_time: now, source_ip: auth_ctx.source_ip },
        );
        Ok(())
    }

    pub fn change_user_name_direct(&self, id: EntityId, new_name: &str, at: Timestamp, ip: RawIp) -> ForumResult<()> {
        self.with_writer(|collection| Self::mutate_change_user_name(collection, id, new_name.to_string(), at, ip))
    }

    fn mutate_change_user_info(collection: &mut EntityCollection, id: EntityId, new_info: String, at: Timestamp, ip: RawIp) -> ForumResult<()> {
        let user = collection.users.get_mut(&id).ok_or_else(|| ForumError::NotFound(format!("user {id}")))?;
        user.info = (!new_info.is_empty()).then_some(new_info);
        user.header.touch(at, ip, Some(id), "info changed");
        Ok(())
    }

    pub fn change_user_info(&self, auth_ctx: &AuthContext, id: EntityId, new_info: &str) -> ForumResult<()> {
        let now = crate::clock::now();
        let config = self.config.load();
        let mut collection = self.collection.write().expect("collection lock poisoned");
        Store::touch_last_seen(&mut collection, auth_ctx.current_user, now, config.user.last_seen_update_precision);

        let decision = authorize(
            &collection,
            &self.throttler,
            auth_ctx,
            Privilege::EditThreadName,
            PrivilegeScope::ForumWide,
            Some((ActionClass::EditContent, ThrottleRule { max_allowed: 10, period_seconds: 3600 })),
            config.service.disable_throttling,
            now,
        );
        self.check_authorization(auth_ctx, decision)?;
        validate_length("info", new_info, 0, config.user.max_name_length)?;

        Self::mutate_change_user_info(&mut collection, id, new_info.to_string(), now, auth_ctx.source_ip)?;
        drop(collection);

        self.notify(
            &WriteEvent::ChangeUserInfo { id, new_info: new_info.to_string() },
            &ObserverContext { performed_by: auth_ctx.current_user, current_time: now, source_ip: auth_ctx.source_ip },
        );
        Ok(())
    }

    pub fn change_user_info_direct(&self, id: EntityId, new_info: &str, at: Timestamp, ip: RawIp) -> ForumResult<()> {
        self.with_writer(|collection| Self::mutate_change_user_info(collection, id, new_info.to_string(), at, ip))
    }

    fn mutate_delete_user(collection: &mut EntityCollection, id: EntityId) -> ForumResult<()> {
        let user = collection.users.remove(&id).ok_or_else(|| ForumError::NotFound(format!("user {id}")))?;
        collection.user_index.by_name.remove(&user.name);
        collection.user_index.by_auth.remove(&user.auth);
        collection.user_index.by_created.remove(&user.header.created, id);
        collection.user_index.by_last_seen.remove(&user.last_seen, id);
        collection.user_index.by_message_count.remove(&user.message_count, id);
        collection.user_index.by_thread_count.remove(&user.thread_count, id);

        // Cascades: null the weak authorship back-refs rather than deleting
        // the content itself (spec §3 "deleting a user nulls its authorship
        // weak refs").
        for message_id in &user.messages_authored {
            if let Some(message) = collection.messages.get_mut(message_id) {
                message.creator_id = None;
            }
        }
        for comment in collection.comments.values_mut() {
            if comment.creator_id == Some(id) {
                comment.creator_id = None;
            }
        }
        for thread_id in &user.subscribed_threads {
            if let Some(thread) = collection.threads.get_mut(thread_id) {
                thread.subscribed_users.remove(&id);
            }
        }
        for message in collection.messages.values_mut() {
            message.votes.remove(&id);
        }
        Ok(())
    }

    pub fn delete_user(&self, auth_ctx: &AuthContext, id: EntityId) -> ForumResult<()> {
        let now = crate::clock::now();
        let config = self.config.load();
        let mut collection = self.collection.write().expect("collection lock poisoned");
        Store::touch_last_seen(&mut collection, auth_ctx.current_user, now, config.user.last_seen_update_precision);

        let decision = authorize(&collection, &self.throttler, auth_ctx, Privilege::DeleteThread, PrivilegeScope::ForumWide, None, config.service.disable_throttling, now);
        self.check_authorization(auth_ctx, decision)?;

        Self::mutate_delete_user(&mut collection, id)?;
        drop(collection);

        self.notify(&WriteEvent::DeleteUser { id }, &ObserverContext { performed_by: auth_ctx.current_user, current_time: now, source_ip: auth_ctx.source_ip });
        Ok(())
    }

    pub fn delete_user_direct(&self, id: EntityId) -> ForumResult<()> {
        self.with_writer(|collection| Self::mutate_delete_user(collection, id))
    }

    /// Sets `last_seen` directly, bypassing the precision-window check
    /// (spec §4.4 post-processing: "recompute each user's last_seen as the
    /// max timestamp of any event it performed").
    pub fn set_last_seen_direct(&self, id: EntityId, at: Timestamp) {
        self.with_writer(|collection| {
            if let Some(user) = collection.users.get_mut(&id) {
                let old = user.last_seen;
                user.last_seen = user.last_seen.max(at);
                collection.user_index.by_last_seen.reindex(&old, user.last_seen, id);
            }
        });
    }

    pub fn get_user_by_id(&self, id: EntityId) -> Option<User> {
        self.with_reader(|collection| collection.users.get(&id).cloned())
    }

    pub fn get_user_by_name(&self, name: &str) -> Option<User> {
        self.with_reader(|collection| {
            let id = collection.user_index.by_name.get(&name.to_string())?;
            collection.users.get(&id).cloned()
        })
    }

    /// Lists users ordered by `byCreated`, paginated per `ctx` (spec §4.1).
    pub fn list_users_by_created(&self, ctx: &DisplayContext, page_size: usize) -> Vec<User> {
        self.with_reader(|collection| {
            collection
                .user_index
                .by_created
                .page(ctx.sort_order.into(), ctx.page_number, page_size)
                .into_iter()
                .filter_map(|id| collection.users.get(&id).cloned())
                .collect()
        })
    }
}
