//! Discussion tag repository (spec §3 "DiscussionTag", §4.2).

use super::collection::EntityCollection;
use super::validation::validate_length;
use super::{ObserverContext, Store};
use crate::auth::throttle::{ActionClass, ThrottleRule};
use crate::auth::{authorize, AuthContext};
use crate::clock::Timestamp;
use crate::entities::{DiscussionTag, EntityHeader, Privilege, PrivilegeScope};
use crate::error::{ForumError, ForumResult};
use crate::eventlog::WriteEvent;
use crate::id::{EntityId, RawIp};

impl Store {
    fn mutate_add_tag(collection: &mut EntityCollection, id: EntityId, name: String, created: Timestamp, ip: RawIp) -> ForumResult<()> {
        if collection.tag_index.by_name.contains(&name) {
            return Err(ForumError::AlreadyExists(format!("tag named '{name}'")));
        }
        let header = EntityHeader::new(id, created, ip);
        let tag = DiscussionTag::new(header, name.clone());
        collection.tag_index.by_name.insert(name, id);
        collection.tags.insert(id, tag);
        Ok(())
    }

    pub fn add_tag(&self, auth_ctx: &AuthContext, name: &str) -> ForumResult<EntityId> {
        let now = crate::clock::now();
        let config = self.config.load();
        let id = EntityId::new();

        let mut collection = self.collection.write().expect("collection lock poisoned");
        Store::touch_last_seen(&mut collection, auth_ctx.current_user, now, config.user.last_seen_update_precision);
        let decision = authorize(
            &collection,
            &self.throttler,
            auth_ctx,
            Privilege::AddNewTag,
            PrivilegeScope::ForumWide,
            Some((ActionClass::NewContent, ThrottleRule { max_allowed: 5, period_seconds: 3600 })),
            config.service.disable_throttling,
            now,
        );
        self.check_authorization(auth_ctx, decision)?;
        validate_length("name", name, config.discussion_tag.min_name_length, config.discussion_tag.max_name_length)?;

        Self::mutate_add_tag(&mut collection, id, name.to_string(), now, auth_ctx.source_ip)?;
        drop(collection);

        self.notify(
            &WriteEvent::AddNewDiscussionTag { id, name: name.to_string() },
            &ObserverContext { performed_by: auth_ctx.current_user, current_time: now, source_ip: auth_ctx.source_ip },
        );
        Ok(id)
    }

    pub fn add_tag_direct(&self, id: EntityId, name: &str, created: Timestamp, ip: RawIp) -> ForumResult<()> {
        self.with_writer(|collection| Self::mutate_add_tag(collection, id, name.to_string(), created, ip))
    }

    fn mutate_change_tag_name(collection: &mut EntityCollection, id: EntityId, new_name: String, at: Timestamp, ip: RawIp) -> ForumResult<()> {
        if collection.tag_index.by_name.contains(&new_name) {
            return Err(ForumError::AlreadyExists(format!("tag named '{new_name}'")));
        }
        let tag = collection.tags.get_mut(&id).ok_or_else(|| ForumError::NotFound(format!("tag {id}")))?;
        let old_name = tag.name.clone();
        tag.name = new_name.clone();
        tag.header.touch(at, ip, None, "name changed");
        collection.tag_index.by_name.reindex(&old_name, new_name, id);
        Ok(())
    }

    pub fn change_tag_name(&self, auth_ctx: &AuthContext, id: EntityId, new_name: &str) -> ForumResult<()> {
        let now = crate::clock::now();
        let config = self.config.load();
        let mut collection = self.collection.write().expect("collection lock poisoned");
        Store::touch_last_seen(&mut collection, auth_ctx.current_user, now, config.user.last_seen_update_precision);

        let decision = authorize(&collection, &self.throttler, auth_ctx, Privilege::AddNewTag, PrivilegeScope::ForumWide, None, config.service.disable_throttling, now);
        self.check_authorization(auth_ctx, decision)?;
        validate_length("name", new_name, config.discussion_tag.min_name_length, config.discussion_tag.max_name_length)?;

        Self::mutate_change_tag_name(&mut collection, id, new_name.to_string(), now, auth_ctx.source_ip)?;
        drop(collection);

        self.notify(
            &WriteEvent::ChangeDiscussionTagName { id, new_name: new_name.to_string() },
            &ObserverContext { performed_by: auth_ctx.current_user, current_time: now, source_ip: auth_ctx.source_ip },
        );
        Ok(())
    }

    pub fn change_tag_name_direct(&self, id: EntityId, new_name: &str, at: Timestamp, ip: RawIp) -> ForumResult<()> {
        self.with_writer(|collection| Self::mutate_change_tag_name(collection, id, new_name.to_string(), at, ip))
    }

    fn mutate_delete_tag(collection: &mut EntityCollection, id: EntityId) -> ForumResult<()> {
        let tag = collection.tags.remove(&id).ok_or_else(|| ForumError::NotFound(format!("tag {id}")))?;
        collection.tag_index.by_name.remove(&tag.name);
        for thread_id in &tag.threads {
            collection.thread_index.by_tag.remove(&id, *thread_id);
            if let Some(thread) = collection.threads.get_mut(thread_id) {
                thread.tags.remove(&id);
            }
        }
        for category_id in &tag.categories {
            if let Some(category) = collection.categories.get_mut(category_id) {
                category.tags.remove(&id);
            }
        }
        Ok(())
    }

    pub fn delete_tag(&self, auth_ctx: &AuthContext, id: EntityId) -> ForumResult<()> {
        let now = crate::clock::now();
        let config = self.config.load();
        let mut collection = self.collection.write().expect("collection lock poisoned");
        Store::touch_last_seen(&mut collection, auth_ctx.current_user, now, config.user.last_seen_update_precision);

        let decision = authorize(&collection, &self.throttler, auth_ctx, Privilege::DeleteTag, PrivilegeScope::ForumWide, None, config.service.disable_throttling, now);
        self.check_authorization(auth_ctx, decision)?;

        Self::mutate_delete_tag(&mut collection, id)?;
        drop(collection);

        self.notify(&WriteEvent::DeleteDiscussionTag { id }, &ObserverContext { performed_by: auth_ctx.current_user, current_time: now, source_ip: auth_ctx.source_ip });
        Ok(())
    }

    pub fn delete_tag_direct(&self, id: EntityId) -> ForumResult<()> {
        self.with_writer(|collection| Self::mutate_delete_tag(collection, id))
    }

    fn mutate_tag_to_thread(collection: &mut EntityCollection, tag: EntityId, thread: EntityId, attach: bool) -> ForumResult<()> {
        if !collection.tags.contains_key(&tag) {
            return Err(ForumError::NotFound(format!("tag {tag}")));
        }
        let t = collection.threads.get_mut(&thread).ok_or_else(|| ForumError::NotFound(format!("thread {thread}")))?;
        if attach {
            t.tags.insert(tag);
            collection.thread_index.by_tag.insert(tag, thread);
            collection.tags.get_mut(&tag).unwrap().threads.insert(thread);
        } else {
            t.tags.remove(&tag);
            collection.thread_index.by_tag.remove(&tag, thread);
            collection.tags.get_mut(&tag).unwrap().threads.remove(&thread);
        }
        Ok(())
    }

    pub fn attach_tag_to_thread(&self, auth_ctx: &AuthContext, tag: EntityId, thread: EntityId) -> ForumResult<()> {
        let now = crate::clock::now();
        let config = self.config.load();
        let mut collection = self.collection.write().expect("collection lock poisoned");
        Store::touch_last_seen(&mut collection, auth_ctx.current_user, now, config.user.last_seen_update_precision);

        let decision = authorize(&collection, &self.throttler, auth_ctx, Privilege::AttachTagToThread, PrivilegeScope::Thread(thread), None, config.service.disable_throttling, now);
        self.check_authorization(auth_ctx, decision)?;

        Self::mutate_tag_to_thread(&mut collection, tag, thread, true)?;
        drop(collection);

        self.notify(&WriteEvent::AddTagToThread { tag, thread }, &ObserverContext { performed_by: auth_ctx.current_user, current_time: now, source_ip: auth_ctx.source_ip });
        Ok(())
    }

    pub fn detach_tag_from_thread(&self, auth_ctx: &AuthContext, tag: EntityId, thread: EntityId) -> ForumResult<()> {
        let now = crate::clock::now();
        let config = self.config.load();
        let mut collection = self.collection.write().expect("collection lock poisoned");
        Store::touch_last_seen(&mut collection, auth_ctx.current_user, now, config.user.last_seen_update_precision);

        let decision = authorize(&collection, &self.throttler, auth_ctx, Privilege::AttachTagToThread, PrivilegeScope::Thread(thread), None, config.service.disable_throttling, now);
        self.check_authorization(auth_ctx, decision)?;

        Self::mutate_tag_to_thread(&mut collection, tag, thread, false)?;
        drop(collection);

        self.notify(&WriteEvent::RemoveTagFromThread { tag, thread }, &ObserverContext { performed_by: auth_ctx.current_user, current_time: now, source_ip: auth_ctx.source_ip });
        Ok(())
    }

    pub fn attach_tag_to_thread_direct(&self, tag: EntityId, thread: EntityId) -> ForumResult<()> {
        self.with_writer(|collection| Self::mutate_tag_to_thread(collection, tag, thread, true))
    }

    pub fn detach_tag_from_thread_direct(&self, tag: EntityId, thread: EntityId) -> ForumResult<()> {
        self.with_writer(|collection| Self::mutate_tag_to_thread(collection, tag, thread, false))
    }

    fn mutate_tag_to_category(collection: &mut EntityCollection, tag: EntityId, category: EntityId, attach: bool) -> ForumResult<()> {
        if !collection.tags.contains_key(&tag) {
            return Err(ForumError::NotFound(format!("tag {tag}")));
        }
        let c = collection.categories.get_mut(&category).ok_or_else(|| ForumError::NotFound(format!("category {category}")))?;
        if attach {
            c.tags.insert(tag);
            collection.tags.get_mut(&tag).unwrap().categories.insert(category);
        } else {
            c.tags.remove(&tag);
            collection.tags.get_mut(&tag).unwrap().categories.remove(&category);
        }
        Ok(())
    }

    pub fn attach_tag_to_category(&self, auth_ctx: &AuthContext, tag: EntityId, category: EntityId) -> ForumResult<()> {
        let now = crate::clock::now();
        let config = self.config.load();
        let mut collection = self.collection.write().expect("collection lock poisoned");
        Store::touch_last_seen(&mut collection, auth_ctx.current_user, now, config.user.last_seen_update_precision);

        let decision = authorize(&collection, &self.throttler, auth_ctx, Privilege::AttachTagToThread, PrivilegeScope::Category(category), None, config.service.disable_throttling, now);
        self.check_authorization(auth_ctx, decision)?;

        Self::mutate_tag_to_category(&mut collection, tag, category, true)?;
        drop(collection);

        self.notify(&WriteEvent::AddTagToCategory { tag, category }, &ObserverContext { performed_by: auth_ctx.current_user, current_time: now, source_ip: auth_ctx.source_ip });
        Ok(())
    }

    pub fn detach_tag_from_category(&self, auth_ctx: &AuthContext, tag: EntityId, category: EntityId) -> ForumResult<()> {
        let now = crate::clock::now();
        let config = self.config.load();
        let mut collection = self.collection.write().expect("collection lock poisoned");
        Store::touch_last_seen(&mut collection, auth_ctx.current_user, now, config.user.last_seen_update_precision);

        let decision = authorize(&collection, &self.throttler, auth_ctx, Privilege::AttachTagToThread, PrivilegeScope::Category(category), None, config.service.disable_throttling, now);
        self.check_authorization(auth_ctx, decision)?;

        Self::mutate_tag_to_category(&mut collection, tag, category, false)?;
        drop(collection);

        self.notify(&WriteEvent::RemoveTagFromCategory { tag, category }, &ObserverContext { performed_by: auth_ctx.current_user, current_time: now, source_ip: auth_ctx.source_ip });
        Ok(())
    }

    pub fn attach_tag_to_category_direct(&self, tag: EntityId, category: EntityId) -> ForumResult<()> {
        self.with_writer(|collection| Self::mutate_tag_to_category(collection, tag, category, true))
    }

    pub fn detach_tag_from_category_direct(&self, tag: EntityId, category: EntityId) -> ForumResult<()> {
        self.with_writer(|collection| Self::mutate_tag_to_category(collection, tag, category, false))
    }

    fn mutate_merge_tags(collection: &mut EntityCollection, source: EntityId, destination: EntityId) -> ForumResult<()> {
        if source == destination {
            return Err(ForumError::CircularReferenceNotAllowed);
        }
        let source_tag = collection.tags.remove(&source).ok_or_else(|| ForumError::NotFound(format!("tag {source}")))?;
        collection.tag_index.by_name.remove(&source_tag.name);
        if !collection.tags.contains_key(&destination) {
            return Err(ForumError::NotFound(format!("tag {destination}")));
        }
        for thread_id in &source_tag.threads {
            collection.thread_index.by_tag.remove(&source, *thread_id);
            collection.thread_index.by_tag.insert(destination, *thread_id);
            if let Some(thread) = collection.threads.get_mut(thread_id) {
                thread.tags.remove(&source);
                thread.tags.insert(destination);
            }
        }
        for category_id in &source_tag.categories {
            if let Some(category) = collection.categories.get_mut(category_id) {
                category.tags.remove(&source);
                category.tags.insert(destination);
            }
        }
        let dest = collection.tags.get_mut(&destination).unwrap();
        dest.threads.extend(source_tag.threads);
        dest.categories.extend(source_tag.categories);
        Ok(())
    }

    pub fn merge_tags(&self, auth_ctx: &AuthContext, source: EntityId, destination: EntityId) -> ForumResult<()> {
        let now = crate::clock::now();
        let config = self.config.load();
        let mut collection = self.collection.write().expect("collection lock poisoned");
        Store::touch_last_seen(&mut collection, auth_ctx.current_user, now, config.user.last_seen_update_precision);

        let decision = authorize(&collection, &self.throttler, auth_ctx, Privilege::DeleteTag, PrivilegeScope::ForumWide, None, config.service.disable_throttling, now);
        self.check_authorization(auth_ctx, decision)?;

        Self::mutate_merge_tags(&mut collection, source, destination)?;
        drop(collection);

        self.notify(&WriteEvent::MergeDiscussionTags { source, destination }, &ObserverContext { performed_by: auth_ctx.current_user, current_time: now, source_ip: auth_ctx.source_ip });
        Ok(())
    }

    pub fn merge_tags_direct(&self, source: EntityId, destination: EntityId) -> ForumResult<()> {
        self.with_writer(|collection| Self::mutate_merge_tags(collection, source, destination))
    }

    pub fn get_tag_by_id(&self, id: EntityId) -> Option<DiscussionTag> {
        self.with_reader(|collection| collection.tags.get(&id).cloned())
    }

    pub fn list_all_tags(&self) -> Vec<DiscussionTag> {
        self.with_reader(|collection| collection.tags.values().cloned().collect())
    }
}
