//! Discussion category repository (spec §3 "DiscussionCategory", §4.2,
//! §8 "Category forest").

use super::collection::EntityCollection;
use super::validation::validate_length;
use super::{ObserverContext, Store};
use crate::auth::{authorize, AuthContext};
use crate::clock::Timestamp;
use crate::entities::{DiscussionCategory, EntityHeader, Privilege, PrivilegeScope};
use crate::error::{ForumError, ForumResult};
use crate::eventlog::WriteEvent;
use crate::id::{EntityId, RawIp};
use std::collections::HashSet;

impl Store {
    /// Walks `parent` links from `id` looking for `ancestor`, the guard
    /// behind spec §3's "category graph must stay a forest" invariant.
    fn is_ancestor(collection: &EntityCollection, id: EntityId, ancestor: EntityId) -> bool {
        let mut current = Some(id);
        while let Some(c) = current {
            if c == ancestor {
                return true;
            }
            current = collection.categories.get(&c).and_then(|cat| cat.parent);
        }
        false
    }

    fn mutate_add_category(collection: &mut EntityCollection, id: EntityId, name: String, parent: Option<EntityId>, created: Timestamp, ip: RawIp) -> ForumResult<()> {
        let key = (parent, name.clone());
        if collection.category_index.by_parent_and_name.contains(&key) {
            return Err(ForumError::AlreadyExists(format!("category named '{name}' under this parent")));
        }
        if let Some(parent_id) = parent {
            if !collection.categories.contains_key(&parent_id) {
                return Err(ForumError::NotFound(format!("category {parent_id}")));
            }
        }
        let header = EntityHeader::new(id, created, ip);
        let category = DiscussionCategory::new(header, name, parent);
        collection.category_index.by_parent_and_name.insert(key, id);
        match parent {
            Some(parent_id) => collection.categories.get_mut(&parent_id).unwrap().children.push(id),
            None => collection.category_index.roots.push(id),
        }
        collection.categories.insert(id, category);
        Ok(())
    }

    pub fn add_category(&self, auth_ctx: &AuthContext, name: &str, parent: Option<EntityId>) -> ForumResult<EntityId> {
        let now = crate::clock::now();
        let config = self.config.load();
        let id = EntityId::new();

        let mut collection = self.collection.write().expect("collection lock poisoned");
        Store::touch_last_seen(&mut collection, auth_ctx.current_user, now, config.user.last_seen_update_precision);
        let decision = authorize(&collection, &self.throttler, auth_ctx, Privilege::AddNewCategory, PrivilegeScope::ForumWide, None, config.service.disable_throttling, now);
        self.check_authorization(auth_ctx, decision)?;
        validate_length("name", name, config.discussion_category.min_name_length, config.discussion_category.max_name_length)?;

        Self::mutate_add_category(&mut collection, id, name.to_string(), parent, now, auth_ctx.source_ip)?;
        drop(collection);

        self.notify(
            &WriteEvent::AddNewDiscussionCategory { id, name: name.to_string(), parent },
            &ObserverContext { performed_by: auth_ctx.current_user, current_time: now, source_ip: auth_ctx.source_ip },
        );
        Ok(id)
    }

    pub fn add_category_direct(&self, id: EntityId, name: &str, parent: Option<EntityId>, created: Timestamp, ip: RawIp) -> ForumResult<()> {
        self.with_writer(|collection| Self::mutate_add_category(collection, id, name.to_string(), parent, created, ip))
    }

    fn mutate_change_category_name(collection: &mut EntityCollection, id: EntityId, new_name: String, at: Timestamp, ip: RawIp) -> ForumResult<()> {
        let parent = collection.categories.get(&id).ok_or_else(|| ForumError::NotFound(format!("category {id}")))?.parent;
        let new_key = (parent, new_name.clone());
        if collection.category_index.by_parent_and_name.contains(&new_key) {
            return Err(ForumError::AlreadyExists(format!("category named '{new_name}' under this parent")));
        }
        let category = collection.categories.get_mut(&id).unwrap();
        let old_key = (parent, category.name.clone());
        category.name = new_name.clone();
        category.header.touch(at, ip, None, "name changed");
        collection.category_index.by_parent_and_name.reindex(&old_key, new_key, id);
        Ok(())
    }

    pub fn change_category_name(&self, auth_ctx: &AuthContext, id: EntityId, new_name: &str) -> ForumResult<()> {
        let now = crate::clock::now();
        let config = self.config.load();
        let mut collection = self.collection.write().expect("collection lock poisoned");
        Store::touch_last_seen(&mut collection, auth_ctx.current_user, now, config.user.last_seen_update_precision);

        let decision = authorize(&collection, &self.throttler, auth_ctx, Privilege::AddNewCategory, PrivilegeScope::Category(id), None, config.service.disable_throttling, now);
        self.check_authorization(auth_ctx, decision)?;
        validate_length("name", new_name, config.discussion_category.min_name_length, config.discussion_category.max_name_length)?;

        Self::mutate_change_category_name(&mut collection, id, new_name.to_string(), now, auth_ctx.source_ip)?;
        drop(collection);

        self.notify(
            &WriteEvent::ChangeDiscussionCategoryName { id, new_name: new_name.to_string() },
            &ObserverContext { performed_by: auth_ctx.current_user, current_time: now, source_ip: auth_ctx.source_ip },
        );
        Ok(())
    }

    pub fn change_category_name_direct(&self, id: EntityId, new_name: &str, at: Timestamp, ip: RawIp) -> ForumResult<()> {
        self.with_writer(|collection| Self::mutate_change_category_name(collection, id, new_name.to_string(), at, ip))
    }

    fn mutate_change_category_description(collection: &mut EntityCollection, id: EntityId, new_description: String, at: Timestamp, ip: RawIp) -> ForumResult<()> {
        let category = collection.categories.get_mut(&id).ok_or_else(|| ForumError::NotFound(format!("category {id}")))?;
        category.description = (!new_description.is_empty()).then_some(new_description);
        category.header.touch(at, ip, None, "description changed");
        Ok(())
    }

    pub fn change_category_description(&self, auth_ctx: &AuthContext, id: EntityId, new_description: &str) -> ForumResult<()> {
        let now = crate::clock::now();
        let config = self.config.load();
        let mut collection = self.collection.write().expect("collection lock poisoned");
        Store::touch_last_seen(&mut collection, auth_ctx.current_user, now, config.user.last_seen_update_precision);

        let decision = authorize(&collection, &self.throttler, auth_ctx, Privilege::AddNewCategory, PrivilegeScope::Category(id), None, config.service.disable_throttling, now);
        self.check_authorization(auth_ctx, decision)?;

        Self::mutate_change_category_description(&mut collection, id, new_description.to_string(), now, auth_ctx.source_ip)?;
        drop(collection);

        self.notify(
            &WriteEvent::ChangeDiscussionCategoryDescription { id, new_description: new_description.to_string() },
            &ObserverContext { performed_by: auth_ctx.current_user, current_time: now, source_ip: auth_ctx.source_ip },
        );
        Ok(())
    }

    pub fn change_category_description_direct(&self, id: EntityId, new_description: &str, at: Timestamp, ip: RawIp) -> ForumResult<()> {
        self.with_writer(|collection| Self::mutate_change_category_description(collection, id, new_description.to_string(), at, ip))
    }

    fn mutate_delete_category(collection: &mut EntityCollection, id: EntityId) -> ForumResult<()> {
        let category = collection.categories.remove(&id).ok_or_else(|| ForumError::NotFound(format!("category {id}")))?;
        collection.category_index.by_parent_and_name.remove(&(category.parent, category.name.clone()));
        match category.parent {
            Some(parent_id) => {
                if let Some(parent) = collection.categories.get_mut(&parent_id) {
                    parent.children.retain(|c| *c != id);
                }
            }
            None => collection.category_index.roots.retain(|c| *c != id),
        }
        for tag_id in &category.tags {
            if let Some(tag) = collection.tags.get_mut(tag_id) {
                tag.categories.remove(&id);
            }
        }
        // Orphaned children are reparented to this category's own parent,
        // keeping the forest invariant intact (spec §8).
        for child_id in category.children {
            if let Some(child) = collection.categories.get_mut(&child_id) {
                child.parent = category.parent;
            }
            match category.parent {
                Some(parent_id) => {
                    if let Some(parent) = collection.categories.get_mut(&parent_id) {
                        parent.children.push(child_id);
                    }
                }
                None => collection.category_index.roots.push(child_id),
            }
        }
        Ok(())
    }

    pub fn delete_category(&self, auth_ctx: &AuthContext, id: EntityId) -> ForumResult<()> {
        let now = crate::clock::now();
        let config = self.config.load();
        let mut collection = self.collection.write().expect("collection lock poisoned");
        Store::touch_last_seen(&mut collection, auth_ctx.current_user, now, config.user.last_seen_update_precision);

        let decision = authorize(&collection, &self.throttler, auth_ctx, Privilege::DeleteCategory, PrivilegeScope::Category(id), None, config.service.disable_throttling, now);
        self.check_authorization(auth_ctx, decision)?;

        Self::mutate_delete_category(&mut collection, id)?;
        drop(collection);

        self.notify(&WriteEvent::DeleteDiscussionCategory { id }, &ObserverContext { performed_by: auth_ctx.current_user, current_time: now, source_ip: auth_ctx.source_ip });
        Ok(())
    }

    pub fn delete_category_direct(&self, id: EntityId) -> ForumResult<()> {
        self.with_writer(|collection| Self::mutate_delete_category(collection, id))
    }

    fn mutate_change_category_parent(collection: &mut EntityCollection, id: EntityId, new_parent: Option<EntityId>) -> ForumResult<()> {
        if let Some(new_parent_id) = new_parent {
            if new_parent_id == id || Self::is_ancestor(collection, new_parent_id, id) {
                return Err(ForumError::CircularReferenceNotAllowed);
            }
            if !collection.categories.contains_key(&new_parent_id) {
                return Err(ForumError::NotFound(format!("category {new_parent_id}")));
            }
        }
        let category = collection.categories.get(&id).ok_or_else(|| ForumError::NotFound(format!("category {id}")))?;
        let old_parent = category.parent;
        let name = category.name.clone();
        let new_key = (new_parent, name.clone());
        if collection.category_index.by_parent_and_name.contains(&new_key) {
            return Err(ForumError::AlreadyExists(format!("category named '{name}' under the new parent")));
        }

        match old_parent {
            Some(old_parent_id) => {
                if let Some(old) = collection.categories.get_mut(&old_parent_id) {
                    old.children.retain(|c| *c != id);
                }
            }
            None => collection.category_index.roots.retain(|c| *c != id),
        }
        match new_parent {
            Some(new_parent_id) => collection.categories.get_mut(&new_parent_id).unwrap().children.push(id),
            None => collection.category_index.roots.push(id),
        }
        let old_key = (old_parent, name);
        collection.category_index.by_parent_and_name.reindex(&old_key, new_key, id);
        collection.categories.get_mut(&id).unwrap().parent = new_parent;
        Ok(())
    }

    pub fn change_category_parent(&self, auth_ctx: &AuthContext, id: EntityId, new_parent: Option<EntityId>) -> ForumResult<()> {
        let now = crate::clock::now();
        let config = self.config.load();
        let mut collection = self.collection.write().expect("collection lock poisoned");
        Store::touch_last_seen(&mut collection, auth_ctx.current_user, now, config.user.last_seen_update_precision);

        let decision = authorize(&collection, &self.throttler, auth_ctx, Privilege::AddNewCategory, PrivilegeScope::Category(id), None, config.service.disable_throttling, now);
        self.check_authorization(auth_ctx, decision)?;

        Self::mutate_change_category_parent(&mut collection, id, new_parent)?;
        drop(collection);

        self.notify(
            &WriteEvent::ChangeDiscussionCategoryParent { id, new_parent },
            &ObserverContext { performed_by: auth_ctx.current_user, current_time: now, source_ip: auth_ctx.source_ip },
        );
        Ok(())
    }

    pub fn change_category_parent_direct(&self, id: EntityId, new_parent: Option<EntityId>) -> ForumResult<()> {
        self.with_writer(|collection| Self::mutate_change_category_parent(collection, id, new_parent))
    }

    fn mutate_change_category_display_order(collection: &mut EntityCollection, id: EntityId, new_order: i32) -> ForumResult<()> {
        let category = collection.categories.get_mut(&id).ok_or_else(|| ForumError::NotFound(format!("category {id}")))?;
        category.display_order = new_order;
        let parent = category.parent;

        let mut siblings = match parent {
            Some(parent_id) => collection.categories.get(&parent_id).unwrap().children.clone(),
            None => collection.category_index.roots.clone(),
        };
        siblings.sort_by_key(|c| collection.categories.get(c).map(|cat| cat.display_order).unwrap_or(0));
        match parent {
            Some(parent_id) => collection.categories.get_mut(&parent_id).unwrap().children = siblings,
            None => collection.category_index.roots = siblings,
        }
        Ok(())
    }

    pub fn change_category_display_order(&self, auth_ctx: &AuthContext, id: EntityId, new_order: i32) -> ForumResult<()> {
        let now = crate::clock::now();
        let config = self.config.load();
        let mut collection = self.collection.write().expect("collection lock poisoned");
        Store::touch_last_seen(&mut collection, auth_ctx.current_user, now, config.user.last_seen_update_precision);

        let decision = authorize(&collection, &self.throttler, auth_ctx, Privilege::AddNewCategory, PrivilegeScope::Category(id), None, config.service.disable_throttling, now);
        self.check_authorization(auth_ctx, decision)?;

        Self::mutate_change_category_display_order(&mut collection, id, new_order)?;
        drop(collection);

        self.notify(
            &WriteEvent::ChangeDiscussionCategoryDisplayOrder { id, new_order },
            &ObserverContext { performed_by: auth_ctx.current_user, current_time: now, source_ip: auth_ctx.source_ip },
        );
        Ok(())
    }

    pub fn change_category_display_order_direct(&self, id: EntityId, new_order: i32) -> ForumResult<()> {
        self.with_writer(|collection| Self::mutate_change_category_display_order(collection, id, new_order))
    }

    pub fn get_category_by_id(&self, id: EntityId) -> Option<DiscussionCategory> {
        self.with_reader(|collection| collection.categories.get(&id).cloned())
    }

    pub fn list_root_categories(&self) -> Vec<DiscussionCategory> {
        self.with_reader(|collection| collection.category_index.roots.iter().filter_map(|id| collection.categories.get(id).cloned()).collect())
    }

    /// Derived counters aggregated transitively over a category and its
    /// descendants (spec §3 "derived counters (threadCount, messageCount)
    /// aggregated transitively over descendants", §8 "category.messageCount
    /// == sum over descendants of thread.messageCount"). Computed on read,
    /// the same way `thread.message_count()` is derived from `thread.messages`
    /// rather than tracked as an incrementally-updated field, so the result
    /// can never drift from the threads/tags it is aggregated over.
    pub fn category_counters(&self, id: EntityId) -> (usize, usize) {
        self.with_reader(|collection| Self::compute_category_counters(collection, id))
    }

    fn compute_category_counters(collection: &EntityCollection, id: EntityId) -> (usize, usize) {
        let mut pending = vec![id];
        let mut threads = HashSet::new();
        while let Some(category_id) = pending.pop() {
            if let Some(category) = collection.categories.get(&category_id) {
                for tag_id in &category.tags {
                    if let Some(tag) = collection.tags.get(tag_id) {
                        threads.extend(tag.threads.iter().copied());
                    }
                }
                pending.extend(category.children.iter().copied());
            }
        }
        let message_count = threads.iter().filter_map(|t| collection.threads.get(t)).map(|t| t.message_count()).sum();
        (threads.len(), message_count)
    }
}
