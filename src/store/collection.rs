//! The single owning [`EntityCollection`] (spec §4.2, component C4): one
//! `HashMap<EntityId, T>` per entity type plus every secondary index spec
//! §4.1 names. This struct has no interior locking of its own — the
//! surrounding [`crate::store::Store`] guards it with one
//! `RwLock<EntityCollection>`, matching spec §5's "single instance, guarded
//! as above" for both entities and the granted-privilege tables.

use crate::clock::Timestamp;
use crate::entities::*;
use crate::id::EntityId;
use crate::indexing::{HashIndex, OrderedIndex, RankedIndex, UniqueIndex};
use std::collections::HashMap;

#[derive(Default)]
pub struct UserIndexes {
    pub by_name: UniqueIndex<String>,
    pub by_auth: UniqueIndex<String>,
    pub by_created: OrderedIndex<Timestamp>,
    pub by_last_seen: OrderedIndex<Timestamp>,
    pub by_message_count: OrderedIndex<usize>,
    pub by_thread_count: OrderedIndex<usize>,
}

#[derive(Default)]
pub struct ThreadIndexes {
    pub by_name: OrderedIndex<String>,
    pub by_created: OrderedIndex<Timestamp>,
    pub by_last_updated: OrderedIndex<Timestamp>,
    pub by_latest_message_created: OrderedIndex<Timestamp>,
    pub by_message_count: OrderedIndex<usize>,
    pub by_pin_display_order: OrderedIndex<u32>,
    pub by_tag: HashIndex<EntityId>,
}

#[derive(Default)]
pub struct MessageIndexes {
    pub by_created: OrderedIndex<Timestamp>,
    pub rank_by_thread: HashMap<EntityId, RankedIndex<Timestamp>>,
}

#[derive(Default)]
pub struct TagIndexes {
    pub by_name: UniqueIndex<String>,
}

#[derive(Default)]
pub struct CategoryIndexes {
    /// Uniqueness is "among siblings" (spec §3): keyed on `(parent, name)`.
    pub by_parent_and_name: UniqueIndex<(Option<EntityId>, String)>,
    pub roots: Vec<EntityId>,
}

#[derive(Default)]
pub struct CommentIndexes {
    pub by_message: HashIndex<EntityId>,
}

#[derive(Default)]
pub struct PrivilegeTables {
    pub required: HashMap<(PrivilegeScopeKey, Privilege), PrivilegeValue>,
    pub assigned: HashMap<(EntityId, PrivilegeScopeKey, Privilege), AssignedPrivilege>,
}

/// A hashable, owned form of [`PrivilegeScope`] used as a map key (the
/// scope enum already is, but this alias documents intent at call sites).
pub type PrivilegeScopeKey = PrivilegeScope;

#[derive(Default)]
pub struct EntityCollection {
    pub users: HashMap<EntityId, User>,
    pub user_index: UserIndexes,

    pub threads: HashMap<EntityId, DiscussionThread>,
    pub thread_index: ThreadIndexes,

    pub messages: HashMap<EntityId, DiscussionThreadMessage>,
    pub message_index: MessageIndexes,

    pub comments: HashMap<EntityId, MessageComment>,
    pub comment_index: CommentIndexes,

    pub tags: HashMap<EntityId, DiscussionTag>,
    pub tag_index: TagIndexes,

    pub categories: HashMap<EntityId, DiscussionCategory>,
    pub category_index: CategoryIndexes,

    pub privileges: PrivilegeTables,

    /// spec §9 "batch-insert mode": set around the whole importer replay to
    /// defer expensive derived-index maintenance.
    pub batch_mode: bool,
}

impl EntityCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recomputes the derived indexes that batch mode deferred (spec §4.4
    /// step 7, §9 "Post-batch, run a `rebuildDerivedIndexes` pass").
    pub fn rebuild_derived_indexes(&mut self) {
        for thread in self.threads.values_mut() {
            let latest = thread
                .messages
                .iter()
                .filter_map(|id| self.messages.get(id))
                .filter(|m| m.approved)
                .map(|m| m.header.last_updated.as_ref().map(|u| u.at).unwrap_or(m.header.created))
                .max();
            thread.latest_visible_change = latest.unwrap_or(thread.header.created).max(thread.header.created);
        }
        // thread_index.by_latest_message_created needs rebuilding from scratch
        // since batch mode skipped incremental maintenance.
        self.thread_index.by_latest_message_created = OrderedIndex::new();
        for (id, thread) in self.threads.iter() {
            let key = thread
                .messages
                .iter()
                .filter_map(|mid| self.messages.get(mid))
                .map(|m| m.header.created)
                .max()
                .unwrap_or(thread.header.created);
            self.thread_index.by_latest_message_created.insert(key, *id);
        }
    }
}
