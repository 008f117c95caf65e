use super::EntityHeader;
use crate::clock::Timestamp;
use crate::id::EntityId;
use std::collections::HashSet;

/// spec §3 "DiscussionThread".
#[derive(Debug, Clone)]
pub struct DiscussionThread {
    pub header: EntityHeader,
    pub name: String,
    /// 0 = unpinned.
    pub pin_display_order: u32,
    pub latest_visible_change: Timestamp,
    /// Ordered by `created`; a message exists only while its thread does.
    pub messages: Vec<EntityId>,
    pub subscribed_users: HashSet<EntityId>,
    pub tags: HashSet<EntityId>,
    pub approved: bool,

    /// Flushed-to-date visit count; see `pending_visits`.
    pub visited: u64,
    /// Visits recorded since the last flush, batched per spec §4.4
    /// post-processing and per §9 batch-insert mode.
    pub pending_visits: u64,
}

impl DiscussionThread {
    pub fn new(header: EntityHeader, name: String) -> Self {
        DiscussionThread {
            latest_visible_change: header.created,
            header,
            name,
            pin_display_order: 0,
            messages: Vec::new(),
            subscribed_users: HashSet::new(),
            tags: HashSet::new(),
            approved: true,
            visited: 0,
            pending_visits: 0,
        }
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    pub fn is_pinned(&self) -> bool {
        self.pin_display_order != 0
    }
}
