use super::EntityHeader;
use crate::clock::Timestamp;
use crate::id::EntityId;
use std::collections::HashMap;

/// spec §6.3 and §9 "Message content storage": content is either small and
/// inline, or large and mapped from the external messages file as
/// `(offset, length)`.
#[derive(Debug, Clone)]
pub enum MessageContent {
    Inline(Vec<u8>),
    Mapped { offset: u64, length: u32 },
}

impl MessageContent {
    pub fn len(&self) -> usize {
        match self {
            MessageContent::Inline(bytes) => bytes.len(),
            MessageContent::Mapped { length, .. } => *length as usize,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteValue {
    Up,
    Down,
}

#[derive(Debug, Clone, Copy)]
pub struct Vote {
    pub value: VoteValue,
    pub at: Timestamp,
}

/// A superseded content snapshot, pushed onto the message's edit history
/// head on every content edit (spec §3 "edit history head"; recovered
/// feature, see SPEC_FULL.md §B.5).
#[derive(Debug, Clone)]
pub struct EditHistoryEntry {
    pub previous_content: MessageContent,
    pub at: Timestamp,
    pub reason: Option<String>,
}

/// spec §3 "DiscussionThreadMessage".
#[derive(Debug, Clone)]
pub struct DiscussionThreadMessage {
    pub header: EntityHeader,
    pub content: MessageContent,
    pub thread_id: EntityId,
    /// Weak back-ref, nulled by the user-delete cascade.
    pub creator_id: Option<EntityId>,
    pub approved: bool,
    pub votes: HashMap<EntityId, Vote>,
    pub comments: Vec<EntityId>,
    pub edit_history: Vec<EditHistoryEntry>,
}

const MAX_EDIT_HISTORY: usize = 32;

impl DiscussionThreadMessage {
    pub fn new(header: EntityHeader, thread_id: EntityId, creator_id: Option<EntityId>, content: MessageContent) -> Self {
        DiscussionThreadMessage {
            header,
            content,
            thread_id,
            creator_id,
            approved: true,
            votes: HashMap::new(),
            comments: Vec::new(),
            edit_history: Vec::new(),
        }
    }

    pub fn push_edit_history(&mut self, previous: MessageContent, at: Timestamp, reason: Option<String>) {
        self.edit_history.push(EditHistoryEntry {
            previous_content: previous,
            at,
            reason,
        });
        if self.edit_history.len() > MAX_EDIT_HISTORY {
            self.edit_history.remove(0);
        }
    }
}
