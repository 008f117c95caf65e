//! Wire-facing DTOs (spec §1 "the exact JSON shape of responses" is left
//! to the caller; these are this caller's choice). Domain entities in
//! [`crate::entities`] don't derive `Serialize` on purpose — they carry
//! weak back-reference lists and internal bookkeeping that has no business
//! leaking onto the wire, so each view type here picks out only what a
//! client needs and maps `EntityId`s to their display string form.

use crate::entities::{DiscussionCategory, DiscussionTag, DiscussionThread, DiscussionThreadMessage, MessageComment, User};
use crate::id::EntityId;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct UserView {
    pub id: String,
    pub name: String,
    pub info: Option<String>,
    pub title: Option<String>,
    pub signature: Option<String>,
    pub created: i64,
    pub last_seen: i64,
    pub message_count: usize,
    pub thread_count: usize,
}

impl From<&User> for UserView {
    fn from(u: &User) -> Self {
        UserView {
            id: u.header.id.to_string(),
            name: u.name.clone(),
            info: u.info.clone(),
            title: u.title.clone(),
            signature: u.signature.clone(),
            created: u.header.created,
            last_seen: u.last_seen,
            message_count: u.message_count,
            thread_count: u.thread_count,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ThreadView {
    pub id: String,
    pub name: String,
    pub created: i64,
    pub latest_visible_change: i64,
    pub message_count: usize,
    pub pinned: bool,
    pub visited: u64,
    pub tags: Vec<String>,
}

impl From<&DiscussionThread> for ThreadView {
    fn from(t: &DiscussionThread) -> Self {
        ThreadView {
            id: t.header.id.to_string(),
            name: t.name.clone(),
            created: t.header.created,
            latest_visible_change: t.latest_visible_change,
            message_count: t.message_count(),
            pinned: t.is_pinned(),
            visited: t.visited,
            tags: t.tags.iter().map(EntityId::to_string).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageView {
    pub id: String,
    pub thread_id: String,
    pub creator_id: Option<String>,
    pub created: i64,
    pub content: String,
    pub up_votes: usize,
    pub down_votes: usize,
    pub comment_count: usize,
}

impl From<&DiscussionThreadMessage> for MessageView {
    fn from(m: &DiscussionThreadMessage) -> Self {
        use crate::entities::{MessageContent, VoteValue};
        let content = match &m.content {
            MessageContent::Inline(bytes) => String::from_utf8_lossy(bytes).into_owned(),
            MessageContent::Mapped { .. } => String::new(),
        };
        MessageView {
            id: m.header.id.to_string(),
            thread_id: m.thread_id.to_string(),
            creator_id: m.creator_id.map(|id| id.to_string()),
            created: m.header.created,
            content,
            up_votes: m.votes.values().filter(|v| v.value == VoteValue::Up).count(),
            down_votes: m.votes.values().filter(|v| v.value == VoteValue::Down).count(),
            comment_count: m.comments.len(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CommentView {
    pub id: String,
    pub message_id: String,
    pub creator_id: Option<String>,
    pub content: String,
    pub solved: bool,
    pub created: i64,
}

impl From<&MessageComment> for CommentView {
    fn from(c: &MessageComment) -> Self {
        CommentView {
            id: c.header.id.to_string(),
            message_id: c.message_id.to_string(),
            creator_id: c.creator_id.map(|id| id.to_string()),
            content: c.content.clone(),
            solved: c.solved,
            created: c.header.created,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TagView {
    pub id: String,
    pub name: String,
    pub created: i64,
    pub thread_count: usize,
}

impl From<&DiscussionTag> for TagView {
    fn from(t: &DiscussionTag) -> Self {
        TagView { id: t.header.id.to_string(), name: t.name.clone(), created: t.header.created, thread_count: t.threads.len() }
    }
}

#[derive(Debug, Serialize)]
pub struct CategoryView {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<String>,
    pub display_order: i32,
    pub children: Vec<String>,
    /// Aggregated transitively over this category and its descendants'
    /// tagged threads (spec §3, §8) — populated by the caller via
    /// `Store::category_counters`, since `DiscussionCategory` alone can't
    /// see the tags/threads it's aggregated over.
    pub thread_count: usize,
    pub message_count: usize,
}

impl From<&DiscussionCategory> for CategoryView {
    fn from(c: &DiscussionCategory) -> Self {
        CategoryView {
            id: c.header.id.to_string(),
            name: c.name.clone(),
            description: c.description.clone(),
            parent_id: c.parent.map(|id| id.to_string()),
            display_order: c.display_order,
            children: c.children.iter().map(EntityId::to_string).collect(),
            thread_count: 0,
            message_count: 0,
        }
    }
}

impl CategoryView {
    pub fn with_counters(c: &DiscussionCategory, thread_count: usize, message_count: usize) -> Self {
        CategoryView { thread_count, message_count, ..CategoryView::from(c) }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorView {
    pub code: &'static str,
    pub message: String,
}
