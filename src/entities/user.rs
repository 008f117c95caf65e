use super::EntityHeader;
use crate::clock::Timestamp;
use crate::id::EntityId;

/// spec §3 "User". Back-references are plain `Vec<EntityId>` in creation
/// order — weak indexes the cascading-delete code walks, never ownership.
#[derive(Debug, Clone)]
pub struct User {
    pub header: EntityHeader,
    pub name: String,
    pub auth: String,
    pub info: Option<String>,
    pub title: Option<String>,
    pub signature: Option<String>,
    pub logo: Option<Vec<u8>>,
    pub last_seen: Timestamp,

    pub message_count: usize,
    pub thread_count: usize,

    pub messages_authored: Vec<EntityId>,
    pub threads_authored: Vec<EntityId>,
    pub subscribed_threads: Vec<EntityId>,
    pub votes_cast: Vec<EntityId>,
}

impl User {
    pub fn new(header: EntityHeader, name: String, auth: String) -> Self {
        User {
            last_seen: header.created,
            header,
            name,
            auth,
            info: None,
            title: None,
            signature: None,
            logo: None,
            message_count: 0,
            thread_count: 0,
            messages_authored: Vec::new(),
            threads_authored: Vec::new(),
            subscribed_threads: Vec::new(),
            votes_cast: Vec::new(),
        }
    }

    /// spec §3: "an update is only issued when more than
    /// `lastSeenUpdatePrecision` seconds have elapsed since the stored
    /// value." Returns whether the caller should actually bump `last_seen`.
    pub fn should_update_last_seen(&self, at: Timestamp, precision: Timestamp) -> bool {
        at - self.last_seen > precision
    }
}
