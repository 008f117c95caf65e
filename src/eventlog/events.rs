//! Event type catalogue and payload (en/de)coding (spec §6.1).
//!
//! A blob is `(eventType: u16, eventVersion: u16, contextVersion: u16,
//! context, payload)`. [`WriteEvent`] is the in-memory shape the store
//! hands to observers; [`WriteEvent::encode`]/[`decode_record`] are its
//! wire form.

use super::codec::{DecodeError, Reader, Writer};
use crate::clock::Timestamp;
use crate::entities::{Privilege, PrivilegeScope, PrivilegeValue};
use crate::id::{EntityId, RawIp};

pub const CONTEXT_VERSION_1: u16 = 1;

#[derive(Debug, Clone, Copy)]
pub struct EventContext {
    pub timestamp: Timestamp,
    pub acting_user: EntityId,
    pub acting_ip: RawIp,
}

impl EventContext {
    fn encode(&self, w: &mut Writer) {
        w.i64(self.timestamp).id(self.acting_user).ip(self.acting_ip);
    }

    fn decode(r: &mut Reader) -> Result<Self, DecodeError> {
        Ok(EventContext {
            timestamp: r.i64()?,
            acting_user: r.id()?,
            acting_ip: r.ip()?,
        })
    }
}

macro_rules! event_types {
    ($($code:literal => $name:ident),* $(,)?) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum EventType { $($name),* }

        impl EventType {
            pub fn code(self) -> u16 {
                match self { $(EventType::$name => $code),* }
            }
            pub fn from_code(code: u16) -> Option<EventType> {
                match code { $($code => Some(EventType::$name),)* _ => None }
            }
        }
    };
}

event_types! {
    0 => AddNewUser,
    1 => ChangeUserName,
    2 => ChangeUserInfo,
    3 => DeleteUser,
    10 => AddNewDiscussionThread,
    11 => ChangeDiscussionThreadName,
    12 => DeleteDiscussionThread,
    13 => PinDiscussionThread,
    14 => SubscribeToThread,
    15 => UnsubscribeFromThread,
    16 => MergeDiscussionThreads,
    17 => IncrementDiscussionThreadNumberOfVisits,
    20 => AddNewDiscussionThreadMessage,
    21 => ChangeDiscussionThreadMessageContent,
    22 => DeleteDiscussionThreadMessage,
    23 => MoveDiscussionThreadMessage,
    24 => UpVoteMessage,
    25 => DownVoteMessage,
    26 => ResetVoteMessage,
    27 => AddComment,
    28 => SolveComment,
    30 => AddNewDiscussionTag,
    31 => ChangeDiscussionTagName,
    32 => DeleteDiscussionTag,
    33 => AddTagToThread,
    34 => RemoveTagFromThread,
    35 => MergeDiscussionTags,
    36 => AddTagToCategory,
    37 => RemoveTagFromCategory,
    40 => AddNewDiscussionCategory,
    41 => ChangeDiscussionCategoryName,
    42 => DeleteDiscussionCategory,
    43 => ChangeDiscussionCategoryParent,
    44 => ChangeDiscussionCategoryDisplayOrder,
    45 => ChangeDiscussionCategoryDescription,
    50 => ChangeRequiredPrivilege,
    51 => ChangeAssignedPrivilege,
}

/// A privilege scope in its wire form: a type tag plus an optional id.
fn encode_scope(w: &mut Writer, scope: PrivilegeScope) {
    match scope {
        PrivilegeScope::Message(id) => w.u8(0).id(id),
        PrivilegeScope::Thread(id) => w.u8(1).id(id),
        PrivilegeScope::Tag(id) => w.u8(2).id(id),
        PrivilegeScope::Category(id) => w.u8(3).id(id),
        PrivilegeScope::ForumWide => w.u8(4).id(EntityId::from_raw(0)),
    };
}

fn decode_scope(r: &mut Reader) -> Result<PrivilegeScope, DecodeError> {
    let tag = r.u8()?;
    let id = r.id()?;
    Ok(match tag {
        0 => PrivilegeScope::Message(id),
        1 => PrivilegeScope::Thread(id),
        2 => PrivilegeScope::Tag(id),
        3 => PrivilegeScope::Category(id),
        4 => PrivilegeScope::ForumWide,
        _ => return Err(DecodeError("unknown privilege scope tag")),
    })
}

#[derive(Debug, Clone)]
pub enum MessageContentWire {
    Inline(Vec<u8>),
    Mapped { offset: u64, length: u32 },
}

#[derive(Debug, Clone)]
pub enum WriteEvent {
    AddNewUser { id: EntityId, name: String, auth: String },
    ChangeUserName { id: EntityId, new_name: String },
    ChangeUserInfo { id: EntityId, new_info: String },
    DeleteUser { id: EntityId },

    AddNewDiscussionThread { id: EntityId, name: String },
    ChangeDiscussionThreadName { id: EntityId, new_name: String },
    DeleteDiscussionThread { id: EntityId },
    PinDiscussionThread { id: EntityId, display_order: u32 },
    SubscribeToThread { user: EntityId, thread: EntityId },
    UnsubscribeFromThread { user: EntityId, thread: EntityId },
    MergeDiscussionThreads { source: EntityId, destination: EntityId },
    IncrementDiscussionThreadNumberOfVisits { thread: EntityId, count: u32 },

    AddNewDiscussionThreadMessage { id: EntityId, thread: EntityId, content: MessageContentWire, version: u16 },
    ChangeDiscussionThreadMessageContent { id: EntityId, new_content: String, reason: String },
    DeleteDiscussionThreadMessage { id: EntityId },
    MoveDiscussionThreadMessage { id: EntityId, destination_thread: EntityId },
    UpVoteMessage { message: EntityId, user: EntityId },
    DownVoteMessage { message: EntityId, user: EntityId },
    ResetVoteMessage { message: EntityId, user: EntityId },
    AddComment { id: EntityId, message: EntityId, content: String },
    SolveComment { id: EntityId },

    AddNewDiscussionTag { id: EntityId, name: String },
    ChangeDiscussionTagName { id: EntityId, new_name: String },
    DeleteDiscussionTag { id: EntityId },
    AddTagToThread { tag: EntityId, thread: EntityId },
    RemoveTagFromThread { tag: EntityId, thread: EntityId },
    MergeDiscussionTags { source: EntityId, destination: EntityId },
    AddTagToCategory { tag: EntityId, category: EntityId },
    RemoveTagFromCategory { tag: EntityId, category: EntityId },

    AddNewDiscussionCategory { id: EntityId, name: String, parent: Option<EntityId> },
    ChangeDiscussionCategoryName { id: EntityId, new_name: String },
    DeleteDiscussionCategory { id: EntityId },
    ChangeDiscussionCategoryParent { id: EntityId, new_parent: Option<EntityId> },
    ChangeDiscussionCategoryDisplayOrder { id: EntityId, new_order: i32 },
    ChangeDiscussionCategoryDescription { id: EntityId, new_description: String },

    ChangeRequiredPrivilege { scope: PrivilegeScope, privilege: Privilege, value: PrivilegeValue },
    ChangeAssignedPrivilege { user: EntityId, scope: PrivilegeScope, privilege: Privilege, value: PrivilegeValue, duration: i64 },
}

impl WriteEvent {
    pub fn event_type(&self) -> EventType {
        match self {
            WriteEvent::AddNewUser { .. } => EventType::AddNewUser,
            WriteEvent::ChangeUserName { .. } => EventType::ChangeUserName,
            WriteEvent::ChangeUserInfo { .. } => EventType::ChangeUserInfo,
            WriteEvent::DeleteUser { .. } => EventType::DeleteUser,
            WriteEvent::AddNewDiscussionThread { .. } => EventType::AddNewDiscussionThread,
            WriteEvent::ChangeDiscussionThreadName { .. } => EventType::ChangeDiscussionThreadName,
            WriteEvent::DeleteDiscussionThread { .. } => EventType::DeleteDiscussionThread,
            WriteEvent::PinDiscussionThread { .. } => EventType::PinDiscussionThread,
            WriteEvent::SubscribeToThread { .. } => EventType::SubscribeToThread,
            WriteEvent::UnsubscribeFromThread { .. } => EventType::UnsubscribeFromThread,
            WriteEvent::MergeDiscussionThreads { .. } => EventType::MergeDiscussionThreads,
            WriteEvent::IncrementDiscussionThreadNumberOfVisits { .. } => EventType::IncrementDiscussionThreadNumberOfVisits,
            WriteEvent::AddNewDiscussionThreadMessage { .. } => EventType::AddNewDiscussionThreadMessage,
            WriteEvent::ChangeDiscussionThreadMessageContent { .. } => EventType::ChangeDiscussionThreadMessageContent,
            WriteEvent::DeleteDiscussionThreadMessage { .. } => EventType::DeleteDiscussionThreadMessage,
            WriteEvent::MoveDiscussionThreadMessage { .. } => EventType::MoveDiscussionThreadMessage,
            WriteEvent::UpVoteMessage { .. } => EventType::UpVoteMessage,
            WriteEvent::DownVoteMessage { .. } => EventType::DownVoteMessage,
            WriteEvent::ResetVoteMessage { .. } => EventType::ResetVoteMessage,
            WriteEvent::AddComment { .. } => EventType::AddComment,
            WriteEvent::SolveComment { .. } => EventType::SolveComment,
            WriteEvent::AddNewDiscussionTag { .. } => EventType::AddNewDiscussionTag,
            WriteEvent::ChangeDiscussionTagName { .. } => EventType::ChangeDiscussionTagName,
            WriteEvent::DeleteDiscussionTag { .. } => EventType::DeleteDiscussionTag,
            WriteEvent::AddTagToThread { .. } => EventType::AddTagToThread,
            WriteEvent::RemoveTagFromThread { .. } => EventType::RemoveTagFromThread,
            WriteEvent::MergeDiscussionTags { .. } => EventType::MergeDiscussionTags,
            WriteEvent::AddTagToCategory { .. } => EventType::AddTagToCategory,
            WriteEvent::RemoveTagFromCategory { .. } => EventType::RemoveTagFromCategory,
            WriteEvent::AddNewDiscussionCategory { .. } => EventType::AddNewDiscussionCategory,
            WriteEvent::ChangeDiscussionCategoryName { .. } => EventType::ChangeDiscussionCategoryName,
            WriteEvent::DeleteDiscussionCategory { .. } => EventType::DeleteDiscussionCategory,
            WriteEvent::ChangeDiscussionCategoryParent { .. } => EventType::ChangeDiscussionCategoryParent,
            WriteEvent::ChangeDiscussionCategoryDisplayOrder { .. } => EventType::ChangeDiscussionCategoryDisplayOrder,
            WriteEvent::ChangeDiscussionCategoryDescription { .. } => EventType::ChangeDiscussionCategoryDescription,
            WriteEvent::ChangeRequiredPrivilege { .. } => EventType::ChangeRequiredPrivilege,
            WriteEvent::ChangeAssignedPrivilege { .. } => EventType::ChangeAssignedPrivilege,
        }
    }

    /// Event versions are monotone; only message-add has more than one
    /// (spec §6.1 "Two variants of ADD_NEW_DISCUSSION_THREAD_MESSAGE").
    pub fn event_version(&self) -> u16 {
        match self {
            WriteEvent::AddNewDiscussionThreadMessage { version, .. } => *version,
            _ => 1,
        }
    }

    pub fn encode(&self, context: EventContext) -> Vec<u8> {
        let mut w = Writer::new();
        w.u16(self.event_type().code());
        w.u16(self.event_version());
        w.u16(CONTEXT_VERSION_1);
        context.encode(&mut w);
        self.encode_payload(&mut w);
        w.buf
    }

    fn encode_payload(&self, w: &mut Writer) {
        match self {
            WriteEvent::AddNewUser { id, name, auth } => {
                w.id(*id).string(name).string(auth);
            }
            WriteEvent::ChangeUserName { id, new_name } => {
                w.id(*id).string(new_name);
            }
            WriteEvent::ChangeUserInfo { id, new_info } => {
                w.id(*id).string(new_info);
            }
            WriteEvent::DeleteUser { id } => {
                w.id(*id);
            }
            WriteEvent::AddNewDiscussionThread { id, name } => {
                w.id(*id).string(name);
            }
            WriteEvent::ChangeDiscussionThreadName { id, new_name } => {
                w.id(*id).string(new_name);
            }
            WriteEvent::DeleteDiscussionThread { id } => {
                w.id(*id);
            }
            WriteEvent::PinDiscussionThread { id, display_order } => {
                w.id(*id).u32(*display_order);
            }
            WriteEvent::SubscribeToThread { user, thread } => {
                w.id(*user).id(*thread);
            }
            WriteEvent::UnsubscribeFromThread { user, thread } => {
                w.id(*user).id(*thread);
            }
            WriteEvent::MergeDiscussionThreads { source, destination } => {
                w.id(*source).id(*destination);
            }
            WriteEvent::IncrementDiscussionThreadNumberOfVisits { thread, count } => {
                w.id(*thread).u32(*count);
            }
            WriteEvent::AddNewDiscussionThreadMessage { id, thread, content, .. } => {
                w.id(*id).id(*thread);
                match content {
                    MessageContentWire::Inline(bytes) => {
                        w.bytes(bytes);
                    }
                    MessageContentWire::Mapped { offset, length } => {
                        w.u32(*length).u64(*offset);
                    }
                }
            }
            WriteEvent::ChangeDiscussionThreadMessageContent { id, new_content, reason } => {
                w.id(*id).string(new_content).string(reason);
            }
            WriteEvent::DeleteDiscussionThreadMessage { id } => {
                w.id(*id);
            }
            WriteEvent::MoveDiscussionThreadMessage { id, destination_thread } => {
                w.id(*id).id(*destination_thread);
            }
            WriteEvent::UpVoteMessage { message, user } | WriteEvent::DownVoteMessage { message, user } | WriteEvent::ResetVoteMessage { message, user } => {
                w.id(*message).id(*user);
            }
            WriteEvent::AddComment { id, message, content } => {
                w.id(*id).id(*message).string(content);
            }
            WriteEvent::SolveComment { id } => {
                w.id(*id);
            }
            WriteEvent::AddNewDiscussionTag { id, name } => {
                w.id(*id).string(name);
            }
            WriteEvent::ChangeDiscussionTagName { id, new_name } => {
                w.id(*id).string(new_name);
            }
            WriteEvent::DeleteDiscussionTag { id } => {
                w.id(*id);
            }
            WriteEvent::AddTagToThread { tag, thread } | WriteEvent::RemoveTagFromThread { tag, thread } => {
                w.id(*tag).id(*thread);
            }
            WriteEvent::MergeDiscussionTags { source, destination } => {
                w.id(*source).id(*destination);
            }
            WriteEvent::AddTagToCategory { tag, category } | WriteEvent::RemoveTagFromCategory { tag, category } => {
                w.id(*tag).id(*category);
            }
            WriteEvent::AddNewDiscussionCategory { id, name, parent } => {
                w.id(*id).string(name).id(parent.unwrap_or(EntityId::from_raw(0))).u8(parent.is_some() as u8);
            }
            WriteEvent::ChangeDiscussionCategoryName { id, new_name } => {
                w.id(*id).string(new_name);
            }
            WriteEvent::DeleteDiscussionCategory { id } => {
                w.id(*id);
            }
            WriteEvent::ChangeDiscussionCategoryParent { id, new_parent } => {
                w.id(*id).id(new_parent.unwrap_or(EntityId::from_raw(0))).u8(new_parent.is_some() as u8);
            }
            WriteEvent::ChangeDiscussionCategoryDisplayOrder { id, new_order } => {
                w.id(*id).i32(*new_order);
            }
            WriteEvent::ChangeDiscussionCategoryDescription { id, new_description } => {
                w.id(*id).string(new_description);
            }
            WriteEvent::ChangeRequiredPrivilege { scope, privilege, value } => {
                encode_scope(w, *scope);
                w.u16(privilege.code()).i32(*value);
            }
            WriteEvent::ChangeAssignedPrivilege { user, scope, privilege, value, duration } => {
                w.id(*user);
                encode_scope(w, *scope);
                w.u16(privilege.code()).i32(*value).i64(*duration);
            }
        }
    }

    /// Decodes a payload given its `(event_type, event_version)` header,
    /// already stripped of the magic/framing and context prefix.
    pub fn decode_payload(event_type: EventType, event_version: u16, r: &mut Reader) -> Result<WriteEvent, DecodeError> {
        Ok(match event_type {
            EventType::AddNewUser => WriteEvent::AddNewUser { id: r.id()?, name: r.string()?, auth: r.string()? },
            EventType::ChangeUserName => WriteEvent::ChangeUserName { id: r.id()?, new_name: r.string()? },
            EventType::ChangeUserInfo => WriteEvent::ChangeUserInfo { id: r.id()?, new_info: r.string()? },
            EventType::DeleteUser => WriteEvent::DeleteUser { id: r.id()? },
            EventType::AddNewDiscussionThread => WriteEvent::AddNewDiscussionThread { id: r.id()?, name: r.string()? },
            EventType::ChangeDiscussionThreadName => WriteEvent::ChangeDiscussionThreadName { id: r.id()?, new_name: r.string()? },
            EventType::DeleteDiscussionThread => WriteEvent::DeleteDiscussionThread { id: r.id()? },
            EventType::PinDiscussionThread => WriteEvent::PinDiscussionThread { id: r.id()?, display_order: r.u32()? },
            EventType::SubscribeToThread => WriteEvent::SubscribeToThread { user: r.id()?, thread: r.id()? },
            EventType::UnsubscribeFromThread => WriteEvent::UnsubscribeFromThread { user: r.id()?, thread: r.id()? },
            EventType::MergeDiscussionThreads => WriteEvent::MergeDiscussionThreads { source: r.id()?, destination: r.id()? },
            EventType::IncrementDiscussionThreadNumberOfVisits => WriteEvent::IncrementDiscussionThreadNumberOfVisits { thread: r.id()?, count: r.u32()? },
            EventType::AddNewDiscussionThreadMessage => {
                let id = r.id()?;
                let thread = r.id()?;
                let content = match event_version {
                    1 => MessageContentWire::Inline(r.bytes()?),
                    2 => {
                        let length = r.u32()?;
                        let offset = r.u64()?;
                        MessageContentWire::Mapped { offset, length }
                    }
                    _ => return Err(DecodeError("unknown AddNewDiscussionThreadMessage version")),
                };
                WriteEvent::AddNewDiscussionThreadMessage { id, thread, content, version: event_version }
            }
            EventType::ChangeDiscussionThreadMessageContent => WriteEvent::ChangeDiscussionThreadMessageContent { id: r.id()?, new_content: r.string()?, reason: r.string()? },
            EventType::DeleteDiscussionThreadMessage => WriteEvent::DeleteDiscussionThreadMessage { id: r.id()? },
            EventType::MoveDiscussionThreadMessage => WriteEvent::MoveDiscussionThreadMessage { id: r.id()?, destination_thread: r.id()? },
            EventType::UpVoteMessage => WriteEvent::UpVoteMessage { message: r.id()?, user: r.id()? },
            EventType::DownVoteMessage => WriteEvent::DownVoteMessage { message: r.id()?, user: r.id()? },
            EventType::ResetVoteMessage => WriteEvent::ResetVoteMessage { message: r.id()?, user: r.id()? },
            EventType::AddComment => WriteEvent::AddComment { id: r.id()?, message: r.id()?, content: r.string()? },
            EventType::SolveComment => WriteEvent::SolveComment { id: r.id()? },
            EventType::AddNewDiscussionTag => WriteEvent::AddNewDiscussionTag { id: r.id()?, name: r.string()? },
            EventType::ChangeDiscussionTagName => WriteEvent::ChangeDiscussionTagName { id: r.id()?, new_name: r.string()? },
            EventType::DeleteDiscussionTag => WriteEvent::DeleteDiscussionTag { id: r.id()? },
            EventType::AddTagToThread => WriteEvent::AddTagToThread { tag: r.id()?, thread: r.id()? },
            EventType::RemoveTagFromThread => WriteEvent::RemoveTagFromThread { tag: r.id()?, thread: r.id()? },
            EventType::MergeDiscussionTags => WriteEvent::MergeDiscussionTags { source: r.id()?, destination: r.id()? },
            EventType::AddTagToCategory => WriteEvent::AddTagToCategory { tag: r.id()?, category: r.id()? },
            EventType::RemoveTagFromCategory => WriteEvent::RemoveTagFromCategory { tag: r.id()?, category: r.id()? },
            EventType::AddNewDiscussionCategory => {
                let id = r.id()?;
                let name = r.string()?;
                let parent_id = r.id()?;
                let has_parent = r.u8()? != 0;
                WriteEvent::AddNewDiscussionCategory { id, name, parent: has_parent.then_some(parent_id) }
            }
            EventType::ChangeDiscussionCategoryName => WriteEvent::ChangeDiscussionCategoryName { id: r.id()?, new_name: r.string()? },
            EventType::DeleteDiscussionCategory => WriteEvent::DeleteDiscussionCategory { id: r.id()? },
            EventType::ChangeDiscussionCategoryParent => {
                let id = r.id()?;
                let parent_id = r.id()?;
                let has_parent = r.u8()? != 0;
                WriteEvent::ChangeDiscussionCategoryParent { id, new_parent: has_parent.then_some(parent_id) }
            }
            EventType::ChangeDiscussionCategoryDisplayOrder => WriteEvent::ChangeDiscussionCategoryDisplayOrder { id: r.id()?, new_order: r.i32()? },
            EventType::ChangeDiscussionCategoryDescription => WriteEvent::ChangeDiscussionCategoryDescription { id: r.id()?, new_description: r.string()? },
            EventType::ChangeRequiredPrivilege => {
                let scope = decode_scope(r)?;
                let privilege = Privilege::from_code(r.u16()?).ok_or(DecodeError("unknown privilege code"))?;
                WriteEvent::ChangeRequiredPrivilege { scope, privilege, value: r.i32()? }
            }
            EventType::ChangeAssignedPrivilege => {
                let user = r.id()?;
                let scope = decode_scope(r)?;
                let privilege = Privilege::from_code(r.u16()?).ok_or(DecodeError("unknown privilege code"))?;
                let value = r.i32()?;
                let duration = r.i64()?;
                WriteEvent::ChangeAssignedPrivilege { user, scope, privilege, value, duration }
            }
        })
    }
}

/// Decodes a whole blob (header + context + payload), as read back from
/// the framed record (spec §4.4 steps 5-6).
pub fn decode_blob(blob: &[u8]) -> Result<(EventContext, WriteEvent), DecodeError> {
    let mut r = Reader::new(blob);
    let type_code = r.u16()?;
    let version = r.u16()?;
    let context_version = r.u16()?;
    if context_version != CONTEXT_VERSION_1 {
        return Err(DecodeError("unsupported context version"));
    }
    let context = EventContext::decode(&mut r)?;
    let event_type = EventType::from_code(type_code).ok_or(DecodeError("unknown event type"))?;
    let event = WriteEvent::decode_payload(event_type, version, &mut r)?;
    Ok((context, event))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_new_user_round_trips() {
        let event = WriteEvent::AddNewUser { id: EntityId::new(), name: "alice".to_string(), auth: "alice-auth".to_string() };
        let context = EventContext { timestamp: 1000, acting_user: EntityId::new(), acting_ip: "10.0.0.1".parse().unwrap() };
        let blob = event.encode(context);
        let (decoded_context, decoded_event) = decode_blob(&blob).unwrap();
        assert_eq!(decoded_context.timestamp, 1000);
        match decoded_event {
            WriteEvent::AddNewUser { name, auth, .. } => {
                assert_eq!(name, "alice");
                assert_eq!(auth, "alice-auth");
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn message_v2_carries_offset_and_length() {
        let event = WriteEvent::AddNewDiscussionThreadMessage {
            id: EntityId::new(),
            thread: EntityId::new(),
            content: MessageContentWire::Mapped { offset: 128, length: 64 },
            version: 2,
        };
        let context = EventContext { timestamp: 1, acting_user: EntityId::new(), acting_ip: RawIp::UNKNOWN };
        let blob = event.encode(context);
        let (_, decoded) = decode_blob(&blob).unwrap();
        match decoded {
            WriteEvent::AddNewDiscussionThreadMessage { content: MessageContentWire::Mapped { offset, length }, .. } => {
                assert_eq!(offset, 128);
                assert_eq!(length, 64);
            }
            _ => panic!("wrong variant"),
        }
    }
}
