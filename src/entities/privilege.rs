use crate::clock::Timestamp;
use crate::id::EntityId;

pub type PrivilegeValue = i32;

/// The scope a privilege is required or granted at (spec §4.5, GLOSSARY
/// "Scope"). Ordered outward for the resolution walk in
/// [`crate::auth::resolve_assigned_privilege`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrivilegeScope {
    Message(EntityId),
    Thread(EntityId),
    Tag(EntityId),
    Category(EntityId),
    ForumWide,
}

/// Every privilege the core recognizes. Discriminants are stable and used
/// verbatim in the event log (spec §6.1 "privilege values use fixed
/// widths").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Privilege {
    ViewThreads = 0,
    ViewThreadMessages = 1,
    AddNewThread = 2,
    AddNewThreadMessage = 3,
    EditThreadName = 4,
    EditMessageContent = 5,
    DeleteThread = 6,
    DeleteMessage = 7,
    UpVote = 8,
    DownVote = 9,
    ResetVote = 10,
    SubscribeToThread = 11,
    AddComment = 12,
    SolveComment = 13,
    AttachTagToThread = 14,
    AddNewTag = 15,
    DeleteTag = 16,
    AddNewCategory = 17,
    DeleteCategory = 18,
    AdjustPrivilege = 19,
    NoThrottling = 20,
}

impl Privilege {
    pub const ALL: [Privilege; 21] = [
        Privilege::ViewThreads,
        Privilege::ViewThreadMessages,
        Privilege::AddNewThread,
        Privilege::AddNewThreadMessage,
        Privilege::EditThreadName,
        Privilege::EditMessageContent,
        Privilege::DeleteThread,
        Privilege::DeleteMessage,
        Privilege::UpVote,
        Privilege::DownVote,
        Privilege::ResetVote,
        Privilege::SubscribeToThread,
        Privilege::AddComment,
        Privilege::SolveComment,
        Privilege::AttachTagToThread,
        Privilege::AddNewTag,
        Privilege::DeleteTag,
        Privilege::AddNewCategory,
        Privilege::DeleteCategory,
        Privilege::AdjustPrivilege,
        Privilege::NoThrottling,
    ];

    pub fn code(self) -> u16 {
        self as u16
    }

    pub fn from_code(code: u16) -> Option<Privilege> {
        Self::ALL.into_iter().find(|p| p.code() == code)
    }

    /// lowerCamelCase name matching the config keys under `defaultPrivileges`
    /// (spec §6.4; collapsed from the original's per-scope-kind privilege
    /// names, see SPEC_FULL.md "Open Questions").
    pub fn name(self) -> &'static str {
        match self {
            Privilege::ViewThreads => "viewThreads",
            Privilege::ViewThreadMessages => "viewThreadMessages",
            Privilege::AddNewThread => "addNewThread",
            Privilege::AddNewThreadMessage => "addNewThreadMessage",
            Privilege::EditThreadName => "editThreadName",
            Privilege::EditMessageContent => "editMessageContent",
            Privilege::DeleteThread => "deleteThread",
            Privilege::DeleteMessage => "deleteMessage",
            Privilege::UpVote => "upVote",
            Privilege::DownVote => "downVote",
            Privilege::ResetVote => "resetVote",
            Privilege::SubscribeToThread => "subscribeToThread",
            Privilege::AddComment => "addComment",
            Privilege::SolveComment => "solveComment",
            Privilege::AttachTagToThread => "attachTagToThread",
            Privilege::AddNewTag => "addNewTag",
            Privilege::DeleteTag => "deleteTag",
            Privilege::AddNewCategory => "addNewCategory",
            Privilege::DeleteCategory => "deleteCategory",
            Privilege::AdjustPrivilege => "adjustPrivilege",
            Privilege::NoThrottling => "noThrottling",
        }
    }

    pub fn from_name(name: &str) -> Option<Privilege> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }
}

/// One assigned grant: spec §3 "PrivilegeGrants", §4.5 resolution.
/// `duration == 0` means indefinite.
#[derive(Debug, Clone, Copy)]
pub struct AssignedPrivilege {
    pub value: PrivilegeValue,
    pub from: Timestamp,
    pub duration: i64,
}

impl AssignedPrivilege {
    pub fn is_active_at(&self, at: Timestamp) -> bool {
        self.duration == 0 || at < self.from + self.duration
    }
}
