use super::EntityHeader;
use crate::id::EntityId;
use std::collections::HashSet;

/// spec §3 "DiscussionCategory". `children` and `display_order` together
/// keep the category graph a forest (spec §3 invariants, §8 "Category
/// forest"): `display_order` orders this category among its own siblings,
/// `children` is this category's child list, already sorted that way.
#[derive(Debug, Clone)]
pub struct DiscussionCategory {
    pub header: EntityHeader,
    pub name: String,
    pub description: Option<String>,
    pub parent: Option<EntityId>,
    pub children: Vec<EntityId>,
    pub display_order: i32,
    pub tags: HashSet<EntityId>,
}

impl DiscussionCategory {
    pub fn new(header: EntityHeader, name: String, parent: Option<EntityId>) -> Self {
        DiscussionCategory {
            header,
            name,
            description: None,
            parent,
            children: Vec::new(),
            display_order: 0,
            tags: HashSet::new(),
        }
    }
}
