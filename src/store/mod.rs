//! Entity store & repositories (spec §4.2, component C4).
//!
//! [`Store`] owns one [`collection::EntityCollection`] behind a
//! multi-reader/single-writer lock (spec §5). Every public operation
//! follows one of the two templates spec §4.2 describes:
//!
//! - **command**: acquire writer → resolve current user, bump `last_seen`
//!   → authorize → validate → mutate → notify observers → return.
//! - **query**: acquire reader → resolve current user (deferring the
//!   `last_seen` bump) → authorize → render results.
//!
//! The repository methods live in sibling modules grouped by entity
//! (`users`, `threads`, `messages`, `tags`, `categories`, `comments`,
//! `privileges`), each an `impl Store { ... }` block, following spec §4.2
//! "repository methods... under the writer lock in one visible step."

pub mod categories;
pub mod collection;
pub mod comments;
pub mod messages;
pub mod privileges;
pub mod tags;
pub mod threads;
pub mod users;
pub mod validation;

use crate::auth::{throttle::Throttler, AuthContext, AuthDecision};
use crate::clock::Timestamp;
use crate::config::Config;
use crate::error::{ForumError, ForumResult};
use crate::eventlog::{MessagesFileAppender, WriteEvent};
use crate::id::{EntityId, RawIp};
use arc_swap::ArcSwap;
use collection::EntityCollection;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Per-request sort order for list queries (spec §4.1 `DisplayContext`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl From<SortOrder> for crate::indexing::SortDirection {
    fn from(value: SortOrder) -> Self {
        match value {
            SortOrder::Ascending => crate::indexing::SortDirection::Ascending,
            SortOrder::Descending => crate::indexing::SortDirection::Descending,
        }
    }
}

/// spec §4.1 `DisplayContext { sortOrder, pageNumber, checkNotChangedSince }`.
#[derive(Debug, Clone, Copy)]
pub struct DisplayContext {
    pub sort_order: SortOrder,
    pub page_number: usize,
    pub check_not_changed_since: Option<Timestamp>,
}

impl Default for DisplayContext {
    fn default() -> Self {
        DisplayContext {
            sort_order: SortOrder::Ascending,
            page_number: 0,
            check_not_changed_since: None,
        }
    }
}

/// spec §4.2 "observer context": `{ performedBy, currentTime,
/// displayContext, sourceIp }`, passed to observers by value.
#[derive(Debug, Clone, Copy)]
pub struct ObserverContext {
    pub performed_by: EntityId,
    pub current_time: Timestamp,
    pub source_ip: RawIp,
}

/// Sink for durable write events (spec §4.2, §9 "observer signals"). The
/// event log writer is the only production implementation; tests may
/// install a recording stub.
pub trait EventObserver: Send + Sync {
    fn on_event(&self, event: &WriteEvent, ctx: &ObserverContext);
}

pub struct Store {
    pub(crate) collection: RwLock<EntityCollection>,
    pub config: Arc<ArcSwap<Config>>,
    pub(crate) observers: RwLock<Vec<Arc<dyn EventObserver>>>,
    pub(crate) throttler: Throttler,
    /// Side file large message content is appended to (spec §6.3). `None`
    /// in tests that never exercise the mapped-content path.
    pub(crate) messages_file: Option<Arc<MessagesFileAppender>>,
    /// Recently-seen anonymous visitors, keyed by source IP (recovered
    /// feature, `VisitorCollection.h`; see SPEC_FULL.md §B.1).
    visitors: RwLock<HashMap<RawIp, Timestamp>>,
}

/// A point-in-time count summary (recovered feature, `MemoryRepositoryStatistics`;
/// see SPEC_FULL.md §B.4).
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct Statistics {
    pub user_count: usize,
    pub thread_count: usize,
    pub message_count: usize,
    pub tag_count: usize,
    pub category_count: usize,
    pub comment_count: usize,
}

impl Store {
    pub fn new(config: Config) -> Self {
        Store {
            collection: RwLock::new(EntityCollection::new()),
            config: Arc::new(ArcSwap::from_pointee(config)),
            observers: RwLock::new(Vec::new()),
            throttler: Throttler::new(),
            messages_file: None,
            visitors: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_messages_file(mut self, appender: Arc<MessagesFileAppender>) -> Self {
        self.messages_file = Some(appender);
        self
    }

    /// Records an anonymous visit for the online-users count, pruning
    /// entries older than `visitor_online_for_seconds` in the same pass
    /// (recovered feature, `VisitorCollection.h`; SPEC_FULL.md §B.1).
    pub fn record_visit(&self, ip: RawIp, at: Timestamp) {
        let window = self.config.load().user.visitor_online_for_seconds;
        let mut visitors = self.visitors.write().expect("visitors lock poisoned");
        visitors.retain(|_, seen| at - *seen < window);
        visitors.insert(ip, at);
    }

    /// The current count of distinct IPs seen within the online window
    /// (spec §6.4 `onlineUsersIntervalSeconds`).
    pub fn online_visitor_count(&self, at: Timestamp) -> usize {
        let window = self.config.load().user.visitor_online_for_seconds;
        let visitors = self.visitors.read().expect("visitors lock poisoned");
        visitors.values().filter(|seen| at - **seen < window).count()
    }

    /// A point-in-time count summary across every entity kind (recovered
    /// feature, `MemoryRepositoryStatistics`; SPEC_FULL.md §B.4).
    pub fn statistics(&self) -> Statistics {
        self.with_reader(|collection| Statistics {
            user_count: collection.users.len(),
            thread_count: collection.threads.len(),
            message_count: collection.messages.len(),
            tag_count: collection.tags.len(),
            category_count: collection.categories.len(),
            comment_count: collection.comments.len(),
        })
    }

    pub fn add_observer(&self, observer: Arc<dyn EventObserver>) {
        self.observers.write().expect("observers lock poisoned").push(observer);
    }

    pub(crate) fn notify(&self, event: &WriteEvent, ctx: &ObserverContext) {
        for observer in self.observers.read().expect("observers lock poisoned").iter() {
            observer.on_event(event, ctx);
        }
    }

    /// Bumps `user.last_seen` if spec §3's precision window has elapsed.
    /// Called at the start of every command, before authorization, with the
    /// bump itself folded into the same writer-lock hold (spec §4.2).
    pub(crate) fn touch_last_seen(collection: &mut EntityCollection, user_id: EntityId, at: Timestamp, precision: Timestamp) {
        if user_id.is_anonymous() {
            return;
        }
        if let Some(user) = collection.users.get_mut(&user_id) {
            if user.should_update_last_seen(at, precision) {
                let old_key = user.last_seen;
                user.last_seen = at;
                collection.user_index.by_last_seen.reindex(&old_key, at, user_id);
            }
        }
    }

    /// Applies a throttle + authorization check, mapping the result to
    /// [`ForumError`] (spec §4.5 "Repositories map these to status codes").
    pub(crate) fn check_authorization(&self, auth: &AuthContext, decision: AuthDecision) -> ForumResult<()> {
        let _ = auth;
        match decision {
            AuthDecision::Ok => Ok(()),
            AuthDecision::NotAllowed => Err(ForumError::NotAllowed),
            AuthDecision::Throttled { retry_after_secs } => Err(ForumError::Throttled { retry_after_secs }),
            AuthDecision::Unauthorized => Err(ForumError::Unauthorized),
        }
    }

    /// Direct-write entry for the event log importer (spec §9 "direct-write
    /// entry"): same mutation + indexing code as a command, but bypasses
    /// authorization and throttling, and runs with the record's own
    /// time/user/IP context already installed by the caller.
    pub fn with_writer<R>(&self, f: impl FnOnce(&mut EntityCollection) -> R) -> R {
        let mut collection = self.collection.write().expect("collection lock poisoned");
        f(&mut collection)
    }

    pub fn with_reader<R>(&self, f: impl FnOnce(&EntityCollection) -> R) -> R {
        let collection = self.collection.read().expect("collection lock poisoned");
        f(&collection)
    }

    pub fn set_batch_mode(&self, enabled: bool) {
        let mut collection = self.collection.write().expect("collection lock poisoned");
        collection.batch_mode = enabled;
        if !enabled {
            collection.rebuild_derived_indexes();
        }
    }
}

/// Short-circuits a list query per spec §4.1 `checkNotChangedSince`: if the
/// parent hasn't changed since the given timestamp, the caller should
/// return `NOT_UPDATED_SINCE_LAST_CHECK` without touching the indexes.
pub(crate) fn check_not_changed_since(parent_last_updated: Option<Timestamp>, parent_created: Timestamp, ctx: &DisplayContext) -> ForumResult<()> {
    if let Some(since) = ctx.check_not_changed_since {
        let last_change = parent_last_updated.unwrap_or(parent_created);
        if last_change <= since {
            return Err(ForumError::NotUpdatedSinceLastCheck);
        }
    }
    Ok(())
}
