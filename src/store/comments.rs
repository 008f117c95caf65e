//! Message comment repository (spec §3 "MessageComment", §4.2).

use super::collection::EntityCollection;
use super::validation::validate_length;
use super::{ObserverContext, Store};
use crate::auth::throttle::{ActionClass, ThrottleRule};
use crate::auth::{authorize, AuthContext};
use crate::clock::Timestamp;
use crate::entities::{EntityHeader, MessageComment, Privilege, PrivilegeScope};
use crate::error::{ForumError, ForumResult};
use crate::eventlog::WriteEvent;
use crate::id::{EntityId, RawIp};

impl Store {
    fn mutate_add_comment(collection: &mut EntityCollection, id: EntityId, message_id: EntityId, creator_id: Option<EntityId>, content: String, created: Timestamp, ip: RawIp) -> ForumResult<()> {
        let message = collection.messages.get_mut(&message_id).ok_or_else(|| ForumError::NotFound(format!("message {message_id}")))?;
        let header = EntityHeader::new(id, created, ip);
        let comment = MessageComment::new(header, content, creator_id, message_id);
        message.comments.push(id);
        collection.comment_index.by_message.insert(message_id, id);
        collection.comments.insert(id, comment);
        Ok(())
    }

    pub fn add_comment(&self, auth_ctx: &AuthContext, message_id: EntityId, content: &str) -> ForumResult<EntityId> {
        let now = crate::clock::now();
        let config = self.config.load();
        let id = EntityId::new();

        let mut collection = self.collection.write().expect("collection lock poisoned");
        Store::touch_last_seen(&mut collection, auth_ctx.current_user, now, config.user.last_seen_update_precision);
        let decision = authorize(
            &collection,
            &self.throttler,
            auth_ctx,
            Privilege::AddComment,
            PrivilegeScope::Message(message_id),
            Some((ActionClass::NewContent, ThrottleRule { max_allowed: 30, period_seconds: 3600 })),
            config.service.disable_throttling,
            now,
        );
        self.check_authorization(auth_ctx, decision)?;
        validate_length("content", content, 1, config.discussion_thread_message.max_content_length)?;

        let creator_id = (!auth_ctx.current_user.is_anonymous()).then_some(auth_ctx.current_user);
        Self::mutate_add_comment(&mut collection, id, message_id, creator_id, content.to_string(), now, auth_ctx.source_ip)?;
        drop(collection);

        self.notify(
            &WriteEvent::AddComment { id, message: message_id, content: content.to_string() },
            &ObserverContext { performed_by: auth_ctx.current_user, current_time: now, source_ip: auth_ctx.source_ip },
        );
        Ok(id)
    }

    pub fn add_comment_direct(&self, id: EntityId, message_id: EntityId, creator_id: Option<EntityId>, content: &str, created: Timestamp, ip: RawIp) -> ForumResult<()> {
        self.with_writer(|collection| Self::mutate_add_comment(collection, id, message_id, creator_id, content.to_string(), created, ip))
    }

    fn mutate_solve_comment(collection: &mut EntityCollection, id: EntityId, at: Timestamp, ip: RawIp) -> ForumResult<()> {
        let comment = collection.comments.get_mut(&id).ok_or_else(|| ForumError::NotFound(format!("comment {id}")))?;
        if comment.solved {
            return Err(ForumError::NoEffect);
        }
        comment.solved = true;
        comment.header.touch(at, ip, None, "marked solved");
        Ok(())
    }

    pub fn solve_comment(&self, auth_ctx: &AuthContext, id: EntityId) -> ForumResult<()> {
        let now = crate::clock::now();
        let config = self.config.load();
        let mut collection = self.collection.write().expect("collection lock poisoned");
        Store::touch_last_seen(&mut collection, auth_ctx.current_user, now, config.user.last_seen_update_precision);

        let decision = authorize(&collection, &self.throttler, auth_ctx, Privilege::SolveComment, PrivilegeScope::ForumWide, None, config.service.disable_throttling, now);
        self.check_authorization(auth_ctx, decision)?;

        Self::mutate_solve_comment(&mut collection, id, now, auth_ctx.source_ip)?;
        drop(collection);

        self.notify(&WriteEvent::SolveComment { id }, &ObserverContext { performed_by: auth_ctx.current_user, current_time: now, source_ip: auth_ctx.source_ip });
        Ok(())
    }

    pub fn solve_comment_direct(&self, id: EntityId, at: Timestamp, ip: RawIp) -> ForumResult<()> {
        self.with_writer(|collection| Self::mutate_solve_comment(collection, id, at, ip))
    }

    pub fn list_comments_for_message(&self, message_id: EntityId) -> Vec<MessageComment> {
        self.with_reader(|collection| collection.comment_index.by_message.get(&message_id).iter().filter_map(|id| collection.comments.get(id).cloned()).collect())
    }
}
