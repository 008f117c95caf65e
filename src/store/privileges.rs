//! Privilege administration repository (spec §3 "PrivilegeGrants", §4.5
//! "Adjusting privileges is itself privileged").

use super::collection::EntityCollection;
use super::{ObserverContext, Store};
use crate::auth::{authorize, can_grant_privilege, can_set_required_privilege, required_privilege, resolve_assigned_privilege, AuthContext};
use crate::clock::Timestamp;
use crate::entities::{AssignedPrivilege, Privilege, PrivilegeScope, PrivilegeValue};
use crate::error::{ForumError, ForumResult};
use crate::eventlog::WriteEvent;
use crate::id::EntityId;

impl Store {
    fn mutate_change_required_privilege(collection: &mut EntityCollection, scope: PrivilegeScope, privilege: Privilege, value: PrivilegeValue) {
        collection.privileges.required.insert((scope, privilege), value);
    }

    pub fn change_required_privilege(&self, auth_ctx: &AuthContext, scope: PrivilegeScope, privilege: Privilege, new_value: PrivilegeValue) -> ForumResult<()> {
        let now = crate::clock::now();
        let config = self.config.load();
        let mut collection = self.collection.write().expect("collection lock poisoned");
        Store::touch_last_seen(&mut collection, auth_ctx.current_user, now, config.user.last_seen_update_precision);

        let decision = authorize(&collection, &self.throttler, auth_ctx, Privilege::AdjustPrivilege, scope, None, config.service.disable_throttling, now);
        self.check_authorization(auth_ctx, decision)?;

        let current = required_privilege(&collection, privilege, scope);
        if !can_set_required_privilege(current, new_value) {
            return Err(ForumError::NotAllowed);
        }

        Self::mutate_change_required_privilege(&mut collection, scope, privilege, new_value);
        drop(collection);

        self.notify(
            &WriteEvent::ChangeRequiredPrivilege { scope, privilege, value: new_value },
            &ObserverContext { performed_by: auth_ctx.current_user, current_time: now, source_ip: auth_ctx.source_ip },
        );
        Ok(())
    }

    pub fn change_required_privilege_direct(&self, scope: PrivilegeScope, privilege: Privilege, value: PrivilegeValue) {
        self.with_writer(|collection| Self::mutate_change_required_privilege(collection, scope, privilege, value))
    }

    fn mutate_change_assigned_privilege(collection: &mut EntityCollection, user: EntityId, scope: PrivilegeScope, privilege: Privilege, value: PrivilegeValue, duration: i64, from: Timestamp) {
        collection.privileges.assigned.insert((user, scope, privilege), AssignedPrivilege { value, from, duration });
    }

    pub fn change_assigned_privilege(&self, auth_ctx: &AuthContext, target: EntityId, scope: PrivilegeScope, privilege: Privilege, new_value: PrivilegeValue, duration: i64) -> ForumResult<()> {
        let now = crate::clock::now();
        let config = self.config.load();
        let mut collection = self.collection.write().expect("collection lock poisoned");
        Store::touch_last_seen(&mut collection, auth_ctx.current_user, now, config.user.last_seen_update_precision);

        let decision = authorize(&collection, &self.throttler, auth_ctx, Privilege::AdjustPrivilege, scope, None, config.service.disable_throttling, now);
        self.check_authorization(auth_ctx, decision)?;

        let current = resolve_assigned_privilege(&collection, auth_ctx.current_user, privilege, scope, now);
        if !can_grant_privilege(current, new_value, auth_ctx.current_user, target) {
            return Err(ForumError::NotAllowed);
        }

        Self::mutate_change_assigned_privilege(&mut collection, target, scope, privilege, new_value, duration, now);
        drop(collection);

        self.notify(
            &WriteEvent::ChangeAssignedPrivilege { user: target, scope, privilege, value: new_value, duration },
            &ObserverContext { performed_by: auth_ctx.current_user, current_time: now, source_ip: auth_ctx.source_ip },
        );
        Ok(())
    }

    pub fn change_assigned_privilege_direct(&self, user: EntityId, scope: PrivilegeScope, privilege: Privilege, value: PrivilegeValue, duration: i64, from: Timestamp) {
        self.with_writer(|collection| Self::mutate_change_assigned_privilege(collection, user, scope, privilege, value, duration, from))
    }

    pub fn get_required_privilege(&self, scope: PrivilegeScope, privilege: Privilege) -> PrivilegeValue {
        self.with_reader(|collection| required_privilege(collection, privilege, scope))
    }

    pub fn get_assigned_privilege(&self, user: EntityId, scope: PrivilegeScope, privilege: Privilege, at: Timestamp) -> PrivilegeValue {
        self.with_reader(|collection| resolve_assigned_privilege(collection, user, privilege, scope, at))
    }
}
