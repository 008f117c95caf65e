//! Shared scaffolding for the repository-level integration suite.
//!
//! There is no test-harness-friendly web framework to stand up here (the
//! HTTP layer is a hand-rolled pipeline, see src/http), so these tests
//! drive `forum_core::store::Store` directly, the same entry point the
//! endpoint handlers use once a request has been authenticated.

use forum_core::auth::AuthContext;
use forum_core::config::Config;
use forum_core::id::{EntityId, RawIp, ANONYMOUS_USER_ID};
use forum_core::store::Store;
use forum_core::store::validation::PermissiveNameValidator;

pub fn test_store() -> Store {
    Store::new(Config::default())
}

pub fn anonymous() -> AuthContext {
    AuthContext { current_user: ANONYMOUS_USER_ID, source_ip: RawIp::UNKNOWN }
}

pub fn as_user(user: EntityId) -> AuthContext {
    AuthContext { current_user: user, source_ip: RawIp::UNKNOWN }
}

pub fn validator() -> PermissiveNameValidator {
    PermissiveNameValidator
}

/// Registers a user with the given name as both display name and auth
/// handle, a pattern convenient enough for tests that don't care about the
/// login/auth-handle distinction.
pub fn register_user(store: &Store, name: &str) -> EntityId {
    store.add_user(&anonymous(), name, name, &validator()).expect("add_user")
}
