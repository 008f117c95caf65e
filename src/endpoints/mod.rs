//! HTTP-to-repository glue (spec §6.2, component C9): translates parsed
//! requests into [`crate::store::Store`] calls and their results back into
//! [`crate::http::HandlerResponse`]s. Route coverage is representative of
//! spec §6.2's table, not the original's full ~130-route surface.

pub mod categories;
pub mod comments;
pub mod messages;
pub mod meta;
pub mod privileges;
pub mod session;
pub mod tags;
pub mod threads;
pub mod users;
pub mod views;

use crate::auth::AuthContext;
use crate::clock::Timestamp;
use crate::error::ForumError;
use crate::http::{HandlerResponse, HttpRequest, Router};
use crate::id::{EntityId, RawIp};
use crate::store::{DisplayContext, SortOrder, Store};
use session::SessionStore;
use std::sync::Arc;

pub const SESSION_COOKIE_NAME: &str = "session";
pub(crate) const SESSION_TTL_SECONDS: Timestamp = 30 * 24 * 3600;

/// Everything a route handler closes over (spec §4.2's repository plus the
/// session layer spec §6.2 needs on top of it).
#[derive(Clone)]
pub struct EndpointContext {
    pub store: Arc<Store>,
    pub sessions: Arc<SessionStore>,
}

/// Resolves the acting user from the session cookie, falling back to the
/// anonymous sentinel (spec §3 "Special sentinel user id \"anonymous\"").
/// Also records an anonymous visit for the online-users count (spec §6.4).
pub fn auth_context(ctx: &EndpointContext, request: &HttpRequest) -> AuthContext {
    let now = crate::clock::now();
    let source_ip = RawIp::from(request.remote_address);
    let current_user = request
        .cookie(SESSION_COOKIE_NAME)
        .and_then(|token| ctx.sessions.resolve(token, now))
        .unwrap_or(crate::id::ANONYMOUS_USER_ID);
    if current_user.is_anonymous() {
        ctx.store.record_visit(source_ip, now);
    }
    AuthContext { current_user, source_ip }
}

/// Builds a [`DisplayContext`] from `?page=&sort=` query parameters (spec
/// §4.1). Unrecognized or missing values fall back to ascending, page 0.
pub fn display_context(request: &HttpRequest) -> DisplayContext {
    let sort_order = match request.query_param("sort") {
        Some("descending") => SortOrder::Descending,
        _ => SortOrder::Ascending,
    };
    let page_number = request.query_param("page").and_then(|p| p.parse().ok()).unwrap_or(0);
    DisplayContext { sort_order, page_number, check_not_changed_since: None }
}

/// Parses one `:id`-shaped path segment into an [`EntityId`], mapping a
/// malformed segment to the same 404 a missing entity would produce.
pub fn parse_id(raw: Option<&&str>) -> Result<EntityId, ForumError> {
    raw.ok_or_else(|| ForumError::NotFound("missing id".to_string()))?
        .parse::<EntityId>()
        .map_err(|_| ForumError::NotFound("malformed id".to_string()))
}

pub fn ok_json<T: serde::Serialize>(value: &T) -> HandlerResponse {
    match serde_json::to_vec(value) {
        Ok(body) => HandlerResponse::json(200, body),
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize response body");
            HandlerResponse::json(500, b"{}".to_vec())
        }
    }
}

/// Maps a repository-level failure to its HTTP status and a small JSON
/// error body (spec §7).
pub fn error_response(err: ForumError) -> HandlerResponse {
    let view = views::ErrorView { code: err.code(), message: err.to_string() };
    HandlerResponse::json(err.http_status(), serde_json::to_vec(&view).unwrap_or_default())
}

pub fn result_json<T: serde::Serialize>(result: Result<T, ForumError>) -> HandlerResponse {
    match result {
        Ok(value) => ok_json(&value),
        Err(err) => error_response(err),
    }
}

pub fn empty_ok() -> HandlerResponse {
    HandlerResponse::json(200, b"{}".to_vec())
}

pub fn result_empty(result: Result<(), ForumError>) -> HandlerResponse {
    match result {
        Ok(()) => empty_ok(),
        Err(err) => error_response(err),
    }
}

/// Reads the request body as UTF-8, mapping invalid bytes to a 200-coded
/// `INVALID_PARAMETERS` error per spec §7's "malformed input" bucket.
pub fn body_text(request: &HttpRequest) -> Result<&str, ForumError> {
    std::str::from_utf8(&request.body).map_err(|_| ForumError::InvalidParameters("request body is not valid UTF-8".to_string()))
}

/// Assembles the full route table (spec §6.2's representative surface)
/// behind one [`Router`], plus the statistics/health endpoints.
pub fn build_router(ctx: EndpointContext) -> Router<crate::http::Handler> {
    let mut router = Router::new();
    users::register(&mut router, ctx.clone());
    threads::register(&mut router, ctx.clone());
    messages::register(&mut router, ctx.clone());
    comments::register(&mut router, ctx.clone());
    tags::register(&mut router, ctx.clone());
    categories::register(&mut router, ctx.clone());
    privileges::register(&mut router, ctx.clone());
    meta::register(&mut router, ctx);

    router.set_default_route(Arc::new(|_request: &HttpRequest, _parts: &[&str]| HandlerResponse::json(404, b"{}".to_vec())));
    router
}
