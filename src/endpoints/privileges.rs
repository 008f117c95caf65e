//! Privilege routes (spec §4.5, §6.2): read/change the required privilege
//! for a scope, and grant/read a per-user assigned privilege in a scope.
//!
//! The scope and privilege are small enough to travel as query parameters
//! rather than a JSON body, in keeping with how `endpoints::categories`
//! passes `parent` the same way; the new value (and, for assigned grants,
//! the duration) is the plain-text request body.

use super::{auth_context, body_text, error_response, ok_json, parse_id, result_empty, EndpointContext};
use crate::entities::{Privilege, PrivilegeScope, PrivilegeValue};
use crate::error::ForumError;
use crate::http::{HttpRequest, HttpVerb, Router};
use std::sync::Arc;

fn parse_privilege(request: &HttpRequest) -> Result<Privilege, ForumError> {
    let code: u16 = request
        .query_param("privilege")
        .and_then(|p| p.parse().ok())
        .ok_or_else(|| ForumError::InvalidParameters("missing or invalid privilege code".to_string()))?;
    Privilege::from_code(code).ok_or_else(|| ForumError::InvalidParameters(format!("unknown privilege code {code}")))
}

fn parse_scope(request: &HttpRequest) -> Result<PrivilegeScope, ForumError> {
    let scope_id = || {
        request
            .query_param("scope_id")
            .and_then(|p| p.parse().ok())
            .ok_or_else(|| ForumError::InvalidParameters("missing scope_id".to_string()))
    };
    match request.query_param("scope") {
        Some("message") => Ok(PrivilegeScope::Message(scope_id()?)),
        Some("thread") => Ok(PrivilegeScope::Thread(scope_id()?)),
        Some("tag") => Ok(PrivilegeScope::Tag(scope_id()?)),
        Some("category") => Ok(PrivilegeScope::Category(scope_id()?)),
        Some("forumwide") => Ok(PrivilegeScope::ForumWide),
        _ => Err(ForumError::InvalidParameters("missing or unknown scope".to_string())),
    }
}

fn parse_value(request: &HttpRequest) -> Result<PrivilegeValue, ForumError> {
    body_text(request)?
        .trim()
        .parse()
        .map_err(|_| ForumError::InvalidParameters("value must be an integer".to_string()))
}

pub fn register(router: &mut Router<crate::http::Handler>, ctx: EndpointContext) {
    {
        let ctx = ctx.clone();
        router.add_route(
            "privileges/required/",
            HttpVerb::Get,
            Arc::new(move |request: &HttpRequest, _parts: &[&str]| {
                let scope = match parse_scope(request) {
                    Ok(scope) => scope,
                    Err(e) => return error_response(e),
                };
                let privilege = match parse_privilege(request) {
                    Ok(p) => p,
                    Err(e) => return error_response(e),
                };
                ok_json(&ctx.store.get_required_privilege(scope, privilege))
            }),
        );
    }

    {
        let ctx = ctx.clone();
        router.add_route(
            "privileges/required/",
            HttpVerb::Post,
            Arc::new(move |request: &HttpRequest, _parts: &[&str]| {
                let scope = match parse_scope(request) {
                    Ok(scope) => scope,
                    Err(e) => return error_response(e),
                };
                let privilege = match parse_privilege(request) {
                    Ok(p) => p,
                    Err(e) => return error_response(e),
                };
                let new_value = match parse_value(request) {
                    Ok(v) => v,
                    Err(e) => return error_response(e),
                };
                let auth = auth_context(&ctx, request);
                result_empty(ctx.store.change_required_privilege(&auth, scope, privilege, new_value))
            }),
        );
    }

    {
        let ctx = ctx.clone();
        router.add_route(
            "privileges/id/",
            HttpVerb::Get,
            Arc::new(move |request: &HttpRequest, parts: &[&str]| {
                let target = match parse_id(parts.first()) {
                    Ok(id) => id,
                    Err(e) => return error_response(e),
                };
                let scope = match parse_scope(request) {
                    Ok(scope) => scope,
                    Err(e) => return error_response(e),
                };
                let privilege = match parse_privilege(request) {
                    Ok(p) => p,
                    Err(e) => return error_response(e),
                };
                let now = crate::clock::now();
                ok_json(&ctx.store.get_assigned_privilege(target, scope, privilege, now))
            }),
        );
    }

    {
        let ctx = ctx.clone();
        router.add_route(
            "privileges/id/",
            HttpVerb::Post,
            Arc::new(move |request: &HttpRequest, parts: &[&str]| {
                let target = match parse_id(parts.first()) {
                    Ok(id) => id,
                    Err(e) => return error_response(e),
                };
                let scope = match parse_scope(request) {
                    Ok(scope) => scope,
                    Err(e) => return error_response(e),
                };
                let privilege = match parse_privilege(request) {
                    Ok(p) => p,
                    Err(e) => return error_response(e),
                };
                let duration = request.query_param("duration").and_then(|d| d.parse().ok()).unwrap_or(0);
                let new_value = match parse_value(request) {
                    Ok(v) => v,
                    Err(e) => return error_response(e),
                };
                let auth = auth_context(&ctx, request);
                result_empty(ctx.store.change_assigned_privilege(&auth, target, scope, privilege, new_value, duration))
            }),
        );
    }
}
