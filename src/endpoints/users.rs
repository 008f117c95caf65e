//! User routes (spec §6.2): list/get by id/change name/change info/delete,
//! plus login (spec §6.2 "login issues a session cookie").
//!
//! Nested actions share one handler per `users/id/` + verb registration
//! and dispatch on the extra path parts after the id, since the router
//! matches whole literal prefixes rather than templated path segments
//! (spec §4.6, grounded on the original's `HttpRouter`).

use super::views::UserView;
use super::{auth_context, body_text, display_context, error_response, ok_json, parse_id, result_empty, EndpointContext, SESSION_COOKIE_NAME, SESSION_TTL_SECONDS};
use crate::error::ForumError;
use crate::http::{Cookie, HandlerResponse, HttpRequest, HttpVerb, Router};
use crate::store::validation::PermissiveNameValidator;
use std::sync::Arc;

pub fn register(router: &mut Router<crate::http::Handler>, ctx: EndpointContext) {
    let validator = Arc::new(PermissiveNameValidator);

    {
        let ctx = ctx.clone();
        router.add_route(
            "users/",
            HttpVerb::Get,
            Arc::new(move |request: &HttpRequest, _parts: &[&str]| {
                let display = display_context(request);
                let page_size = ctx.store.config.load().user.max_users_per_page;
                let users = ctx.store.list_users_by_created(&display, page_size);
                ok_json(&users.iter().map(UserView::from).collect::<Vec<_>>())
            }),
        );
    }

    {
        let ctx = ctx.clone();
        router.add_route(
            "users/login/",
            HttpVerb::Post,
            Arc::new(move |request: &HttpRequest, _parts: &[&str]| {
                let auth_handle = match body_text(request) {
                    Ok(t) => t.trim(),
                    Err(e) => return error_response(e),
                };
                if auth_handle.is_empty() {
                    return error_response(ForumError::InvalidParameters("missing auth handle".to_string()));
                }
                let auth = auth_context(&ctx, request);
                let user = ctx
                    .store
                    .get_user_by_name(auth_handle)
                    .map(|u| u.header.id)
                    .unwrap_or_else(|| ctx.store.add_user(&auth, auth_handle, auth_handle, validator.as_ref()).unwrap_or(crate::id::ANONYMOUS_USER_ID));
                if user.is_anonymous() {
                    return error_response(ForumError::InvalidParameters("could not resolve or create user".to_string()));
                }
                let token = ctx.sessions.issue(user, crate::clock::now(), SESSION_TTL_SECONDS);
                let mut cookie = Cookie::new(SESSION_COOKIE_NAME, token);
                cookie.max_age_seconds = Some(SESSION_TTL_SECONDS);
                cookie.http_only = true;
                let mut response = ok_json(&UserView::from(&ctx.store.get_user_by_id(user).unwrap()));
                response.cookies.push(cookie);
                response
            }),
        );
    }

    {
        let ctx = ctx.clone();
        router.add_route(
            "users/logout/",
            HttpVerb::Post,
            Arc::new(move |request: &HttpRequest, _parts: &[&str]| {
                if let Some(token) = request.cookie(SESSION_COOKIE_NAME) {
                    ctx.sessions.revoke(token);
                }
                HandlerResponse::json(200, b"{}".to_vec())
            }),
        );
    }

    {
        let ctx = ctx.clone();
        router.add_route(
            "users/id/",
            HttpVerb::Get,
            Arc::new(move |_request: &HttpRequest, parts: &[&str]| match parse_id(parts.first()) {
                Ok(id) => match ctx.store.get_user_by_id(id) {
                    Some(user) => ok_json(&UserView::from(&user)),
                    None => error_response(ForumError::NotFound(format!("user {id}"))),
                },
                Err(e) => error_response(e),
            }),
        );
    }

    {
        let ctx = ctx.clone();
        let validator = validator.clone();
        router.add_route(
            "users/id/",
            HttpVerb::Put,
            Arc::new(move |request: &HttpRequest, parts: &[&str]| {
                let id = match parse_id(parts.first()) {
                    Ok(id) => id,
                    Err(e) => return error_response(e),
                };
                let new_value = match body_text(request) {
                    Ok(t) => t,
                    Err(e) => return error_response(e),
                };
                let auth = auth_context(&ctx, request);
                match parts.get(1).copied() {
                    Some("name") => result_empty(ctx.store.change_user_name(&auth, id, new_value, validator.as_ref())),
                    Some("info") => result_empty(ctx.store.change_user_info(&auth, id, new_value)),
                    _ => error_response(ForumError::NotFound("unknown user sub-resource".to_string())),
                }
            }),
        );
    }

    {
        let ctx = ctx.clone();
        router.add_route(
            "users/id/",
            HttpVerb::Delete,
            Arc::new(move |request: &HttpRequest, parts: &[&str]| {
                let id = match parse_id(parts.first()) {
                    Ok(id) => id,
                    Err(e) => return error_response(e),
                };
                let auth = auth_context(&ctx, request);
                result_empty(ctx.store.delete_user(&auth, id))
            }),
        );
    }
}
