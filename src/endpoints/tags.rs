//! Discussion tag routes (spec §6.2): list/create/rename/delete. Attach
//! and detach from a thread or category are nested under those resources
//! (`endpoints::threads`, `endpoints::categories`) since the router
//! matches whole literal prefixes rather than templated segments.

use super::views::TagView;
use super::{auth_context, body_text, error_response, ok_json, parse_id, result_empty, result_json, EndpointContext};
use crate::error::ForumError;
use crate::http::{HttpRequest, HttpVerb, Router};
use std::sync::Arc;

pub fn register(router: &mut Router<crate::http::Handler>, ctx: EndpointContext) {
    {
        let ctx = ctx.clone();
        router.add_route(
            "tags/",
            HttpVerb::Get,
            Arc::new(move |_request: &HttpRequest, _parts: &[&str]| {
                let tags = ctx.store.list_all_tags();
                ok_json(&tags.iter().map(TagView::from).collect::<Vec<_>>())
            }),
        );
    }

    {
        let ctx = ctx.clone();
        router.add_route(
            "tags/",
            HttpVerb::Post,
            Arc::new(move |request: &HttpRequest, _parts: &[&str]| {
                let name = match body_text(request) {
                    Ok(t) => t,
                    Err(e) => return error_response(e),
                };
                let auth = auth_context(&ctx, request);
                result_json(ctx.store.add_tag(&auth, name).map(|id| id.to_string()))
            }),
        );
    }

    {
        let ctx = ctx.clone();
        router.add_route(
            "tags/id/",
            HttpVerb::Put,
            Arc::new(move |request: &HttpRequest, parts: &[&str]| {
                let id = match parse_id(parts.first()) {
                    Ok(id) => id,
                    Err(e) => return error_response(e),
                };
                let new_name = match body_text(request) {
                    Ok(t) => t,
                    Err(e) => return error_response(e),
                };
                let auth = auth_context(&ctx, request);
                match parts.get(1).copied() {
                    Some("name") | None => result_empty(ctx.store.change_tag_name(&auth, id, new_name)),
                    Some(_) => error_response(ForumError::NotFound("unknown tag sub-resource".to_string())),
                }
            }),
        );
    }

    {
        let ctx = ctx.clone();
        router.add_route(
            "tags/id/",
            HttpVerb::Delete,
            Arc::new(move |request: &HttpRequest, parts: &[&str]| {
                let id = match parse_id(parts.first()) {
                    Ok(id) => id,
                    Err(e) => return error_response(e),
                };
                let auth = auth_context(&ctx, request);
                result_empty(ctx.store.delete_tag(&auth, id))
            }),
        );
    }
}
