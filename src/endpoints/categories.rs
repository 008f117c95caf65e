//! Discussion category routes (spec §6.2): list roots/get/create/rename/
//! delete, reparent, reorder, and attach/detach a tag. Nested actions share
//! one handler per `categories/id/` + verb registration and dispatch on the
//! extra path parts after the id, same as `endpoints::threads`.

use super::views::CategoryView;
use super::{auth_context, body_text, error_response, ok_json, parse_id, result_empty, result_json, EndpointContext};
use crate::error::ForumError;
use crate::http::{HttpRequest, HttpVerb, Router};
use std::sync::Arc;

pub fn register(router: &mut Router<crate::http::Handler>, ctx: EndpointContext) {
    {
        let ctx = ctx.clone();
        router.add_route(
            "categories/",
            HttpVerb::Get,
            Arc::new(move |_request: &HttpRequest, _parts: &[&str]| {
                let categories = ctx.store.list_root_categories();
                let views: Vec<CategoryView> = categories
                    .iter()
                    .map(|c| {
                        let (thread_count, message_count) = ctx.store.category_counters(c.header.id);
                        CategoryView::with_counters(c, thread_count, message_count)
                    })
                    .collect();
                ok_json(&views)
            }),
        );
    }

    {
        let ctx = ctx.clone();
        router.add_route(
            "categories/",
            HttpVerb::Post,
            Arc::new(move |request: &HttpRequest, _parts: &[&str]| {
                let name = match body_text(request) {
                    Ok(t) => t,
                    Err(e) => return error_response(e),
                };
                let parent = request.query_param("parent").and_then(|p| p.parse().ok());
                let auth = auth_context(&ctx, request);
                result_json(ctx.store.add_category(&auth, name, parent).map(|id| id.to_string()))
            }),
        );
    }

    {
        let ctx = ctx.clone();
        router.add_route(
            "categories/id/",
            HttpVerb::Get,
            Arc::new(move |_request: &HttpRequest, parts: &[&str]| match parse_id(parts.first()) {
                Ok(id) => match ctx.store.get_category_by_id(id) {
                    Some(category) => {
                        let (thread_count, message_count) = ctx.store.category_counters(id);
                        ok_json(&CategoryView::with_counters(&category, thread_count, message_count))
                    }
                    None => error_response(ForumError::NotFound(format!("category {id}"))),
                },
                Err(e) => error_response(e),
            }),
        );
    }

    {
        let ctx = ctx.clone();
        router.add_route(
            "categories/id/",
            HttpVerb::Put,
            Arc::new(move |request: &HttpRequest, parts: &[&str]| {
                let id = match parse_id(parts.first()) {
                    Ok(id) => id,
                    Err(e) => return error_response(e),
                };
                let auth = auth_context(&ctx, request);
                match parts.get(1).copied() {
                    Some("name") => {
                        let new_name = match body_text(request) {
                            Ok(t) => t,
                            Err(e) => return error_response(e),
                        };
                        result_empty(ctx.store.change_category_name(&auth, id, new_name))
                    }
                    Some("description") => {
                        let new_description = body_text(request).unwrap_or("");
                        result_empty(ctx.store.change_category_description(&auth, id, new_description))
                    }
                    Some("parent") => {
                        let new_parent = body_text(request).ok().and_then(|t| t.trim().parse().ok());
                        result_empty(ctx.store.change_category_parent(&auth, id, new_parent))
                    }
                    Some("order") => {
                        let new_order = match body_text(request).ok().and_then(|t| t.trim().parse::<i32>().ok()) {
                            Some(v) => v,
                            None => return error_response(ForumError::InvalidParameters("display order must be an integer".to_string())),
                        };
                        result_empty(ctx.store.change_category_display_order(&auth, id, new_order))
                    }
                    _ => error_response(ForumError::NotFound("unknown category sub-resource".to_string())),
                }
            }),
        );
    }

    {
        let ctx = ctx.clone();
        router.add_route(
            "categories/id/",
            HttpVerb::Post,
            Arc::new(move |request: &HttpRequest, parts: &[&str]| {
                let id = match parse_id(parts.first()) {
                    Ok(id) => id,
                    Err(e) => return error_response(e),
                };
                let auth = auth_context(&ctx, request);
                match parts.get(1).copied() {
                    Some("tags") => {
                        let tag = match parts.get(2).and_then(|p| p.parse().ok()) {
                            Some(tag) => tag,
                            None => return error_response(ForumError::NotFound("tag id".to_string())),
                        };
                        result_empty(ctx.store.attach_tag_to_category(&auth, tag, id))
                    }
                    _ => error_response(ForumError::NotFound("unknown category sub-resource".to_string())),
                }
            }),
        );
    }

    {
        let ctx = ctx.clone();
        router.add_route(
            "categories/id/",
            HttpVerb::Delete,
            Arc::new(move |request: &HttpRequest, parts: &[&str]| {
                let id = match parse_id(parts.first()) {
                    Ok(id) => id,
                    Err(e) => return error_response(e),
                };
                let auth = auth_context(&ctx, request);
                match parts.get(1).copied() {
                    None => result_empty(ctx.store.delete_category(&auth, id)),
                    Some("tags") => {
                        let tag = match parts.get(2).and_then(|p| p.parse().ok()) {
                            Some(tag) => tag,
                            None => return error_response(ForumError::NotFound("tag id".to_string())),
                        };
                        result_empty(ctx.store.detach_tag_from_category(&auth, tag, id))
                    }
                    Some(_) => error_response(ForumError::NotFound("unknown category sub-resource".to_string())),
                }
            }),
        );
    }
}
