//! Discussion thread routes (spec §6.2): list/get/create/rename/delete,
//! pin, subscribe/unsubscribe, merge, and the list of messages in a
//! thread. Nested actions dispatch on the extra path parts after the
//! thread id (see the module doc in `endpoints::users`).

use super::views::{MessageView, ThreadView};
use super::{auth_context, body_text, display_context, error_response, ok_json, parse_id, result_empty, result_json, EndpointContext};
use crate::error::ForumError;
use crate::http::{HttpRequest, HttpVerb, Router};
use crate::store::validation::PermissiveNameValidator;
use std::sync::Arc;

pub fn register(router: &mut Router<crate::http::Handler>, ctx: EndpointContext) {
    let validator = Arc::new(PermissiveNameValidator);

    {
        let ctx = ctx.clone();
        router.add_route(
            "threads/",
            HttpVerb::Get,
            Arc::new(move |request: &HttpRequest, _parts: &[&str]| {
                let display = display_context(request);
                let page_size = ctx.store.config.load().discussion_thread.max_per_page;
                let threads = ctx.store.list_threads_by_latest_message(&display, page_size);
                ok_json(&threads.iter().map(ThreadView::from).collect::<Vec<_>>())
            }),
        );
    }

    {
        let ctx = ctx.clone();
        let validator = validator.clone();
        router.add_route(
            "threads/",
            HttpVerb::Post,
            Arc::new(move |request: &HttpRequest, _parts: &[&str]| {
                let name = match body_text(request) {
                    Ok(t) => t,
                    Err(e) => return error_response(e),
                };
                let auth = auth_context(&ctx, request);
                result_json(ctx.store.add_thread(&auth, name, validator.as_ref()).map(|id| id.to_string()))
            }),
        );
    }

    {
        let ctx = ctx.clone();
        router.add_route(
            "threads/id/",
            HttpVerb::Get,
            Arc::new(move |request: &HttpRequest, parts: &[&str]| {
                let id = match parse_id(parts.first()) {
                    Ok(id) => id,
                    Err(e) => return error_response(e),
                };
                match parts.get(1).copied() {
                    None => match ctx.store.get_thread_by_id(id) {
                        Some(thread) => {
                            ctx.store.record_thread_visit(id);
                            ok_json(&ThreadView::from(&thread))
                        }
                        None => error_response(ForumError::NotFound(format!("thread {id}"))),
                    },
                    Some("messages") => {
                        let page_number = request.query_param("page").and_then(|p| p.parse().ok()).unwrap_or(0);
                        let page_size = ctx.store.config.load().discussion_thread_message.max_per_page;
                        let messages = ctx.store.list_messages_in_thread(id, page_number, page_size);
                        ok_json(&messages.iter().map(MessageView::from).collect::<Vec<_>>())
                    }
                    Some(_) => error_response(ForumError::NotFound("unknown thread sub-resource".to_string())),
                }
            }),
        );
    }

    {
        let ctx = ctx.clone();
        let validator = validator.clone();
        router.add_route(
            "threads/id/",
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
                        result_empty(ctx.store.change_thread_name(&auth, id, new_name, validator.as_ref()))
                    }
                    Some("pin") => {
                        let display_order = match body_text(request).ok().and_then(|t| t.trim().parse::<u32>().ok()) {
                            Some(v) => v,
                            None => return error_response(ForumError::InvalidParameters("display order must be an unsigned integer".to_string())),
                        };
                        result_empty(ctx.store.pin_thread(&auth, id, display_order))
                    }
                    _ => error_response(ForumError::NotFound("unknown thread sub-resource".to_string())),
                }
            }),
        );
    }

    {
        let ctx = ctx.clone();
        router.add_route(
            "threads/id/",
            HttpVerb::Post,
            Arc::new(move |request: &HttpRequest, parts: &[&str]| {
                let id = match parse_id(parts.first()) {
                    Ok(id) => id,
                    Err(e) => return error_response(e),
                };
                let auth = auth_context(&ctx, request);
                match parts.get(1).copied() {
                    Some("subscribe") => result_empty(ctx.store.subscribe_to_thread(&auth, id)),
                    Some("merge") => {
                        let destination = match body_text(request).ok().and_then(|t| t.trim().parse().ok()) {
                            Some(destination) => destination,
                            None => return error_response(ForumError::NotFound("destination thread id".to_string())),
                        };
                        result_empty(ctx.store.merge_threads(&auth, id, destination))
                    }
                    Some("tags") => {
                        let tag = match parts.get(2).and_then(|p| p.parse().ok()) {
                            Some(tag) => tag,
                            None => return error_response(ForumError::NotFound("tag id".to_string())),
                        };
                        result_empty(ctx.store.attach_tag_to_thread(&auth, tag, id))
                    }
                    Some("messages") => result_json(ctx.store.add_message(&auth, id, request.body.clone()).map(|mid| mid.to_string())),
                    _ => error_response(ForumError::NotFound("unknown thread sub-resource".to_string())),
                }
            }),
        );
    }

    {
        let ctx = ctx.clone();
        router.add_route(
            "threads/id/",
            HttpVerb::Delete,
            Arc::new(move |request: &HttpRequest, parts: &[&str]| {
                let id = match parse_id(parts.first()) {
                    Ok(id) => id,
                    Err(e) => return error_response(e),
                };
                let auth = auth_context(&ctx, request);
                match parts.get(1).copied() {
                    None => result_empty(ctx.store.delete_thread(&auth, id)),
                    Some("subscribe") => result_empty(ctx.store.unsubscribe_from_thread(&auth, id)),
                    Some("tags") => {
                        let tag = match parts.get(2).and_then(|p| p.parse().ok()) {
                            Some(tag) => tag,
                            None => return error_response(ForumError::NotFound("tag id".to_string())),
                        };
                        result_empty(ctx.store.detach_tag_from_thread(&auth, tag, id))
                    }
                    Some(_) => error_response(ForumError::NotFound("unknown thread sub-resource".to_string())),
                }
            }),
        );
    }
}
