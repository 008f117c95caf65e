//! Discussion thread message routes (spec §6.2): get/edit/delete content,
//! move between threads, vote, and list/add comments. Thread-scoped
//! creation and listing live in `endpoints::threads` (nested under
//! `threads/id/`); this module covers actions addressed by message id.

use super::views::{CommentView, MessageView};
use super::{auth_context, body_text, error_response, ok_json, parse_id, result_empty, result_json, EndpointContext};
use crate::error::ForumError;
use crate::http::{HttpRequest, HttpVerb, Router};
use std::sync::Arc;

pub fn register(router: &mut Router<crate::http::Handler>, ctx: EndpointContext) {
    {
        let ctx = ctx.clone();
        router.add_route(
            "messages/id/",
            HttpVerb::Get,
            Arc::new(move |_request: &HttpRequest, parts: &[&str]| {
                let id = match parse_id(parts.first()) {
                    Ok(id) => id,
                    Err(e) => return error_response(e),
                };
                match parts.get(1).copied() {
                    None => match ctx.store.get_message_by_id(id) {
                        Some(message) => ok_json(&MessageView::from(&message)),
                        None => error_response(ForumError::NotFound(format!("message {id}"))),
                    },
                    Some("comments") => {
                        let comments = ctx.store.list_comments_for_message(id);
                        ok_json(&comments.iter().map(CommentView::from).collect::<Vec<_>>())
                    }
                    Some(_) => error_response(ForumError::NotFound("unknown message sub-resource".to_string())),
                }
            }),
        );
    }

    {
        let ctx = ctx.clone();
        router.add_route(
            "messages/id/",
            HttpVerb::Put,
            Arc::new(move |request: &HttpRequest, parts: &[&str]| {
                let id = match parse_id(parts.first()) {
                    Ok(id) => id,
                    Err(e) => return error_response(e),
                };
                let auth = auth_context(&ctx, request);
                match parts.get(1).copied() {
                    Some("content") => {
                        let reason = request.query_param("reason").map(str::to_string);
                        result_empty(ctx.store.change_message_content(&auth, id, request.body.clone(), reason))
                    }
                    Some("move") => {
                        let destination = match body_text(request).ok().and_then(|t| t.trim().parse().ok()) {
                            Some(destination) => destination,
                            None => return error_response(ForumError::NotFound("destination thread id".to_string())),
                        };
                        result_empty(ctx.store.move_message(&auth, id, destination))
                    }
                    _ => error_response(ForumError::NotFound("unknown message sub-resource".to_string())),
                }
            }),
        );
    }

    {
        let ctx = ctx.clone();
        router.add_route(
            "messages/id/",
            HttpVerb::Post,
            Arc::new(move |request: &HttpRequest, parts: &[&str]| {
                let id = match parse_id(parts.first()) {
                    Ok(id) => id,
                    Err(e) => return error_response(e),
                };
                let auth = auth_context(&ctx, request);
                match parts.get(1).copied() {
                    Some("upvote") => result_empty(ctx.store.up_vote_message(&auth, id)),
                    Some("downvote") => result_empty(ctx.store.down_vote_message(&auth, id)),
                    Some("resetvote") => result_empty(ctx.store.reset_vote_message(&auth, id)),
                    Some("comments") => {
                        let content = match body_text(request) {
                            Ok(t) => t,
                            Err(e) => return error_response(e),
                        };
                        result_json(ctx.store.add_comment(&auth, id, content).map(|cid| cid.to_string()))
                    }
                    _ => error_response(ForumError::NotFound("unknown message sub-resource".to_string())),
                }
            }),
        );
    }

    {
        let ctx = ctx.clone();
        router.add_route(
            "messages/id/",
            HttpVerb::Delete,
            Arc::new(move |request: &HttpRequest, parts: &[&str]| {
                let id = match parse_id(parts.first()) {
                    Ok(id) => id,
                    Err(e) => return error_response(e),
                };
                let auth = auth_context(&ctx, request);
                result_empty(ctx.store.delete_message(&auth, id))
            }),
        );
    }
}
