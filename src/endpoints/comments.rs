//! Message comment routes (spec §6.2): mark a comment solved. Listing and
//! creation live under `messages/id/comments/` in `endpoints::messages`,
//! since a comment is always addressed through its parent message there.

use super::{auth_context, error_response, parse_id, result_empty, EndpointContext};
use crate::error::ForumError;
use crate::http::{HttpRequest, HttpVerb, Router};
use std::sync::Arc;

pub fn register(router: &mut Router<crate::http::Handler>, ctx: EndpointContext) {
    let ctx = ctx.clone();
    router.add_route(
        "comments/id/",
        HttpVerb::Put,
        Arc::new(move |request: &HttpRequest, parts: &[&str]| {
            let id = match parse_id(parts.first()) {
                Ok(id) => id,
                Err(e) => return error_response(e),
            };
            let auth = auth_context(&ctx, request);
            match parts.get(1).copied() {
                Some("solve") => result_empty(ctx.store.solve_comment(&auth, id)),
                _ => error_response(ForumError::NotFound("unknown comment sub-resource".to_string())),
            }
        }),
    );
}
