//! Forum-wide routes that don't belong to a single entity kind: point-in-time
//! statistics and the online-visitor count (spec §6.4, recovered feature
//! grounded on `MemoryRepositoryStatistics` and `VisitorCollection.h`; see
//! SPEC_FULL.md §B.1, §B.4).

use super::{ok_json, EndpointContext};
use crate::http::{HttpRequest, HttpVerb, Router};
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
struct OnlineUsersView {
    count: usize,
}

pub fn register(router: &mut Router<crate::http::Handler>, ctx: EndpointContext) {
    {
        let ctx = ctx.clone();
        router.add_route(
            "statistics/",
            HttpVerb::Get,
            Arc::new(move |_request: &HttpRequest, _parts: &[&str]| ok_json(&ctx.store.statistics())),
        );
    }

    {
        let ctx = ctx.clone();
        router.add_route(
            "users_online/",
            HttpVerb::Get,
            Arc::new(move |_request: &HttpRequest, _parts: &[&str]| {
                let count = ctx.store.online_visitor_count(crate::clock::now());
                ok_json(&OnlineUsersView { count })
            }),
        );
    }
}
