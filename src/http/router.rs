//! Prefix+verb router (spec §4.6 "Router"), grounded on the original's
//! `HttpRouter.h`/`.cpp`: routes are bucketed by `firstByte(path) % 128`,
//! then by verb, and matched longest-key-first within a bucket so a more
//! specific route always wins over a shorter prefix of it.

use super::request::{HttpRequest, HttpVerb, MAX_EXTRA_PATH_PARTS};

const FIRST_BYTE_BUCKETS: usize = 128;

pub struct RouteMatch<'a, H> {
    pub handler: &'a H,
    /// The path split on `/` after the matched prefix, bounded per spec
    /// §4.6 to [`MAX_EXTRA_PATH_PARTS`].
    pub extra_path_parts: Vec<&'a str>,
}

struct Route<H> {
    prefix: String,
    handler: H,
}

/// spec §4.6 "routes are `(lowercased-path-prefix, verb) -> handler`".
pub struct Router<H> {
    buckets: Vec<[Vec<Route<H>>; 4]>,
    default_route: Option<H>,
}

fn verb_index(verb: HttpVerb) -> usize {
    match verb {
        HttpVerb::Get => 0,
        HttpVerb::Post => 1,
        HttpVerb::Put => 2,
        HttpVerb::Delete => 3,
    }
}

fn bucket_index(path: &str) -> usize {
    path.as_bytes().first().copied().unwrap_or(0) as usize % FIRST_BYTE_BUCKETS
}

impl<H> Router<H> {
    pub fn new() -> Self {
        Router {
            buckets: (0..FIRST_BYTE_BUCKETS).map(|_| Default::default()).collect(),
            default_route: None,
        }
    }

    /// Registers a route. `path_prefix` must already be lowercased with a
    /// trailing `/`, matching what the parser produces (spec §4.6).
    pub fn add_route(&mut self, path_prefix: &str, verb: HttpVerb, handler: H) {
        let bucket = &mut self.buckets[bucket_index(path_prefix)][verb_index(verb)];
        bucket.push(Route { prefix: path_prefix.to_string(), handler });
        // Longest-key-first (spec §4.6 "iterates routes in longest-key-first order").
        bucket.sort_by(|a, b| b.prefix.len().cmp(&a.prefix.len()).then_with(|| a.prefix.cmp(&b.prefix)));
    }

    pub fn set_default_route(&mut self, handler: H) {
        self.default_route = Some(handler);
    }

    /// Finds the longest matching route prefix for `request.path` and
    /// splits the remainder into extra path parts (spec §4.6).
    pub fn route<'a>(&'a self, request: &'a HttpRequest) -> Option<RouteMatch<'a, H>> {
        let bucket = &self.buckets[bucket_index(&request.path)][verb_index(request.verb)];
        for route in bucket {
            if let Some(rest) = request.path.strip_prefix(route.prefix.as_str()) {
                let extra_path_parts = rest.split('/').filter(|p| !p.is_empty()).take(MAX_EXTRA_PATH_PARTS).collect();
                return Some(RouteMatch { handler: &route.handler, extra_path_parts });
            }
        }
        self.default_route.as_ref().map(|handler| RouteMatch { handler, extra_path_parts: Vec::new() })
    }
}

impl<H> Default for Router<H> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn req(path: &str, verb: HttpVerb) -> HttpRequest {
        HttpRequest {
            verb,
            path: path.to_string(),
            version_major: 1,
            version_minor: 1,
            keep_alive: true,
            headers: Vec::new(),
            query: Vec::new(),
            cookies: Vec::new(),
            body: Vec::new(),
            remote_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
        }
    }

    #[test]
    fn longer_prefix_wins_over_shorter_one_in_the_same_bucket() {
        let mut router: Router<&'static str> = Router::new();
        router.add_route("users/", HttpVerb::Get, "list_users");
        router.add_route("users/id/", HttpVerb::Get, "get_user_by_id");

        let m = router.route(&req("users/id/abc/", HttpVerb::Get)).unwrap();
        assert_eq!(*m.handler, "get_user_by_id");
        assert_eq!(m.extra_path_parts, vec!["abc"]);
    }

    #[test]
    fn falls_back_to_default_route_when_unmatched() {
        let mut router: Router<&'static str> = Router::new();
        router.add_route("users/", HttpVerb::Get, "list_users");
        router.set_default_route("not_found");

        let m = router.route(&req("tags/", HttpVerb::Get)).unwrap();
        assert_eq!(*m.handler, "not_found");
    }
}
