//! The hand-rolled HTTP/1.1 pipeline (spec §4.6, component C8): buffer
//! pools, a streaming parser, a prefix+verb router, a linear-state-machine
//! response builder, and connection lifecycle/timeout management. No web
//! framework sits underneath any of this (spec §1 scope: "the HTTP
//! front-end's custom request pipeline").

pub mod buffers;
pub mod connection;
pub mod listener;
pub mod parser;
pub mod request;
pub mod response;
pub mod router;
pub mod timeout;

pub use request::{HttpRequest, HttpVerb};
pub use response::Cookie;
pub use router::Router;

use std::net::IpAddr;
use std::sync::Arc;

/// What a route handler returns; the connection loop turns this into bytes
/// via [`response::ResponseBuilder`] (spec §4.7 "copy its status and body
/// into the response").
#[derive(Debug, Clone, Default)]
pub struct HandlerResponse {
    pub status: u16,
    pub body: Vec<u8>,
    pub headers: Vec<(String, String)>,
    pub cookies: Vec<Cookie>,
}

impl HandlerResponse {
    pub fn json(status: u16, body: Vec<u8>) -> Self {
        HandlerResponse { status, body, headers: vec![("Content-Type".to_string(), "application/json".to_string())], cookies: Vec::new() }
    }
}

/// A registered route handler; synchronous because every repository call it
/// makes is itself synchronous and short-held (spec §5 "Locks are
/// short-held; no I/O occurs while holding the store lock").
pub type Handler = Arc<dyn Fn(&HttpRequest, &[&str]) -> HandlerResponse + Send + Sync>;

/// spec §4.6 "Remote address: either the accepted socket's peer address,
/// or — when the deployment declares that it sits behind a trusted proxy —
/// the first value of the `X-Forwarded-For` header, parsed as v4 or v6."
pub fn remote_address(request: &HttpRequest, socket_peer: IpAddr, trust_x_forwarded_for: bool) -> IpAddr {
    if trust_x_forwarded_for {
        if let Some(header) = request.header("X-Forwarded-For") {
            if let Some(first) = header.split(',').next() {
                if let Ok(parsed) = first.trim().parse::<IpAddr>() {
                    return parsed;
                }
            }
        }
    }
    socket_peer
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn request_with_xff(value: &str) -> HttpRequest {
        HttpRequest {
            verb: HttpVerb::Get,
            path: "x/".to_string(),
            version_major: 1,
            version_minor: 1,
            keep_alive: true,
            headers: vec![("X-Forwarded-For".to_string(), value.to_string())],
            query: Vec::new(),
            cookies: Vec::new(),
            body: Vec::new(),
            remote_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
        }
    }

    #[test]
    fn untrusted_deployments_ignore_x_forwarded_for() {
        let request = request_with_xff("9.9.9.9");
        let resolved = remote_address(&request, IpAddr::V4(Ipv4Addr::new(1, 2, 3, 4)), false);
        assert_eq!(resolved, IpAddr::V4(Ipv4Addr::new(1, 2, 3, 4)));
    }

    #[test]
    fn trusted_deployments_use_the_first_x_forwarded_for_value() {
        let request = request_with_xff("9.9.9.9, 10.0.0.1");
        let resolved = remote_address(&request, IpAddr::V4(Ipv4Addr::new(1, 2, 3, 4)), true);
        assert_eq!(resolved, IpAddr::V4(Ipv4Addr::new(9, 9, 9, 9)));
    }
}
