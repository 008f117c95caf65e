//! The parsed request shape (spec §4.6 "Parser"), grounded on the original's
//! `HttpRequest.h`. Where the original stores `HttpStringView`s into a
//! shared header arena, this crate stores owned `String`s — the arena's
//! point was to avoid per-field allocation inside C++'s manual buffer
//! management, which Rust's allocator already amortizes well enough here.

use std::net::IpAddr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpVerb {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpVerb {
    pub fn parse(s: &str) -> Option<HttpVerb> {
        match s {
            "GET" => Some(HttpVerb::Get),
            "POST" => Some(HttpVerb::Post),
            "PUT" => Some(HttpVerb::Put),
            "DELETE" => Some(HttpVerb::Delete),
            _ => None,
        }
    }
}

pub const MAX_QUERY_PAIRS: usize = 64;
pub const MAX_COOKIES: usize = 32;
pub const MAX_EXTRA_PATH_PARTS: usize = 32;

/// One fully-parsed HTTP/1.1 request (spec §4.6 `HttpRequest`).
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub verb: HttpVerb,
    /// Lowercased, trailing `/` enforced (spec §4.6 "Router").
    pub path: String,
    pub version_major: u8,
    pub version_minor: u8,
    pub keep_alive: bool,
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub cookies: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub remote_address: IpAddr,
}

impl HttpRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter().find(|(k, _)| k.eq_ignore_ascii_case(name)).map(|(_, v)| v.as_str())
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }
}
