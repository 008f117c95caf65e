//! In-memory, single-writer forum backend: an indexed entity store behind
//! an append-only binary event log, granular privilege authorization and
//! throttling, and a hand-rolled HTTP/1.1 pipeline (no web framework).
//! See SPEC_FULL.md for the full component breakdown; `main.rs` wires the
//! pieces below into a running service.

pub mod auth;
pub mod clock;
pub mod config;
pub mod endpoints;
pub mod entities;
pub mod error;
pub mod eventlog;
pub mod http;
pub mod id;
pub mod indexing;
pub mod spinlock;
pub mod store;
