//! Per-connection request loop (spec §4.6 "Connection lifecycle").
//!
//! Reads one request at a time off the socket, routes it, runs the
//! matched handler, and writes the response. `Keep-Alive` connections loop
//! back to read the next request instead of closing; the timeout manager
//! force-disconnects idle sockets from outside this task via
//! [`super::timeout::ConnectionManager::sweep_expired`].

use super::buffers::BufferPool;
use super::parser::{parse_request, ParseError};
use super::response::ResponseBuilder;
use super::router::Router;
use super::timeout::{ConnectionId, ConnectionManager};
use super::{remote_address, Handler};
use crate::config::Config;
use arc_swap::ArcSwap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

#[allow(clippy::too_many_arguments)]
pub async fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    router: Arc<Router<Handler>>,
    header_pool: BufferPool,
    config: Arc<ArcSwap<Config>>,
    connection_manager: Arc<ConnectionManager>,
    connection_id: ConnectionId,
) {
    let _ = stream.set_nodelay(true);
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    loop {
        let cfg = config.load();
        let max_body = cfg.discussion_thread_message.max_content_length.max(cfg.user.max_logo_binary_size);
        let response_prefix = cfg.service.response_prefix.clone();
        let trust_xff = cfg.service.trust_ip_from_x_forwarded_for;

        let mut request = match parse_request(&mut reader, &header_pool, max_body, peer_addr.ip()).await {
            Ok(request) => request,
            Err(ParseError::ConnectionClosed) => break,
            Err(err) => {
                let mut builder = ResponseBuilder::new(response_prefix);
                builder.write_status(err.status_code());
                builder.write_body_and_content_length(b"{}");
                let _ = write_half.write_all(&builder.into_bytes()).await;
                break;
            }
        };

        let resolved_ip = remote_address(&request, peer_addr.ip(), trust_xff);
        request.remote_address = resolved_ip;
        tracing::debug!(path = %request.path, verb = ?request.verb, remote = %resolved_ip, "handling request");

        let matched = router.route(&request);
        let mut builder = ResponseBuilder::new(response_prefix.clone());
        match matched {
            Some(route_match) => {
                let outcome = (route_match.handler)(&request, &route_match.extra_path_parts);
                builder.write_status(outcome.status);
                for (name, value) in &outcome.headers {
                    builder.write_header(name, value);
                }
                for cookie in &outcome.cookies {
                    builder.write_cookie(cookie);
                }
                builder.write_body_and_content_length(&outcome.body);
            }
            None => {
                builder.write_status(404);
                builder.write_body_and_content_length(b"{}");
            }
        }

        if write_half.write_all(&builder.into_bytes()).await.is_err() {
            break;
        }
        connection_manager.touch(connection_id);

        if !request.keep_alive {
            break;
        }
    }

    let _ = write_half.shutdown().await;
    connection_manager.remove(connection_id);
}
