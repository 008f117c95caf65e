//! TCP accept loop and graceful shutdown (spec §4.6, §5 "Graceful stop: the
//! listener stops accepting, the I/O pool drains, the timeout tick fires
//! once more, then worker threads join").

use super::buffers::BufferPool;
use super::connection::handle_connection;
use super::router::Router;
use super::timeout::ConnectionManager;
use super::Handler;
use crate::config::Config;
use arc_swap::ArcSwap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;

/// Binds and serves until `shutdown` is signalled. Returns once the accept
/// loop has stopped and one final timeout sweep has run.
pub async fn serve(listen_addr: SocketAddr, router: Arc<Router<Handler>>, config: Arc<ArcSwap<Config>>, mut shutdown: watch::Receiver<bool>) -> std::io::Result<()> {
    let listener = TcpListener::bind(listen_addr).await?;
    tracing::info!(%listen_addr, "http listener bound");

    let cfg = config.load();
    let header_pool = BufferPool::new(cfg.service.number_of_read_buffers, 8 * 1024);
    let connection_manager = Arc::new(ConnectionManager::new(Duration::from_secs(cfg.service.connection_timeout_seconds)));
    drop(cfg);

    let sweep_manager = connection_manager.clone();
    let mut sweep_shutdown = shutdown.clone();
    let sweeper = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(1));
        loop {
            tokio::select! {
                _ = ticker.tick() => sweep_manager.sweep_expired(),
                _ = sweep_shutdown.changed() => break,
            }
        }
        sweep_manager.sweep_expired();
    });

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer_addr) = match accepted {
                    Ok(pair) => pair,
                    Err(err) => {
                        tracing::warn!(%err, "failed to accept connection");
                        continue;
                    }
                };
                spawn_connection(stream, peer_addr, router.clone(), header_pool.clone(), config.clone(), connection_manager.clone());
            }
            _ = shutdown.changed() => {
                tracing::info!("http listener draining");
                break;
            }
        }
    }

    let _ = sweeper.await;
    Ok(())
}

fn spawn_connection(
    stream: tokio::net::TcpStream,
    peer_addr: SocketAddr,
    router: Arc<Router<Handler>>,
    header_pool: BufferPool,
    config: Arc<ArcSwap<Config>>,
    connection_manager: Arc<ConnectionManager>,
) {
    let (id_tx, id_rx) = tokio::sync::oneshot::channel();
    let cm = connection_manager.clone();
    let join = tokio::spawn(async move {
        let Ok(connection_id) = id_rx.await else { return };
        handle_connection(stream, peer_addr, router, header_pool, config, cm, connection_id).await;
    });
    let connection_id = connection_manager.register(join.abort_handle());
    let _ = id_tx.send(connection_id);
}
