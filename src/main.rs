//! Process entry point (spec §6.5 CLI, §5 concurrency/resource model):
//! loads configuration, replays the event log, wires the store to the
//! event log writer, and serves the HTTP pipeline until told to stop.

use clap::Parser;
use forum_core::config::Config;
use forum_core::endpoints::{self, EndpointContext};
use forum_core::entities::{Privilege, PrivilegeScope};
use forum_core::eventlog::{importer, EventLogWriter, MessagesFileAppender};
use forum_core::http;
use forum_core::store::Store;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "forum-core", version, about = "In-memory forum backend with an append-only event log")]
struct Cli {
    /// Path to the JSON configuration file (spec §6.4).
    #[arg(long, env = "FORUM_CONFIG_PATH")]
    config: PathBuf,
}

fn seed_default_privileges(store: &Store, config: &Config) {
    for (name, value) in &config.default_privileges {
        match Privilege::from_name(name) {
            Some(privilege) => store.change_required_privilege_direct(PrivilegeScope::ForumWide, privilege, *value),
            None => tracing::warn!(%name, "ignoring unknown privilege name in defaultPrivileges"),
        }
    }
}

fn run() -> Result<ExitCode, ExitCode> {
    let cli = Cli::parse();

    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let config = Config::load(&cli.config).map_err(|e| {
        tracing::error!(error = %e, "failed to load configuration");
        ExitCode::from(1)
    })?;

    let listen_addr: std::net::SocketAddr = format!("{}:{}", config.service.listen_ip_address, config.service.listen_port)
        .parse()
        .map_err(|e| {
            tracing::error!(error = %e, "invalid listen address in configuration");
            ExitCode::from(1)
        })?;

    let messages_file_path = PathBuf::from(&config.persistence.messages_file);
    let messages_file = Arc::new(MessagesFileAppender::open(&messages_file_path).map_err(|e| {
        tracing::error!(error = %e, "failed to open messages file");
        ExitCode::from(1)
    })?);

    let store = Store::new(config.clone()).with_messages_file(messages_file.clone());
    seed_default_privileges(&store, &config);

    let input_folder = Path::new(&config.persistence.input_folder);
    if input_folder.is_dir() {
        match importer::import_directory(&store, input_folder, config.persistence.validate_checksum, Some(&messages_file_path)) {
            Ok(summary) => tracing::info!(files = summary.files_replayed, records = summary.records_replayed, "replayed event log"),
            Err(e) => {
                tracing::error!(error = ?e, "event log import failed");
                return Err(ExitCode::from(2));
            }
        }
    } else {
        tracing::info!(folder = %input_folder.display(), "no event log input folder found, starting empty");
    }

    let writer = EventLogWriter::new(PathBuf::from(&config.persistence.output_folder), config.persistence.create_new_output_file_every_seconds).map_err(|e| {
        tracing::error!(error = %e, "failed to open event log output folder");
        ExitCode::from(1)
    })?;

    let store = Arc::new(store);
    store.add_observer(Arc::new(writer));

    let ctx = EndpointContext { store: store.clone(), sessions: Arc::new(endpoints::session::SessionStore::new()) };
    let router = Arc::new(endpoints::build_router(ctx));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.service.number_of_io_service_threads)
        .enable_all()
        .build()
        .map_err(|e| {
            tracing::error!(error = %e, "failed to start async runtime");
            ExitCode::from(1)
        })?;

    runtime.block_on(async move {
        let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

        tokio::spawn(async move {
            wait_for_shutdown_signal().await;
            tracing::info!("shutdown signal received, draining connections");
            let _ = shutdown_tx.send(true);
        });

        if let Err(e) = http::listener::serve(listen_addr, router, store.config.clone(), shutdown_rx).await {
            tracing::error!(error = %e, "http listener failed");
            return Err(ExitCode::from(1));
        }
        Ok(ExitCode::SUCCESS)
    })
}

async fn wait_for_shutdown_signal() {
    let ctrl_c = async { tokio::signal::ctrl_c().await.expect("failed to install ctrl-c handler") };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(code) => code,
    }
}
