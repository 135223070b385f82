//! matchd — the MatchGrid daemon.
//!
//! Single binary that assembles all MatchGrid subsystems:
//! - State store (redb)
//! - Artifact store (engine, maps, team packages, replays)
//! - Scheduler + worker handles
//! - Worker listener (length-prefixed MessagePack over TCP)
//! - REST API
//! - Background map rescan
//!
//! # Usage
//!
//! ```text
//! matchd serve --listen 0.0.0.0:9000 --api-listen 0.0.0.0:8800 \
//!     --data-dir /var/lib/matchgrid
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::info;

use matchd::{background, listener};

#[derive(Parser)]
#[command(name = "matchd", about = "MatchGrid daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the scheduler daemon.
    Serve {
        /// Address for worker connections.
        #[arg(long, default_value = "0.0.0.0:9000")]
        listen: SocketAddr,

        /// Address for the REST API.
        #[arg(long, default_value = "0.0.0.0:8800")]
        api_listen: SocketAddr,

        /// Data directory for persistent state.
        #[arg(long, default_value = "/var/lib/matchgrid")]
        data_dir: PathBuf,

        /// Artifact root (defaults to <data-dir>/artifacts).
        #[arg(long)]
        artifact_dir: Option<PathBuf>,

        /// Map rescan interval in seconds.
        #[arg(long, default_value = "10")]
        rescan_interval: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,matchd=debug,matchgrid=debug".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            listen,
            api_listen,
            data_dir,
            artifact_dir,
            rescan_interval,
        } => {
            run_serve(
                listen,
                api_listen,
                data_dir,
                artifact_dir,
                rescan_interval,
            )
            .await
        }
    }
}

async fn run_serve(
    listen: SocketAddr,
    api_listen: SocketAddr,
    data_dir: PathBuf,
    artifact_dir: Option<PathBuf>,
    rescan_interval: u64,
) -> anyhow::Result<()> {
    info!("MatchGrid daemon starting");

    std::fs::create_dir_all(&data_dir)?;
    let artifact_dir = artifact_dir.unwrap_or_else(|| data_dir.join("artifacts"));

    // ── Initialize subsystems ──────────────────────────────────

    let state = matchgrid_state::StateStore::open(&data_dir.join("matchgrid.redb"))?;
    info!(path = ?data_dir, "state store opened");

    let artifacts = matchgrid_artifacts::ArtifactStore::open(&artifact_dir)?;
    info!(path = ?artifact_dir, "artifact store opened");

    let bus = matchgrid_notify::NotificationBus::default();

    let scheduler = Arc::new(matchgrid_scheduler::Scheduler::new(
        state.clone(),
        artifacts,
        bus,
    ));
    info!("scheduler initialized");

    // Catch up on maps added while we were down, then resume the run
    // queue. A run left RUNNING by a previous process stays active; its
    // RUNNING matches are re-sent through the redundancy pass as
    // workers reconnect.
    scheduler.rescan_maps()?;
    scheduler.try_start_next_run()?;

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Start background tasks ─────────────────────────────────

    let rescan_handle = tokio::spawn(background::run_map_rescan(
        scheduler.clone(),
        Duration::from_secs(rescan_interval),
        shutdown_rx.clone(),
    ));

    let worker_listener = tokio::net::TcpListener::bind(listen).await?;
    info!(%listen, "worker listener started");
    let listener_handle = tokio::spawn(listener::run_worker_listener(
        scheduler.clone(),
        worker_listener,
        shutdown_rx.clone(),
    ));

    // ── Start API server ───────────────────────────────────────

    let router = matchgrid_api::build_router(scheduler, state);
    let api_listener = tokio::net::TcpListener::bind(api_listen).await?;
    info!(%api_listen, "API server starting");

    let server = axum::serve(api_listener, router).with_graceful_shutdown(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C handler");
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    server.await?;

    let _ = rescan_handle.await;
    let _ = listener_handle.await;

    info!("MatchGrid daemon stopped");
    Ok(())
}
