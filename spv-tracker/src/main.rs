//! spv-tracker - Staff presence verification service
//!
//! Receives beacon sightings from classroom scanners, reconciles them into
//! attendance, runs the reminder and absence sweeps, and serves the
//! coverage and dashboard API.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use spv_common::config::{database_path, resolve_root_folder};
use spv_common::db::init_database;
use spv_common::EngineConfig;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use spv_tracker::clock::SystemClock;
use spv_tracker::scheduler::TokioScheduler;
use spv_tracker::sinks::LogEmailSink;
use spv_tracker::{build_router, AppState, Engine};

/// Command-line arguments for spv-tracker
#[derive(Parser, Debug)]
#[command(name = "spv-tracker")]
#[command(about = "Staff presence reconciliation and coverage service")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "5000", env = "SPV_PORT")]
    port: u16,

    /// Address to bind
    #[arg(short, long, default_value = "0.0.0.0")]
    bind: String,

    /// Folder holding spv.db
    #[arg(short, long, env = "SPV_ROOT_FOLDER")]
    root_folder: Option<String>,

    /// TOML configuration file
    #[arg(short, long, env = "SPV_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "spv_tracker=info,spv_common=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting SPV Tracker (spv-tracker) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();

    let config = EngineConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    info!(
        "Engine: rssi >= {} dBm, grace {} min, dwell {} min, {:?} confirmation",
        config.rssi_threshold, config.grace_minutes, config.dwell_minutes, config.confirmation_mode
    );

    let root_folder = resolve_root_folder(args.root_folder.as_deref(), "SPV_ROOT_FOLDER", args.config.as_deref());
    std::fs::create_dir_all(&root_folder)
        .with_context(|| format!("Failed to create root folder {}", root_folder.display()))?;
    let db_path = database_path(&root_folder);
    info!("Database path: {}", db_path.display());

    let pool = match init_database(&db_path).await {
        Ok(pool) => {
            info!("✓ Database ready");
            pool
        }
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            return Err(e.into());
        }
    };

    let engine = Arc::new(Engine::new(pool, config, Arc::new(SystemClock), Arc::new(LogEmailSink)));
    let scheduler = TokioScheduler::new();
    let sweeps = engine.start_sweeps(&scheduler);

    let app = build_router(AppState::new(engine));

    let addr: SocketAddr = format!("{}:{}", args.bind, args.port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", args.bind, args.port))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("spv-tracker listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    for sweep in sweeps {
        sweep.abort();
    }
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
