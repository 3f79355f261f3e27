//! tuneline-api - playlist tag metadata service
//!
//! Fetches a playlist of remote audio URLs and answers with the title,
//! artist, album, year and cover art of every track, reading only the tag
//! portion of each file.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tuneline_common::config::TomlConfig;

use tuneline_api::cache::open_cache;
use tuneline_api::extractors::ExtractorRegistry;
use tuneline_api::services::{AudioSource, HttpSource, PlaylistResolver, StreamingTagResolver};
use tuneline_api::AppState;

/// Command-line arguments for tuneline-api
#[derive(Parser, Debug)]
#[command(name = "tuneline-api")]
#[command(about = "Playlist tag metadata service")]
#[command(version)]
struct Args {
    /// Config file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config and TUNELINE_PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Address to bind
    #[arg(short, long)]
    bind: Option<String>,

    /// Log level when RUST_LOG is not set
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = TomlConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(bind) = args.bind {
        config.bind_address = bind;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{},tower_http=info", config.logging.level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting tuneline-api v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE"),
    );
    info!(
        "Fetch: chunk_size={} max_concurrent_tracks={} invalid_art={:?}",
        config.fetch.chunk_size, config.fetch.max_concurrent_tracks, config.fetch.invalid_art
    );

    let source: Arc<dyn AudioSource> =
        Arc::new(HttpSource::from_config(&config.fetch).context("Failed to build HTTP client")?);
    let registry = Arc::new(ExtractorRegistry::with_defaults(config.fetch.invalid_art));
    info!("Registered {} tag extractors", registry.len());

    let tag_resolver = StreamingTagResolver::new(Arc::clone(&source), registry, config.fetch.chunk_size);
    let cache = open_cache(&config.cache).await;
    let playlists = PlaylistResolver::new(source, tag_resolver, cache, config.fetch.max_concurrent_tracks);

    let state = AppState::new(playlists, config.cache.cache_playlists);
    let app = tuneline_api::build_router(state);

    let addr = config.socket_addr().context("Invalid listening address")?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
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
                tracing::error!("Failed to install terminate handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received terminate signal, shutting down"),
    }
}
