use std::{sync::Arc, time::Duration};

use anyhow::Context;
use mediagrab::{
    DownloadService, YtDlpExtractor,
    config::{AppConfig, STALE_JOB_SECONDS},
    http::{build_cors_layer, router},
    workspace::cleanup_stale_jobs,
};
use tokio::net::TcpListener;
use tracing::{info, warn};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "mediagrab=info,tower_http=info".to_string()),
        )
        .init();

    if let Err(error) = run().await {
        eprintln!("Server error: {error:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = AppConfig::from_env();

    tokio::fs::create_dir_all(&config.transfer_dir)
        .await
        .with_context(|| format!("could not create transfer directory {:?}", config.transfer_dir))?;
    cleanup_stale_jobs(&config.transfer_dir, Duration::from_secs(STALE_JOB_SECONDS)).await;

    let extractor = YtDlpExtractor::new(&config.yt_dlp_bin, config.yt_dlp_timeout);
    if extractor.probe().await.is_none() {
        warn!("yt-dlp is not usable yet. Downloads will fail until it is installed.");
    }
    if config.yt_dlp_timeout.is_none() {
        warn!("YT_DLP_TIMEOUT_SECONDS=0: engine runs are not time-limited.");
    }

    let service = DownloadService::new(Arc::new(extractor), &config.transfer_dir)
        .with_max_download_bytes(config.max_download_bytes)
        .with_max_concurrent_downloads(config.max_concurrent_downloads);

    let cors = build_cors_layer(&config.allowed_origins)?;
    let app = router(service).layer(cors);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("could not bind {}", config.bind_addr))?;

    info!("Server ready on http://{}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!("Could not listen for shutdown signal: {error}");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
