//! API server binary. Hosts the HTTP API and both worker pools in one process.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vidcraft_ai::{AiConfig, OllamaClient, StableDiffusionClient, TtsClient};
use vidcraft_api::{create_router, metrics, ApiConfig, AppState};
use vidcraft_media::FfmpegCompositor;
use vidcraft_queue::StatusStoreConfig;
use vidcraft_storage::{ArtifactStore, MemoryArtifactStore, S3Client};
use vidcraft_worker::{
    MemoryCatalog, NarrativeBackends, RenderCatalog, WorkerConfig, WorkerDeps, Workers,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // rustls 0.23+ needs an explicit process-wide provider
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("failed to install rustls crypto provider"))?;

    init_tracing()?;

    info!("Starting vidcraft-api");

    let config = ApiConfig::from_env();
    let worker_config = WorkerConfig::from_env();
    info!(
        host = %config.host,
        port = config.port,
        render_workers = worker_config.render_workers,
        narrative_workers = worker_config.narrative_workers,
        "Configuration loaded"
    );

    let deps = build_worker_deps(&config).await?;
    let workers = Workers::start(&worker_config, deps);

    let metrics_handle = if config.metrics_enabled {
        info!("Prometheus metrics enabled at /metrics");
        Some(metrics::init_metrics().context("failed to install Prometheus recorder")?)
    } else {
        None
    };

    let app = create_router(AppState::from_workers(config.clone(), &workers), metrics_handle);

    let addr: SocketAddr = config
        .bind_address()
        .parse()
        .with_context(|| format!("invalid bind address {}", config.bind_address()))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    workers.shutdown().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Pretty output for development, JSON when `LOG_FORMAT=json`.
fn init_tracing() -> anyhow::Result<()> {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env().add_directive("vidcraft=info".parse()?);

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .with(env_filter)
            .init();
    }
    Ok(())
}

async fn build_worker_deps(config: &ApiConfig) -> anyhow::Result<WorkerDeps> {
    let ai = AiConfig::from_env();
    let http = ai.http_client()?;
    info!(
        ollama = %ai.ollama_endpoint,
        model = %ai.ollama_model,
        sd = %ai.sd_endpoint,
        tts = %ai.tts_endpoint,
        "Generation backends configured"
    );
    let backends = NarrativeBackends {
        text: Arc::new(OllamaClient::new(http.clone(), &ai)),
        image: Arc::new(StableDiffusionClient::new(http.clone(), &ai)),
        speech: Arc::new(TtsClient::new(http, &ai)),
    };

    let store: Arc<dyn ArtifactStore> = match S3Client::from_env() {
        Ok(client) => {
            info!(bucket = client.bucket(), "Using S3 artifact store");
            Arc::new(client)
        }
        Err(e) => {
            warn!(error = %e, "S3 not configured, artifacts are kept in memory");
            Arc::new(MemoryArtifactStore::new())
        }
    };

    let status = StatusStoreConfig::from_env().build()?;

    if !vidcraft_media::tools_available() {
        warn!("ffmpeg/ffprobe not found on PATH, compositing jobs will fail");
    }

    let catalog = match &config.catalog_seed_path {
        Some(path) => {
            let catalog = MemoryCatalog::from_seed_file(path)
                .await
                .with_context(|| format!("failed to load catalog seed {}", path))?;
            info!(path = %path, "Catalog seeded");
            catalog
        }
        None => {
            warn!("CATALOG_SEED_PATH not set, starting with an empty catalog");
            MemoryCatalog::new()
        }
    };

    Ok(WorkerDeps {
        catalog: RenderCatalog::from_memory(Arc::new(catalog)),
        store,
        compositor: Arc::new(FfmpegCompositor::default()),
        status,
        backends,
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}
