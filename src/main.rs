use std::sync::Arc;

use axum::Router;
use minio_store::core::config::Config;
use minio_store::core::middleware;
use minio_store::features::files::routes as files_routes;
use minio_store::modules::storage::{MinioBackend, MinioConfig, MinioStore};
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    let worker_threads = std::env::var("TOKIO_WORKER_THREADS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|p| p.get())
                .unwrap_or(4)
        });

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

async fn async_main() -> anyhow::Result<()> {
    // Load .env file BEFORE initializing logger so RUST_LOG is available
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;
    tracing::info!("Configuration loaded successfully");

    // Environment overrides are applied here; a bad useSSL value stops startup
    let storage_config = MinioConfig::from_env(&config.storage.options)?;
    tracing::debug!("Resolved storage configuration: {:?}", storage_config);

    let backend = Arc::new(MinioBackend::new(&storage_config)?);
    if config.storage.ensure_bucket {
        backend
            .ensure_bucket_exists()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to ensure bucket exists: {}", e))?;
    }

    let store = Arc::new(MinioStore::with_backend(storage_config, backend));

    async fn health_check() -> axum::http::StatusCode {
        axum::http::StatusCode::OK
    }

    let app = Router::new()
        .merge(files_routes(
            Arc::clone(&store),
            config.app.max_request_body_size,
            config.app.upload_spool_dir.clone(),
        ))
        .route("/health", axum::routing::get(health_check))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(middleware::MakeSpanWithRequestId)
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SetRequestIdLayer::x_request_id(middleware::MakeRequestUuid));

    let addr = config.app.server_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
