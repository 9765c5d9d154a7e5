use anyhow::Context;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use vup_tracker::config::loader::ConfigLoader;
use vup_tracker::observability::{
    Metrics, ObservabilityState, create_observability_router, init_tracing,
};
use vup_tracker::services::{CacheKeys, Reconciler, Scheduler};
use vup_tracker::storage::StorageFactory;
use vup_tracker::upstream::HttpLiveSource;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ConfigLoader::load().context("failed to load configuration")?;
    ConfigLoader::validate(&config).context("invalid configuration")?;

    let _log_guard = init_tracing("vup_tracker", &config.logging);
    info!(
        app = %config.app_name,
        environment = %config.environment,
        "Starting vup-tracker {}",
        env!("CARGO_PKG_VERSION")
    );

    let repository = StorageFactory::create_repository(&config.database).await?;
    info!(backend = ?config.database.db_type, "Persona store initialized");

    let cache = StorageFactory::create_cache(&config.cache).await?;
    info!(backend = ?config.cache.cache_type, "Persona cache initialized");

    let source = Arc::new(HttpLiveSource::new(&config.upstream)?);
    let metrics = Arc::new(Metrics::new().context("failed to register metrics")?);

    let reconciler = Arc::new(Reconciler::new(
        source,
        repository,
        cache,
        CacheKeys::from(&config.cache),
        &config.discovery,
        metrics.clone(),
    ));

    let observability = Arc::new(ObservabilityState::new(
        env!("CARGO_PKG_VERSION").to_string(),
        metrics,
        reconciler.snapshot(),
    ));

    let cancel = CancellationToken::new();
    let scheduler = Arc::new(
        Scheduler::new(reconciler, &config.discovery, cancel.clone())
            .with_observability(observability.clone()),
    );

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Observability endpoints listening on {}", addr);

    let server = tokio::spawn({
        let router = create_observability_router(observability);
        let cancel = cancel.clone();
        async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move { cancel.cancelled().await })
                .await
        }
    });

    let ticker = tokio::spawn({
        let scheduler = scheduler.clone();
        async move { scheduler.run().await }
    });

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("Shutdown signal received, cancelling jobs");
    cancel.cancel();

    if let Err(e) = ticker.await {
        error!("Scheduler task panicked: {}", e);
    }
    scheduler.shutdown().await;

    match server.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!("Observability server error: {}", e),
        Err(e) => error!("Observability server task panicked: {}", e),
    }

    info!("vup-tracker stopped");
    Ok(())
}
