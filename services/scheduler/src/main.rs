//! Dockyard scheduler
//!
//! Assigns build and run requests to the least-loaded dock. Dock load lives
//! in the shared store and is kept current from lifecycle events.

use std::sync::Arc;

use anyhow::Result;
use dockyard_scheduler::{
    api,
    cluster::{ConsulMembership, DockerEvictor},
    config::{Config, StoreKind},
    ingest::{EventIngestion, WorkloadClassifier},
    jobs::{JobQueue, JobWorker},
    registry::DockRegistry,
    scheduler::{AdmissionQueue, HostSelector},
    state::AppState,
    store::{KvStore, MemoryStore, RedisStore},
};
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Prefer RUST_LOG, fall back to DOCKYARD_LOG_LEVEL
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_level.clone().into()))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting dockyard scheduler");
    info!(
        listen_addr = %config.listen_addr,
        store = ?config.store,
        index_key = %config.index_key,
        prev_dock_override = config.prev_dock_override,
        "Configuration loaded"
    );

    let store: Arc<dyn KvStore> = match config.store {
        StoreKind::Redis => match RedisStore::connect(&config.redis_url).await {
            Ok(store) => {
                info!("Shared store connection established");
                Arc::new(store)
            }
            Err(e) => {
                error!(error = %e, "Failed to connect to shared store");
                return Err(e.into());
            }
        },
        StoreKind::Memory => {
            warn!("Using in-memory store; dock state is not shared and is lost on exit");
            Arc::new(MemoryStore::new())
        }
    };

    let registry = DockRegistry::new(store, config.index_key.clone());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Selection runs on a single admission worker
    let selector = HostSelector::new(registry.clone(), config.weights)
        .with_prev_dock_override(config.prev_dock_override);
    let (admission, admission_handle) = AdmissionQueue::spawn(selector, shutdown_rx.clone());

    // Event ingestion and its job worker
    let http = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(10))
        .build()?;
    let (jobs, job_rx) = JobQueue::channel();
    let ingestion = Arc::new(EventIngestion::new(
        registry.clone(),
        WorkloadClassifier::new(config.image_builder.clone(), config.registry.clone()),
        Arc::new(DockerEvictor::new(http.clone())),
        Arc::new(
            ConsulMembership::new(http, config.consul_url.clone())
                .with_nodes_prefix(config.swarm_nodes_prefix.clone()),
        ),
        Arc::new(jobs.clone()),
    ));
    let job_worker = JobWorker::new(ingestion.clone(), jobs, job_rx, config.retry);
    let job_handle = tokio::spawn(job_worker.run(shutdown_rx.clone()));

    let state = AppState::new(registry, admission, ingestion);
    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!(addr = %config.listen_addr, "Listening for connections");

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let mut shutdown_rx = shutdown_rx;
                loop {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                    if shutdown_rx.changed().await.is_err() {
                        break;
                    }
                }
                info!("HTTP server shutting down");
            })
            .await
    });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
        result = server_handle => {
            match result {
                Ok(Ok(())) => info!("Server exited normally"),
                Ok(Err(e)) => error!(error = %e, "Server error"),
                Err(e) => error!(error = %e, "Server task panicked"),
            }
        }
    }

    let _ = shutdown_tx.send(true);

    info!("Waiting for workers to shut down...");
    let shutdown_timeout = std::time::Duration::from_secs(10);

    if let Err(e) = tokio::time::timeout(shutdown_timeout, admission_handle).await {
        warn!(error = %e, "Admission worker did not shut down in time");
    }

    if let Err(e) = tokio::time::timeout(shutdown_timeout, job_handle).await {
        warn!(error = %e, "Job worker did not shut down in time");
    }

    info!("Dockyard scheduler shutdown complete");
    Ok(())
}
