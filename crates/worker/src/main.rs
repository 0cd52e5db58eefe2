use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use flightlab_core::engine::EngineSupervisor;
use flightlab_pipeline::queue::{JobQueue, PgJobQueue, ANALYSIS_QUEUE};
use flightlab_pipeline::store::{JobStore, PgJobStore};
use flightlab_pipeline::JobProcessor;
use flightlab_worker::config::{WorkerConfig, DEFAULT_LOG_FILTER};
use flightlab_worker::pool::WorkerPool;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = WorkerConfig::from_env().unwrap_or_else(|e| {
        tracing::error!(error = %e, "Invalid worker configuration");
        std::process::exit(1);
    });
    tracing::info!(
        concurrency = config.concurrency,
        max_attempts = config.retry_policy.max_attempts(),
        engine = %config.engine.executable.display(),
        timeout_ms = config.engine.timeout.as_millis() as u64,
        pdf_enabled = config.engine.pdf_enabled,
        artifacts_root = %config.artifacts_root.display(),
        "Loaded worker configuration",
    );

    // --- Database ---
    let pool = flightlab_db::create_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    flightlab_db::health_check(&pool)
        .await
        .expect("Database health check failed");

    flightlab_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Pipeline ---
    let store: Arc<dyn JobStore> = Arc::new(PgJobStore::new(pool.clone()));
    let queue: Arc<dyn JobQueue> = Arc::new(PgJobQueue::new(
        pool.clone(),
        ANALYSIS_QUEUE,
        config.retry_policy,
        config.lease,
    ));
    let processor = Arc::new(JobProcessor::new(
        store,
        EngineSupervisor::new(config.engine.clone()),
        config.artifacts_root.clone(),
    ));

    // --- Worker pool ---
    let cancel = CancellationToken::new();
    let worker_pool = WorkerPool::new(processor, queue, config.concurrency, config.poll_interval);
    let pool_cancel = cancel.clone();
    let pool_handle = tokio::spawn(async move {
        worker_pool.run(pool_cancel).await;
    });

    shutdown_signal().await;
    cancel.cancel();
    if let Err(e) = pool_handle.await {
        tracing::error!(error = %e, "Worker pool task failed");
    }

    pool.close().await;
    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT or, on Unix, SIGTERM. In-flight jobs finish after this
/// returns; no new entries are claimed.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), finishing in-flight jobs");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, finishing in-flight jobs");
        }
    }
}
