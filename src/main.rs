//! DataShare server: runs the share processing worker against PostgreSQL.

use std::sync::Arc;

use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, fmt};

use datashare_cloud::{CloudProviders, InMemoryCloudAccount};
use datashare_core::config::{AppConfig, CloudBackend, SharingConfig};
use datashare_core::error::AppError;
use datashare_database::{DatabasePool, PgShareStore, ShareStore};
use datashare_service::ShareProcessorDispatcher;
use datashare_worker::WorkerRunner;
use datashare_worker::handlers::default_executor;

#[tokio::main]
async fn main() {
    let env = std::env::var("DATASHARE_ENV").unwrap_or_else(|_| "development".to_string());
    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);
    tracing::info!(env = %env, "Configuration loaded");

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// Initialize tracing. `RUST_LOG` overrides the configured level.
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting DataShare");

    // ── Database ─────────────────────────────────────────────────
    let db_pool = DatabasePool::connect(&config.database).await?;
    if config.database.run_migrations {
        datashare_database::migration::run_migrations(db_pool.pool()).await?;
        tracing::info!("Database migrations complete");
    }
    let store: Arc<dyn ShareStore> = Arc::new(PgShareStore::new(db_pool.clone()));

    // ── Cloud access ─────────────────────────────────────────────
    let cloud = build_cloud_providers(&config.sharing).await?;

    // ── Worker ───────────────────────────────────────────────────
    if !config.worker.enabled {
        tracing::info!("Background worker disabled, nothing to run");
        db_pool.close().await;
        return Ok(());
    }

    let dispatcher = ShareProcessorDispatcher::new(Arc::clone(&store), &cloud, &config.sharing);
    let executor = default_executor(Arc::clone(&store), dispatcher, &cloud);
    let runner = WorkerRunner::new(store, Arc::new(executor), config.worker.clone());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(async move {
        runner.run(shutdown_rx).await;
    });
    tracing::info!(worker_id = %config.worker.worker_id, "Background worker started");

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");

    let _ = shutdown_tx.send(true);
    if let Err(e) = handle.await {
        tracing::error!(error = %e, "Worker task panicked");
    }

    db_pool.close().await;
    tracing::info!("DataShare stopped");
    Ok(())
}

async fn build_cloud_providers(sharing: &SharingConfig) -> Result<CloudProviders, AppError> {
    match sharing.backend {
        CloudBackend::Memory => {
            tracing::warn!("Using the in-memory cloud account; no real access is granted");
            Ok(InMemoryCloudAccount::new().providers())
        }
        #[cfg(feature = "aws")]
        CloudBackend::Aws => Ok(datashare_cloud::aws::providers(sharing.aws_region.clone()).await),
        #[cfg(not(feature = "aws"))]
        CloudBackend::Aws => Err(AppError::configuration(
            "The aws sharing backend requires building with the `aws` feature",
        )),
    }
}
