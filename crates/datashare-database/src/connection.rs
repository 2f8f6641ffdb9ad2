//! PostgreSQL connection pool for the share store.

use std::str::FromStr;
use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};
use tracing::{debug, info};

use datashare_core::config::DatabaseConfig;
use datashare_core::error::{AppError, ErrorKind};

/// Shared handle on the store's connection pool.
#[derive(Debug, Clone)]
pub struct DatabasePool {
    pool: PgPool,
}

/// Parse a connection URL. Credentials never leave the returned options.
fn connect_options(url: &str) -> Result<PgConnectOptions, AppError> {
    PgConnectOptions::from_str(url)
        .map_err(|e| AppError::with_source(ErrorKind::Configuration, "Invalid database URL", e))
}

impl DatabasePool {
    /// Open the pool described by the database settings.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, AppError> {
        let options = connect_options(&config.url)?;
        info!(
            host = options.get_host(),
            port = options.get_port(),
            database = options.get_database().unwrap_or_default(),
            max_connections = config.max_connections,
            "Opening share store pool"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
            .connect_with(options)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Share store is unreachable", e))?;

        Ok(Self { pool })
    }

    /// The underlying sqlx pool, for migrations.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Begin the transaction backing one share session.
    pub async fn begin(&self) -> Result<Transaction<'static, Postgres>, AppError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to begin share session", e))?;
        debug!("Share session opened");
        Ok(tx)
    }

    /// Wait for in-flight sessions and close every connection.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Share store pool closed");
    }
}
