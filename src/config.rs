//! Driver configuration and selection.

use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

use crate::driver::Driver;
use crate::error::{Error, Result};

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Backend name: `sqlite` or `postgres`.
    pub backend: String,
    /// Connection URL passed to the backend's pool.
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: "sqlite".into(),
            url: "sqlite::memory:".into(),
            max_connections: 5,
        }
    }
}

/// Initialize a driver based on configuration.
pub async fn init_driver(config: &DatabaseConfig) -> Result<Arc<dyn Driver>> {
    info!("database: {} at {}", config.backend, config.url);

    match config.backend.as_str() {
        #[cfg(feature = "sqlite")]
        "sqlite" => {
            let pool = sqlx::sqlite::SqlitePoolOptions::new()
                .max_connections(config.max_connections)
                .connect(&config.url)
                .await
                .map_err(crate::driver::sql::driver_error)?;
            Ok(Arc::new(crate::driver::SqliteDriver::new(pool)))
        }
        #[cfg(not(feature = "sqlite"))]
        "sqlite" => Err(Error::Config(
            "sqlite backend requested but the 'sqlite' feature is not enabled".into(),
        )),
        #[cfg(feature = "postgres")]
        "postgres" => {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(config.max_connections)
                .connect(&config.url)
                .await
                .map_err(crate::driver::sql::driver_error)?;
            Ok(Arc::new(crate::driver::PostgresDriver::new(pool)))
        }
        #[cfg(not(feature = "postgres"))]
        "postgres" => Err(Error::Config(
            "postgres backend requested but the 'postgres' feature is not enabled".into(),
        )),
        other => Err(Error::Config(format!("unknown database backend: {other}"))),
    }
}
