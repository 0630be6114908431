use std::str::FromStr;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

pub mod dto;
pub mod error;
pub mod migrator;
pub mod models;
pub mod repository;
pub mod validation;

use crate::error::Result;
use crate::migrator::MigrationReport;

/// Connection settings for the workout store.
#[derive(Debug, Clone)]
pub struct DatabaseOptions {
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

/// Shared handle to the SQLite pool backing the workout table.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn with_options(database_url: &str, options: &DatabaseOptions) -> Result<Self> {
        let connect = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .busy_timeout(options.acquire_timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(options.max_connections)
            .acquire_timeout(options.acquire_timeout)
            .connect_with(connect)
            .await?;

        Ok(Self { pool })
    }

    /// Private in-memory store on a single long-lived connection.
    ///
    /// Every SQLite `:memory:` connection is its own database, so the pool is
    /// pinned to exactly one connection that never expires.
    pub async fn in_memory() -> Result<Self> {
        let connect = SqliteConnectOptions::from_str("sqlite::memory:")?;

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(connect)
            .await?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Brings the workout table up to the current schema.
    pub async fn run_migrations(&self) -> Result<MigrationReport> {
        migrator::migrate(&self.pool).await
    }
}
