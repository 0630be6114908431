use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use storage::DatabaseOptions;

/// Requests allowed per caller per rolling minute, by route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimits {
    pub create: u32,
    pub list: u32,
    pub fetch: u32,
    pub delete: u32,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            create: 10,
            list: 30,
            fetch: 30,
            delete: 20,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_acquire_timeout: Duration,
    pub rate_limits: RateLimits,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let defaults = RateLimits::default();

        Ok(Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env_or("PORT", 8000)?,
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://data/workouts.db".to_string()),
            db_max_connections: env_or("DB_MAX_CONNECTIONS", 5)?,
            db_acquire_timeout: Duration::from_secs(env_or("DB_ACQUIRE_TIMEOUT_SECS", 5)?),
            rate_limits: RateLimits {
                create: env_or("RATE_LIMIT_CREATE_PER_MINUTE", defaults.create)?,
                list: env_or("RATE_LIMIT_LIST_PER_MINUTE", defaults.list)?,
                fetch: env_or("RATE_LIMIT_FETCH_PER_MINUTE", defaults.fetch)?,
                delete: env_or("RATE_LIMIT_DELETE_PER_MINUTE", defaults.delete)?,
            },
        })
    }

    pub fn database_options(&self) -> DatabaseOptions {
        DatabaseOptions {
            max_connections: self.db_max_connections,
            acquire_timeout: self.db_acquire_timeout,
        }
    }

    /// Create the directory holding the SQLite file, if the URL names one.
    pub fn ensure_database_dir(&self) -> Result<()> {
        if let Some(parent) = sqlite_file_path(&self.database_url).and_then(|p| p.parent()) {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Cannot create database directory {}", parent.display())
                })?;
            }
        }
        Ok(())
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} must be a number, got '{raw}'")),
        Err(_) => Ok(default),
    }
}

fn sqlite_file_path(url: &str) -> Option<&Path> {
    let rest = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or(rest);

    if path.is_empty() || path == ":memory:" {
        None
    } else {
        Some(Path::new(path))
    }
}
