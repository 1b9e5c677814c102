use std::collections::HashSet;
use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, PgPool};
use thiserror::Error;

pub mod listings;
pub mod scrape_runs;

pub use listings::{get_listing_by_url, upsert_listing, ListingRow};
pub use scrape_runs::{
    complete_scrape_run, create_scrape_run, fail_scrape_run, get_scrape_run, list_scrape_runs,
    start_scrape_run, ScrapeRunRow,
};

// Relative to this crate's Cargo.toml.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

/// Postgres `undefined_table`.
const UNDEFINED_TABLE: &str = "42P01";

#[derive(Debug, Error)]
pub enum DbError {
    #[error("record not found")]
    NotFound,
    #[error("scrape run {id} is not in the expected '{expected_status}' state")]
    InvalidRunTransition {
        id: i64,
        expected_status: &'static str,
    },
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Connection pool sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(10),
        }
    }
}

impl PoolConfig {
    #[must_use]
    pub fn from_app_config(config: &carwatch_core::AppConfig) -> Self {
        Self {
            max_connections: config.db_max_connections,
            min_connections: config.db_min_connections,
            acquire_timeout: Duration::from_secs(config.db_acquire_timeout_secs),
        }
    }

    fn options(self) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .acquire_timeout(self.acquire_timeout)
    }
}

/// Opens a pool against `database_url`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if no connection can be established.
pub async fn connect_pool(database_url: &str, config: PoolConfig) -> Result<PgPool, DbError> {
    Ok(config.options().connect(database_url).await?)
}

/// Applies pending migrations and returns how many were applied.
///
/// # Errors
///
/// Returns [`DbError::Migration`] if a migration fails, or [`DbError::Sqlx`]
/// if the migration history cannot be read.
pub async fn run_migrations(pool: &PgPool) -> Result<usize, DbError> {
    let applied = applied_versions(pool).await?;
    let pending = MIGRATOR
        .iter()
        .filter(|m| !applied.contains(&m.version))
        .count();

    MIGRATOR.run(pool).await?;
    Ok(pending)
}

async fn applied_versions(pool: &PgPool) -> Result<HashSet<i64>, DbError> {
    let versions =
        sqlx::query_scalar::<_, i64>("SELECT version FROM _sqlx_migrations WHERE success")
            .fetch_all(pool)
            .await;

    match versions {
        Ok(versions) => Ok(versions.into_iter().collect()),
        // Fresh database: no history table yet.
        Err(sqlx::Error::Database(e)) if e.code().as_deref() == Some(UNDEFINED_TABLE) => {
            Ok(HashSet::new())
        }
        Err(e) => Err(e.into()),
    }
}

/// Round-trips `SELECT 1` through the pool.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn ping(pool: &PgPool) -> Result<(), DbError> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_pool_config_matches_env_defaults() {
        let config = PoolConfig::default();

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 1);
        assert_eq!(config.acquire_timeout, Duration::from_secs(10));
    }

    #[test]
    fn embedded_migrations_are_present() {
        assert!(MIGRATOR.iter().count() >= 2);
    }
}
