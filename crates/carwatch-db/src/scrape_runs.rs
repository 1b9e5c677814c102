//! Database operations for `scrape_runs`.

use carwatch_core::RunSummary;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `scrape_runs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ScrapeRunRow {
    pub id: i64,
    pub public_id: Uuid,
    /// `"cli"` or `"scheduler"`.
    pub trigger_source: String,
    pub status: String,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub with_phone: i32,
    pub without_phone: i32,
    pub errors: i32,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

const RUN_COLUMNS: &str = "id, public_id, trigger_source, status, started_at, completed_at, \
                           with_phone, without_phone, errors, error_message, created_at";

/// Creates a new scrape run in `queued` status.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert or fetch fails.
pub async fn create_scrape_run(
    pool: &PgPool,
    trigger_source: &str,
) -> Result<ScrapeRunRow, DbError> {
    let public_id = Uuid::new_v4();

    let row = sqlx::query_as::<_, ScrapeRunRow>(&format!(
        "INSERT INTO scrape_runs (public_id, trigger_source, status) \
         VALUES ($1, $2, 'queued') \
         RETURNING {RUN_COLUMNS}"
    ))
    .bind(public_id)
    .bind(trigger_source)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Marks a run as `running` and sets `started_at = NOW()`.
///
/// # Errors
///
/// Returns [`DbError::InvalidRunTransition`] if the run is not `queued`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn start_scrape_run(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE scrape_runs \
         SET status = 'running', started_at = NOW() \
         WHERE id = $1 AND status = 'queued'",
    )
    .bind(id)
    .execute(pool)
    .await?;

    expect_transition(result.rows_affected(), id, "queued")
}

/// Marks a run as `succeeded` and stores its counters.
///
/// # Errors
///
/// Returns [`DbError::InvalidRunTransition`] if the run is not `running`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn complete_scrape_run(
    pool: &PgPool,
    id: i64,
    summary: &RunSummary,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE scrape_runs \
         SET status = 'succeeded', completed_at = NOW(), \
             with_phone = $1, without_phone = $2, errors = $3 \
         WHERE id = $4 AND status = 'running'",
    )
    .bind(clamp_counter(summary.with_phone))
    .bind(clamp_counter(summary.without_phone))
    .bind(clamp_counter(summary.errors))
    .bind(id)
    .execute(pool)
    .await?;

    expect_transition(result.rows_affected(), id, "running")
}

/// Marks a run as `failed`, sets `completed_at = NOW()` and `error_message`.
///
/// # Errors
///
/// Returns [`DbError::InvalidRunTransition`] if the run is not `running`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn fail_scrape_run(pool: &PgPool, id: i64, error_message: &str) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE scrape_runs \
         SET status = 'failed', completed_at = NOW(), error_message = $1 \
         WHERE id = $2 AND status = 'running'",
    )
    .bind(error_message)
    .bind(id)
    .execute(pool)
    .await?;

    expect_transition(result.rows_affected(), id, "running")
}

/// Fetches a single run by its internal `id`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given `id`, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_scrape_run(pool: &PgPool, id: i64) -> Result<ScrapeRunRow, DbError> {
    let row = sqlx::query_as::<_, ScrapeRunRow>(&format!(
        "SELECT {RUN_COLUMNS} FROM scrape_runs WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Returns the most recent `limit` runs, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_scrape_runs(pool: &PgPool, limit: i64) -> Result<Vec<ScrapeRunRow>, DbError> {
    let rows = sqlx::query_as::<_, ScrapeRunRow>(&format!(
        "SELECT {RUN_COLUMNS} FROM scrape_runs \
         ORDER BY created_at DESC, id DESC \
         LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// A guarded `UPDATE ... WHERE status = <expected>` that touched no row means
/// the run was missing or in another state.
fn expect_transition(
    rows_affected: u64,
    id: i64,
    expected_status: &'static str,
) -> Result<(), DbError> {
    if rows_affected == 0 {
        Err(DbError::InvalidRunTransition {
            id,
            expected_status,
        })
    } else {
        Ok(())
    }
}

fn clamp_counter(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}
