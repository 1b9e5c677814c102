//! Daily scrape and dump jobs.
//!
//! Both jobs fire at a wall-clock time in the configured timezone. A job that
//! fails logs the error and waits for the next day.

use std::sync::Arc;

use anyhow::Context;
use carwatch_core::AppConfig;
use carwatch_scraper::{ExtractionPatterns, PatternConfig};
use chrono_tz::Tz;
use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::{collect, dump};

/// Builds and starts the scheduler.
///
/// The returned handle must stay alive for the lifetime of the process.
///
/// # Errors
///
/// Returns an error if the timezone or extraction patterns are invalid, or
/// if a job cannot be registered.
pub(crate) async fn build_scheduler(
    pool: PgPool,
    config: Arc<AppConfig>,
) -> anyhow::Result<JobScheduler> {
    let tz = parse_timezone(&config.timezone)?;
    // Fail at startup rather than at the first firing.
    ExtractionPatterns::compile(&PatternConfig::from_app_config(&config))?;

    let scheduler = JobScheduler::new().await?;
    register_scrape_job(&scheduler, pool, Arc::clone(&config), tz).await?;
    register_dump_job(&scheduler, config, tz).await?;
    scheduler.start().await?;

    Ok(scheduler)
}

fn parse_timezone(name: &str) -> anyhow::Result<Tz> {
    name.parse::<Tz>()
        .map_err(|e| anyhow::anyhow!("{e}"))
        .with_context(|| format!("invalid timezone '{name}'"))
}

async fn register_scrape_job(
    scheduler: &JobScheduler,
    pool: PgPool,
    config: Arc<AppConfig>,
    tz: Tz,
) -> anyhow::Result<()> {
    let cron = config.scrape_time.daily_cron();
    let pool = Arc::new(pool);
    let job_config = Arc::clone(&config);

    let job = Job::new_async_tz(cron.as_str(), tz, move |_uuid, _lock| {
        let pool = Arc::clone(&pool);
        let config = Arc::clone(&job_config);

        Box::pin(async move {
            tracing::info!("scheduler: starting daily scrape");
            match collect::run_scrape(&pool, &config, config.max_pages, "scheduler").await {
                Ok(summary) => tracing::info!(%summary, "scheduler: daily scrape complete"),
                Err(e) => tracing::error!(error = %e, "scheduler: daily scrape failed"),
            }
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron = %cron, timezone = %tz, "scheduler: registered scrape job");
    Ok(())
}

async fn register_dump_job(
    scheduler: &JobScheduler,
    config: Arc<AppConfig>,
    tz: Tz,
) -> anyhow::Result<()> {
    let cron = config.dump_time.daily_cron();

    let job = Job::new_async_tz(cron.as_str(), tz, move |_uuid, _lock| {
        let config = Arc::clone(&config);

        Box::pin(async move {
            match dump::dump_database(&config).await {
                Ok(path) => tracing::info!(path = %path.display(), "scheduler: dump written"),
                Err(e) => tracing::error!(error = %e, "scheduler: dump failed"),
            }
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron = %cron, timezone = %tz, "scheduler: registered dump job");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_timezone_accepts_iana_names() {
        let tz = parse_timezone("Europe/Kyiv").expect("known timezone");
        assert_eq!(tz, chrono_tz::Europe::Kyiv);
    }

    #[test]
    fn parse_timezone_rejects_unknown_names() {
        let err = parse_timezone("Mars/Olympus").expect_err("unknown timezone");
        assert!(err.to_string().contains("Mars/Olympus"));
    }
}
