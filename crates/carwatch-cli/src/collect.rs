//! One recorded scrape run against Postgres.

use carwatch_core::{AppConfig, ExtractedListing, RunSummary};
use carwatch_scraper::{DisabledRevealer, Harvester, ListingSink, PhoneRevealer};
use sqlx::PgPool;

/// Persists listings through [`carwatch_db::upsert_listing`].
pub(crate) struct PgSink<'a> {
    pool: &'a PgPool,
}

impl<'a> PgSink<'a> {
    pub(crate) fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }
}

impl ListingSink for PgSink<'_> {
    type Error = carwatch_db::DbError;

    async fn upsert(&self, url: &str, listing: &ExtractedListing) -> Result<(), Self::Error> {
        carwatch_db::upsert_listing(self.pool, url, listing).await?;
        Ok(())
    }
}

/// Runs one scrape pass and records it as a `scrape_runs` row.
///
/// `trigger` is stored as the run's trigger source (`"cli"` or `"scheduler"`).
///
/// # Errors
///
/// Returns an error if the harvester cannot be built, the run row cannot be
/// written, or discovery fails. A discovery failure marks the run `failed`.
pub(crate) async fn run_scrape(
    pool: &PgPool,
    config: &AppConfig,
    page_cap: Option<u32>,
    trigger: &str,
) -> anyhow::Result<RunSummary> {
    #[cfg(feature = "browser")]
    if config.browser_enabled {
        let settings = carwatch_scraper::ChromiumSettings::from_app_config(config);
        let revealer = carwatch_scraper::ChromiumRevealer::new(settings);
        return scrape_with(pool, config, page_cap, trigger, revealer).await;
    }

    #[cfg(not(feature = "browser"))]
    if config.browser_enabled {
        tracing::warn!("built without the browser feature; browser phone reveal disabled");
    }

    scrape_with(pool, config, page_cap, trigger, DisabledRevealer).await
}

async fn scrape_with<R: PhoneRevealer + Sync>(
    pool: &PgPool,
    config: &AppConfig,
    page_cap: Option<u32>,
    trigger: &str,
    revealer: R,
) -> anyhow::Result<RunSummary> {
    let harvester = Harvester::from_app_config(config, revealer)?;

    let run = carwatch_db::create_scrape_run(pool, trigger).await?;
    carwatch_db::start_scrape_run(pool, run.id).await?;
    tracing::info!(run_id = run.id, trigger, ?page_cap, "scrape run started");

    let sink = PgSink::new(pool);
    match harvester.run_once(&sink, page_cap).await {
        Ok(summary) => {
            carwatch_db::complete_scrape_run(pool, run.id, &summary).await?;
            tracing::info!(run_id = run.id, %summary, "scrape run recorded");
            Ok(summary)
        }
        Err(e) => {
            let message = e.to_string();
            if let Err(db_err) = carwatch_db::fail_scrape_run(pool, run.id, &message).await {
                tracing::error!(run_id = run.id, error = %db_err, "failed to mark scrape run failed");
            }
            Err(e.into())
        }
    }
}
