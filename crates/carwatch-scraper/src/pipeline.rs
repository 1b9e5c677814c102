//! One full scrape pass: discover, extract, resolve phones, persist.

use std::future::Future;
use std::panic::AssertUnwindSafe;

use carwatch_core::{AppConfig, ExtractedListing, ListingOutcome, RunSummary};
use futures::FutureExt;

use crate::discovery::ListingDiscovery;
use crate::error::ScraperError;
use crate::extract::extract_page;
use crate::fetch::PageFetcher;
use crate::patterns::{ExtractionPatterns, PatternConfig};
use crate::reveal::PhoneRevealer;
use crate::reveal_api::RevealEndpoint;

/// Destination for extracted listings, keyed by listing URL.
pub trait ListingSink: Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Inserts or fully overwrites the listing stored under `url`.
    fn upsert(
        &self,
        url: &str,
        listing: &ExtractedListing,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

/// Where a listing's phone number came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhoneSource {
    RevealEndpoint,
    Browser,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedListing {
    pub listing: ExtractedListing,
    pub phone_source: Option<PhoneSource>,
}

/// Drives discovery and per-listing processing against a [`ListingSink`].
pub struct Harvester<R> {
    fetcher: PageFetcher,
    discovery: ListingDiscovery,
    reveal_endpoint: RevealEndpoint,
    patterns: ExtractionPatterns,
    revealer: R,
}

impl<R: PhoneRevealer + Sync> Harvester<R> {
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidUrl`] if `base_url` or `search_path` do not form a URL.
    pub fn new(
        fetcher: PageFetcher,
        base_url: &str,
        search_path: &str,
        patterns: ExtractionPatterns,
        revealer: R,
    ) -> Result<Self, ScraperError> {
        let discovery = ListingDiscovery::new(base_url, search_path)?;
        let reveal_endpoint =
            RevealEndpoint::new(fetcher.client().clone(), base_url, fetcher.user_agent())?;
        Ok(Self {
            fetcher,
            discovery,
            reveal_endpoint,
            patterns,
            revealer,
        })
    }

    /// Builds a harvester from the application config.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidPattern`] for a bad pattern override, or
    /// any error from [`PageFetcher::from_app_config`] and [`Harvester::new`].
    pub fn from_app_config(config: &AppConfig, revealer: R) -> Result<Self, ScraperError> {
        let patterns = ExtractionPatterns::compile(&PatternConfig::from_app_config(config))?;
        let fetcher = PageFetcher::from_app_config(config)?;
        Self::new(
            fetcher,
            &config.base_url,
            &config.search_path,
            patterns,
            revealer,
        )
    }

    /// Fetches and extracts one listing, resolving its phone through the
    /// reveal endpoint first and the browser revealer second.
    ///
    /// # Errors
    ///
    /// Returns the fetch error when the listing page cannot be retrieved.
    pub async fn process_listing(&self, url: &str) -> Result<ProcessedListing, ScraperError> {
        let html = self.fetcher.fetch_html(url).await?;
        let extraction = extract_page(&html, &self.patterns);

        let mut listing = extraction.listing;
        let mut phone_source = None;

        if let Some(request) = extraction.phone_request {
            listing.phone_number = self.reveal_endpoint.reveal(url, request).await;
            if listing.has_phone() {
                phone_source = Some(PhoneSource::RevealEndpoint);
            }
        }
        if !listing.has_phone() {
            listing.phone_number = self.revealer.reveal(url).await;
            if listing.has_phone() {
                tracing::info!(url, "phone revealed in browser");
                phone_source = Some(PhoneSource::Browser);
            }
        }

        Ok(ProcessedListing {
            listing,
            phone_source,
        })
    }

    async fn harvest_one<S: ListingSink>(&self, url: &str, sink: &S) -> ListingOutcome {
        let processed = match self.process_listing(url).await {
            Ok(processed) => processed,
            Err(e) => {
                tracing::error!(url, error = %e, "listing failed");
                return ListingOutcome::Errored;
            }
        };

        if let Err(source) = sink.upsert(url, &processed.listing).await {
            let e = ScraperError::Persist {
                url: url.to_owned(),
                source: Box::new(source),
            };
            tracing::error!(url, error = %e, "listing not saved");
            return ListingOutcome::Errored;
        }

        if let Some(phone) = processed.listing.phone_number {
            tracing::info!(url, phone, source = ?processed.phone_source, "saved listing with phone");
            ListingOutcome::WithPhone
        } else {
            tracing::warn!(url, "saved listing without phone");
            ListingOutcome::WithoutPhone
        }
    }

    /// Processes `urls` in order. A failure or panic on one URL is counted
    /// and never stops the run.
    pub async fn run_urls<S: ListingSink>(&self, urls: &[String], sink: &S) -> RunSummary {
        let mut summary = RunSummary::default();
        for url in urls {
            let outcome = AssertUnwindSafe(self.harvest_one(url, sink))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| {
                    tracing::error!(url = %url, "listing processing panicked");
                    ListingOutcome::Errored
                });
            summary.record(outcome);
        }
        tracing::info!(
            total = summary.total(),
            with_phone = summary.with_phone,
            without_phone = summary.without_phone,
            errors = summary.errors,
            "scrape run finished"
        );
        summary
    }

    /// Discovers listings (up to `page_cap` index pages) and processes them.
    ///
    /// # Errors
    ///
    /// Returns the discovery error when the first index page cannot be fetched.
    pub async fn run_once<S: ListingSink>(
        &self,
        sink: &S,
        page_cap: Option<u32>,
    ) -> Result<RunSummary, ScraperError> {
        let urls = self.discovery.discover(&self.fetcher, page_cap).await?;
        Ok(self.run_urls(&urls, sink).await)
    }
}
