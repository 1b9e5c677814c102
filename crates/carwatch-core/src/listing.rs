//! Listing record and per-run counters shared by the scraper, the database
//! layer, and the CLI.

use serde::{Deserialize, Serialize};

/// Structured attributes extracted from one listing page.
///
/// Every field is independently optional: a missing value is a normal
/// outcome of extraction and never an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedListing {
    pub title: Option<String>,
    pub price_usd: Option<i32>,
    /// Odometer reading in kilometres.
    pub odometer: Option<i32>,
    /// Seller display name.
    pub username: Option<String>,
    /// International digits without `+`, e.g. `380931234567`.
    pub phone_number: Option<i64>,
    pub image_url: Option<String>,
    pub images_count: Option<i32>,
    /// License plate, e.g. `AA 1234 BB`.
    pub car_number: Option<String>,
    pub car_vin: Option<String>,
}

impl ExtractedListing {
    #[must_use]
    pub fn has_phone(&self) -> bool {
        self.phone_number.is_some()
    }
}

/// How a single listing ended up within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingOutcome {
    WithPhone,
    WithoutPhone,
    Errored,
}

/// Counters accumulated over one discovery-to-persistence pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub with_phone: u32,
    pub without_phone: u32,
    pub errors: u32,
}

impl RunSummary {
    pub fn record(&mut self, outcome: ListingOutcome) {
        let counter = match outcome {
            ListingOutcome::WithPhone => &mut self.with_phone,
            ListingOutcome::WithoutPhone => &mut self.without_phone,
            ListingOutcome::Errored => &mut self.errors,
        };
        *counter = counter.saturating_add(1);
    }

    /// Listings that were persisted, with or without a phone.
    #[must_use]
    pub fn persisted(&self) -> u32 {
        self.with_phone.saturating_add(self.without_phone)
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.persisted().saturating_add(self.errors)
    }
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "with_phone={} without_phone={} errors={}",
            self.with_phone, self.without_phone, self.errors
        )
    }
}
